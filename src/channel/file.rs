//! Channel file handles.
//!
//! A [`ChannelWriter`] owns the local engine's output channel for the life of the
//! process. A [`ChannelReader`] wraps the peer's channel and may be dropped and
//! reopened every poll.

use crate::channel::codec::{self, ObfuscationKey};
use crate::channel::lock::{self, LockMode};
use crate::error::{Result, SyncError};
use bytes::Bytes;
use std::fs::{File, OpenOptions};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Write side of a channel.
pub struct ChannelWriter {
    path: PathBuf,
    file: File,
    lock_warned: bool,
}

impl ChannelWriter {
    /// Open `path` for writing, creating it or truncating what is there.
    pub fn create(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .map_err(|e| SyncError::io(path, e))?;

        Ok(Self {
            path: path.to_path_buf(),
            file,
            lock_warned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the channel contents with one frame for `payload`.
    ///
    /// The file is truncated and the whole frame goes out in a single write
    /// while the exclusive lock is held.
    pub fn write_frame(&mut self, payload: &[u8], key: Option<&ObfuscationKey>) -> Result<()> {
        let frame = codec::encode(payload, key).map_err(|e| SyncError::io(&self.path, e))?;
        let _lock =
            lock::acquire_or_proceed(&self.file, LockMode::Exclusive, &mut self.lock_warned);

        let mut file = &self.file;
        file.set_len(0).map_err(|e| SyncError::io(&self.path, e))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| SyncError::io(&self.path, e))?;
        file.write_all(&frame)
            .map_err(|e| SyncError::io(&self.path, e))?;
        file.flush().map_err(|e| SyncError::io(&self.path, e))?;

        debug!("Wrote {} byte frame to {}", frame.len(), self.path.display());
        Ok(())
    }

    /// Empty the channel so the peer sees no data after we are gone.
    pub fn truncate(&mut self) -> Result<()> {
        let _lock =
            lock::acquire_or_proceed(&self.file, LockMode::Exclusive, &mut self.lock_warned);
        self.file
            .set_len(0)
            .map_err(|e| SyncError::io(&self.path, e))
    }
}

/// Read side of a channel.
pub struct ChannelReader {
    path: PathBuf,
    file: File,
    lock_warned: bool,
}

impl ChannelReader {
    /// Open the peer's channel. Fails while the peer has not created it yet.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SyncError::io(path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
            lock_warned: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the current frame under a shared lock.
    ///
    /// `Ok(None)` covers an empty channel and a frame still being written.
    pub fn read_frame(&mut self, key: Option<&ObfuscationKey>) -> Result<Option<Bytes>> {
        let _lock =
            lock::acquire_or_proceed(&self.file, LockMode::Shared, &mut self.lock_warned);

        let mut file = &self.file;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| SyncError::io(&self.path, e))?;
        codec::decode(&mut file, key).map_err(|e| SyncError::io(&self.path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_create_truncates_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.0");
        fs::write(&path, b"left over from last run").unwrap();

        let _writer = ChannelWriter::create(&path).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.0");

        let mut writer = ChannelWriter::create(&path).unwrap();
        let mut reader = ChannelReader::open(&path).unwrap();
        assert_eq!(reader.read_frame(None).unwrap(), None);

        writer.write_frame(b"first value", None).unwrap();
        assert_eq!(
            reader.read_frame(None).unwrap().unwrap().as_ref(),
            b"first value"
        );

        // A shorter rewrite must not leave the old tail behind
        writer.write_frame(b"2nd", None).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 4 + 3);
        assert_eq!(reader.read_frame(None).unwrap().unwrap().as_ref(), b"2nd");
    }

    #[test]
    fn test_write_then_read_obfuscated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.0");
        let key = ObfuscationKey::new(b"airlock".to_vec()).unwrap();

        let mut writer = ChannelWriter::create(&path).unwrap();
        writer.write_frame(b"hidden text", Some(&key)).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_ne!(&raw[4..], b"hidden text");

        let mut reader = ChannelReader::open(&path).unwrap();
        assert_eq!(
            reader.read_frame(Some(&key)).unwrap().unwrap().as_ref(),
            b"hidden text"
        );
    }

    #[test]
    fn test_partial_frame_reads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.0");
        let mut bytes = 32u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(b"not yet complete");
        fs::write(&path, bytes).unwrap();

        let mut reader = ChannelReader::open(&path).unwrap();
        assert_eq!(reader.read_frame(None).unwrap(), None);
    }

    #[test]
    fn test_truncate_empties_channel() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chan.0");

        let mut writer = ChannelWriter::create(&path).unwrap();
        writer.write_frame(b"bye", None).unwrap();
        writer.truncate().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_open_missing_channel_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChannelReader::open(&dir.path().join("absent.0")).is_err());
    }
}
