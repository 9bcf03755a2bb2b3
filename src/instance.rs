// Single-instance guard
//
// Two engines writing the same output channel from one host would fight over the
// peer's clipboard. The guard is an exclusive fs2 lock on a per-output lock file
// under the runtime (or cache) directory, e.g. /run/user/1000/bidiclip/<hash>.lock

use crate::error::{Result, SyncError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held for the life of the process; the lock is released when dropped.
#[derive(Debug)]
pub struct InstanceGuard {
    lock_path: PathBuf,
    _file: File,
}

impl InstanceGuard {
    /// Claim `output` for this process, using the default lock directory.
    pub fn acquire(output: &Path) -> Result<Self> {
        Self::acquire_in(&Self::lock_dir()?, output)
    }

    /// Claim `output` with lock files kept in `dir`.
    pub fn acquire_in(dir: &Path, output: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;
        let lock_path = dir.join(format!("{}.lock", Self::output_hash(output)));

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| SyncError::io(&lock_path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {}
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                return Err(SyncError::AlreadyRunning(output.to_path_buf()));
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                return Err(SyncError::AlreadyRunning(output.to_path_buf()));
            }
            Err(e) => return Err(SyncError::io(&lock_path, e)),
        }

        debug!("Instance lock {}", lock_path.display());
        Ok(Self {
            lock_path,
            _file: file,
        })
    }

    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }

    /// Lock directory: $XDG_RUNTIME_DIR/bidiclip, falling back to the cache dir
    /// and finally the temp dir.
    fn lock_dir() -> Result<PathBuf> {
        let base = dirs::runtime_dir()
            .or_else(dirs::cache_dir)
            .unwrap_or_else(std::env::temp_dir);
        Ok(base.join("bidiclip"))
    }

    /// Stable name for an output path
    fn output_hash(output: &Path) -> String {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let resolved = Self::resolve(output);
        let mut hasher = DefaultHasher::new();
        resolved.to_string_lossy().hash(&mut hasher);
        format!("{:x}", hasher.finish())
    }

    /// Absolute form of `output`, canonicalising the parent when it exists so
    /// different spellings of one path share a lock.
    fn resolve(output: &Path) -> PathBuf {
        let absolute = if output.is_absolute() {
            output.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(output))
                .unwrap_or_else(|_| output.to_path_buf())
        };

        match (absolute.parent(), absolute.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|p| p.join(name))
                .unwrap_or(absolute),
            _ => absolute,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_guard_for_same_output_fails() {
        let locks = tempfile::tempdir().unwrap();
        let output = locks.path().join("a2b.0");

        let _first = InstanceGuard::acquire_in(locks.path(), &output).unwrap();
        let second = InstanceGuard::acquire_in(locks.path(), &output);
        assert!(matches!(second, Err(SyncError::AlreadyRunning(_))));
    }

    #[test]
    fn test_different_outputs_coexist() {
        let locks = tempfile::tempdir().unwrap();
        let _a = InstanceGuard::acquire_in(locks.path(), &locks.path().join("a2b.0")).unwrap();
        let _b = InstanceGuard::acquire_in(locks.path(), &locks.path().join("b2a.0")).unwrap();
    }

    #[test]
    fn test_guard_released_on_drop() {
        let locks = tempfile::tempdir().unwrap();
        let output = locks.path().join("a2b.0");

        let first = InstanceGuard::acquire_in(locks.path(), &output).unwrap();
        drop(first);
        InstanceGuard::acquire_in(locks.path(), &output).unwrap();
    }

    #[test]
    fn test_hash_ignores_spelling() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("out.0");
        let dotted = dir.path().join(".").join("out.0");
        assert_eq!(
            InstanceGuard::output_hash(&plain),
            InstanceGuard::output_hash(&dotted)
        );
    }
}
