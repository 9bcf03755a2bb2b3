//! Channel frame codec.
//!
//! Wire format: `len:u32 (little-endian) | payload[len]`.
//! The payload may be XOR-obfuscated with a shared key. Obfuscation only keeps
//! casual eyes off the airlock contents; it is not encryption and gives no
//! confidentiality.

use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;
use std::io::{self, Read};

/// Size of the length prefix in bytes
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Initial read buffer cap, so a garbage length prefix cannot force a huge allocation
const READ_CAPACITY_HINT: usize = 64 * 1024;

/// Number of leading payload bytes that take part in a fingerprint
pub const FINGERPRINT_PREFIX: usize = 256;

/// Largest payload the length prefix can describe
pub const MAX_PAYLOAD_LEN: usize = u32::MAX as usize;

// =============================================================================
// Obfuscation key
// =============================================================================

/// Repeating XOR keystream shared by both ends of a link.
#[derive(Clone, PartialEq, Eq)]
pub struct ObfuscationKey(Vec<u8>);

impl ObfuscationKey {
    /// Returns `None` for an empty key.
    pub fn new(key: impl Into<Vec<u8>>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() {
            None
        } else {
            Some(Self(key))
        }
    }

    /// XOR `data` in place with the key cycled to its length.
    ///
    /// Applying the same key twice restores the input.
    pub fn apply(&self, data: &mut [u8]) {
        for (byte, k) in data.iter_mut().zip(self.0.iter().cycle()) {
            *byte ^= k;
        }
    }
}

impl fmt::Debug for ObfuscationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObfuscationKey(<{} bytes>)", self.0.len())
    }
}

// =============================================================================
// Fingerprint
// =============================================================================

/// Cheap equality proxy for clipboard contents: total length plus the leading
/// [`FINGERPRINT_PREFIX`] bytes.
///
/// Only used to recognise echoes of data just sent or just received. Two
/// payloads that share length and prefix compare equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint {
    len: usize,
    head: Bytes,
}

impl Fingerprint {
    pub fn of(payload: &[u8]) -> Self {
        let head_len = payload.len().min(FINGERPRINT_PREFIX);
        Self {
            len: payload.len(),
            head: Bytes::copy_from_slice(&payload[..head_len]),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

// =============================================================================
// Encode / decode
// =============================================================================

/// Whether a payload of `len` bytes can be framed.
pub fn fits_in_frame(len: usize) -> bool {
    u32::try_from(len).is_ok()
}

/// Build a complete frame for `payload`, obfuscating it when a key is given.
///
/// The returned buffer is meant to be written with a single `write_all` after
/// truncating the channel file. Payloads longer than [`MAX_PAYLOAD_LEN`] are
/// rejected with `InvalidInput`.
pub fn encode(payload: &[u8], key: Option<&ObfuscationKey>) -> io::Result<Bytes> {
    let len = u32::try_from(payload.len()).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "payload of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_PAYLOAD_LEN
            ),
        )
    })?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32_le(len);
    buf.put_slice(payload);

    if let Some(key) = key {
        key.apply(&mut buf[LENGTH_PREFIX_SIZE..]);
    }

    Ok(buf.freeze())
}

/// Read one frame from the current position of `src`.
///
/// Returns `Ok(None)` when there is nothing usable yet: fewer than four bytes,
/// a zero length, or fewer payload bytes than the prefix declares (the peer is
/// mid-write or the file was just created). Only genuine I/O failures are
/// returned as errors.
pub fn decode<R: Read>(src: &mut R, key: Option<&ObfuscationKey>) -> io::Result<Option<Bytes>> {
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    if read_full(src, &mut prefix)? < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let len = u32::from_le_bytes(prefix) as usize;
    if len == 0 {
        return Ok(None);
    }

    let mut payload = Vec::with_capacity(len.min(READ_CAPACITY_HINT));
    src.take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Ok(None);
    }

    if let Some(key) = key {
        key.apply(&mut payload);
    }

    Ok(Some(Bytes::from(payload)))
}

/// Like `read_exact`, but reports how much was read instead of failing on EOF.
fn read_full<R: Read>(src: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match src.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

// =============================================================================
// Tests
// =============================================================================
