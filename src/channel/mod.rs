//! One-way clipboard channels carried as length-prefixed files.
//!
//! ```text
//!   engine A                airlock                engine B
//! +----------+  write  +---------------+  read  +----------+
//! |  output  | ------> | a2b.0 (frame) | -----> |  input   |
//! |  input   | <------ | b2a.0 (frame) | <----- |  output  |
//! +----------+  read   +---------------+  write +----------+
//! ```
//!
//! Every update truncates and rewrites the whole file; nothing is appended.

pub mod codec;
pub mod file;
pub mod lock;

pub use codec::{
    decode, encode, fits_in_frame, Fingerprint, ObfuscationKey, FINGERPRINT_PREFIX,
    LENGTH_PREFIX_SIZE, MAX_PAYLOAD_LEN,
};
pub use file::{ChannelReader, ChannelWriter};
pub use lock::{acquire, ChannelLock, LockMode, LOCK_RANGE};
