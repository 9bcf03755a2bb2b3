//! bidiclip: a bidirectional text clipboard over a write-only file drop.
//!
//! Two machines share a medium (the "airlock") where each side may place files
//! but never read its own back. Each side runs one [`SyncEngine`](engine::SyncEngine)
//! that writes the local clipboard to its output channel file and copies the
//! peer's channel file onto the local clipboard. Symmetric engines with crossed
//! paths form one logical bidirectional clipboard.
//!
//! Delivery is best effort and last value wins; there is no acknowledgement,
//! ordering across restarts, or exactly-once guarantee.

pub mod channel;
pub mod cli;
pub mod clipboard;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod instance;
pub mod prompt;

pub use channel::{Fingerprint, ObfuscationKey};
pub use clipboard::{select_gateway, ClipboardGateway, ClipboardKind, MemoryClipboard};
pub use config::{EngineConfig, RefreshPolicy};
pub use control::{ControlHandle, ControlSignal, ControlSignals};
pub use engine::{Phase, SyncEngine, SyncStats};
pub use error::{Result, SyncError};
