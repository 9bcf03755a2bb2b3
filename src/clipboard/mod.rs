//! Clipboard Gateway: the local text clipboard behind one small trait.
//!
//! The engine never branches on platform. One [`ClipboardGateway`] strategy is
//! picked at startup by [`select_gateway`] and used for the life of the process.

pub mod command;
pub mod memory;
pub mod native;

pub use command::CommandClipboard;
pub use memory::MemoryClipboard;
pub use native::NativeClipboard;

use crate::error::{Result, SyncError};
use std::str::FromStr;
use tracing::{debug, info};

/// Platform text clipboard.
pub trait ClipboardGateway {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Current clipboard text, `None` when empty or not text.
    fn get_text(&mut self) -> Option<String>;

    /// Replace the clipboard text. Failures are best effort: the engine logs
    /// them and carries on.
    fn set_text(&mut self, text: &str) -> Result<()>;
}

impl<C: ClipboardGateway + ?Sized> ClipboardGateway for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn get_text(&mut self) -> Option<String> {
        (**self).get_text()
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        (**self).set_text(text)
    }
}

/// Which clipboard strategy to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipboardKind {
    /// Native first, helper binaries second
    #[default]
    Auto,
    /// In-process platform clipboard (`arboard`)
    Native,
    /// Helper binaries such as `xclip` or `pbcopy`
    Command,
    /// Process-local clipboard, nothing leaves the process
    Memory,
}

impl FromStr for ClipboardKind {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "native" => Ok(Self::Native),
            "command" => Ok(Self::Command),
            "memory" => Ok(Self::Memory),
            other => Err(SyncError::Config(format!(
                "Unknown clipboard backend '{}' (expected auto, native, command or memory)",
                other
            ))),
        }
    }
}

/// Build the clipboard strategy for this process.
///
/// A missing clipboard is fatal: there is nothing to retry.
pub fn select_gateway(kind: ClipboardKind) -> Result<Box<dyn ClipboardGateway>> {
    let gateway: Box<dyn ClipboardGateway> = match kind {
        ClipboardKind::Native => Box::new(NativeClipboard::new()?),
        ClipboardKind::Command => Box::new(CommandClipboard::detect()?),
        ClipboardKind::Memory => Box::new(MemoryClipboard::new()),
        ClipboardKind::Auto => match NativeClipboard::new() {
            Ok(native) => Box::new(native),
            Err(e) => {
                debug!("Native clipboard unavailable ({}), trying helper binaries", e);
                Box::new(CommandClipboard::detect().map_err(|cmd_err| {
                    SyncError::ClipboardUnavailable(format!("{}; {}", e, cmd_err))
                })?)
            }
        },
    };

    info!("Using {} clipboard", gateway.name());
    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clipboard_kind_from_str() {
        assert_eq!("auto".parse::<ClipboardKind>().unwrap(), ClipboardKind::Auto);
        assert_eq!(
            "Native".parse::<ClipboardKind>().unwrap(),
            ClipboardKind::Native
        );
        assert_eq!(
            "memory".parse::<ClipboardKind>().unwrap(),
            ClipboardKind::Memory
        );
        assert!("x11".parse::<ClipboardKind>().is_err());
    }

    #[test]
    fn test_select_memory_gateway() {
        let mut gateway = select_gateway(ClipboardKind::Memory).unwrap();
        assert_eq!(gateway.name(), "memory");
        assert_eq!(gateway.get_text(), None);
        gateway.set_text("hi").unwrap();
        assert_eq!(gateway.get_text().as_deref(), Some("hi"));
    }
}
