use super::ClipboardGateway;
use crate::error::{Result, SyncError};
use tracing::trace;

/// In-process platform clipboard via `arboard`.
pub struct NativeClipboard {
    clipboard: arboard::Clipboard,
}

impl NativeClipboard {
    pub fn new() -> Result<Self> {
        let clipboard = arboard::Clipboard::new()
            .map_err(|e| SyncError::ClipboardUnavailable(format!("native clipboard: {}", e)))?;
        Ok(Self { clipboard })
    }
}

impl ClipboardGateway for NativeClipboard {
    fn name(&self) -> &'static str {
        "native"
    }

    fn get_text(&mut self) -> Option<String> {
        match self.clipboard.get_text() {
            Ok(text) if !text.is_empty() => Some(text),
            Ok(_) => None,
            Err(e) => {
                // ContentNotAvailable is the normal "nothing textual copied" case
                trace!("No clipboard text: {}", e);
                None
            }
        }
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.clipboard
            .set_text(text)
            .map_err(|e| SyncError::Clipboard(e.to_string()))
    }
}
