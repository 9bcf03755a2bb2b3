use super::ClipboardGateway;
use crate::error::{Result, SyncError};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Process-local clipboard.
///
/// Clones share the same contents, so a test can keep one handle while the
/// engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryClipboard {
    inner: Arc<Shared>,
}

#[derive(Debug, Default)]
struct Shared {
    text: Mutex<Option<String>>,
    accesses: AtomicUsize,
    fail_next_write: AtomicBool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        let clipboard = Self::new();
        clipboard.replace(Some(text.into()));
        clipboard
    }

    /// Contents without counting as an engine access.
    pub fn peek(&self) -> Option<String> {
        self.inner
            .text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Simulate the user copying something.
    pub fn copy(&self, text: impl Into<String>) {
        self.replace(Some(text.into()));
    }

    /// Make the next `set_text` fail, the way a busy system clipboard can.
    pub fn fail_next_write(&self) {
        self.inner.fail_next_write.store(true, Ordering::Relaxed);
    }

    /// Number of `get_text`/`set_text` calls made through the gateway.
    pub fn accesses(&self) -> usize {
        self.inner.accesses.load(Ordering::Relaxed)
    }

    fn replace(&self, text: Option<String>) {
        *self
            .inner
            .text
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = text;
    }
}

impl ClipboardGateway for MemoryClipboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn get_text(&mut self) -> Option<String> {
        self.inner.accesses.fetch_add(1, Ordering::Relaxed);
        self.peek().filter(|text| !text.is_empty())
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        self.inner.accesses.fetch_add(1, Ordering::Relaxed);
        if self.inner.fail_next_write.swap(false, Ordering::Relaxed) {
            return Err(SyncError::Clipboard("memory clipboard refused write".to_string()));
        }
        self.replace(Some(text.to_string()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_contents() {
        let user = MemoryClipboard::new();
        let mut engine_side = user.clone();

        user.copy("from user");
        assert_eq!(engine_side.get_text().as_deref(), Some("from user"));

        engine_side.set_text("from peer").unwrap();
        assert_eq!(user.peek().as_deref(), Some("from peer"));
        assert_eq!(user.accesses(), 2);
    }

    #[test]
    fn test_fail_next_write_fails_once() {
        let mut clipboard = MemoryClipboard::with_text("kept");
        clipboard.fail_next_write();

        assert!(matches!(clipboard.set_text("lost"), Err(SyncError::Clipboard(_))));
        assert_eq!(clipboard.peek().as_deref(), Some("kept"));
        clipboard.set_text("stored").unwrap();
        assert_eq!(clipboard.peek().as_deref(), Some("stored"));
    }

    #[test]
    fn test_empty_text_reads_as_none() {
        let mut clipboard = MemoryClipboard::with_text("");
        assert_eq!(clipboard.get_text(), None);
    }
}
