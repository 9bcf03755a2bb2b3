//! Engine configuration and startup validation.

use crate::channel::ObfuscationKey;
use crate::error::{Result, SyncError};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Default poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shortest poll interval accepted from the command line
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// When to drop and reopen the input channel handle.
///
/// Some network filesystem clients (notably SMB on macOS and Windows) keep
/// serving cached file contents to an open handle. Reopening every poll forces
/// a fresh read at the cost of one extra open per interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// `Always` on macOS and Windows, `Never` elsewhere
    #[default]
    Auto,
    /// Reopen the input handle every poll
    Always,
    /// Keep the input handle open across polls
    Never,
}

impl RefreshPolicy {
    /// Whether the input handle should be reopened each poll on this platform.
    pub fn reopen_each_poll(self) -> bool {
        match self {
            RefreshPolicy::Always => true,
            RefreshPolicy::Never => false,
            RefreshPolicy::Auto => cfg!(any(target_os = "macos", windows)),
        }
    }
}

impl FromStr for RefreshPolicy {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "always" => Ok(Self::Always),
            "never" => Ok(Self::Never),
            other => Err(SyncError::Config(format!(
                "Unknown refresh policy '{}' (expected auto, always or never)",
                other
            ))),
        }
    }
}

/// Everything the sync engine needs to run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Channel written by the peer
    pub input: PathBuf,
    /// Channel written by us
    pub output: PathBuf,
    pub key: Option<ObfuscationKey>,
    pub poll_interval: Duration,
    pub refresh: RefreshPolicy,
    /// Delete the output file on graceful shutdown (debug/test runs)
    pub remove_output_on_exit: bool,
}

impl EngineConfig {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            key: None,
            poll_interval: DEFAULT_POLL_INTERVAL,
            refresh: RefreshPolicy::default(),
            remove_output_on_exit: false,
        }
    }

    pub fn with_key(mut self, key: Option<ObfuscationKey>) -> Self {
        self.key = key;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn with_remove_output_on_exit(mut self, remove: bool) -> Self {
        self.remove_output_on_exit = remove;
        self
    }

    /// Startup checks. Touches neither the clipboard nor any channel file.
    pub fn validate(&self) -> Result<()> {
        if same_channel(&self.input, &self.output) {
            return Err(SyncError::SameChannel(self.output.clone()));
        }
        ensure_output_writable(&self.output)?;
        if self.poll_interval < MIN_POLL_INTERVAL {
            return Err(SyncError::Config(format!(
                "Poll interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }
        Ok(())
    }
}

/// Whether two channel paths name the same file.
///
/// Paths are compared as given, and again after resolution when both exist.
pub fn same_channel(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Files placed in the airlock are typically made read-only once transferred.
/// An existing read-only output can never be updated, so refuse to start.
fn ensure_output_writable(output: &Path) -> Result<()> {
    match std::fs::metadata(output) {
        Ok(meta) if meta.is_dir() => Err(SyncError::Config(format!(
            "{} is a directory, not a channel file",
            output.display()
        ))),
        Ok(meta) if meta.permissions().readonly() => {
            Err(SyncError::OutputNotWritable(output.to_path_buf()))
        }
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(SyncError::io(output, e)),
    }
}
