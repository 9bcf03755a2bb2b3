use crate::channel::ObfuscationKey;
use crate::clipboard::ClipboardKind;
use crate::config::{EngineConfig, RefreshPolicy};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "bidiclip")]
#[command(about = "Mirror the clipboard between two machines through a write-only file drop", long_about = None)]
#[command(version)]
#[command(after_help = "EXAMPLES:
    # Corporate side
    bidiclip /mnt/airlock/ved2corp.0 /mnt/airlock/corp2ved.0

    # Remote side (paths swapped)
    bidiclip /mnt/airlock/corp2ved.0 /mnt/airlock/ved2corp.0

    # Remap the input channel of a running instance
    kill -INT <pid>      (or CTRL-C in its terminal)

    # Stop gracefully
    kill -TERM <pid>     (or CTRL-C twice)")]
pub struct Cli {
    /// Channel file written by the peer
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Channel file written by this side
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Shared obfuscation key (XOR; keeps casual readers out, not an encryption)
    #[arg(value_name = "KEY")]
    pub key: Option<String>,

    /// Poll interval in milliseconds
    #[arg(long, env = "BIDI_POLL_INTERVAL_MS", default_value_t = 1000, value_name = "MS")]
    pub interval_ms: u64,

    /// When to reopen the input channel (auto, always, never)
    #[arg(long, default_value = "auto", value_parser = parse_refresh)]
    pub refresh: RefreshPolicy,

    /// Never reopen the input channel between polls (overrides --refresh)
    #[arg(long, env = "BIDI_NO_REFRESH")]
    pub no_refresh: bool,

    /// Delete the output channel file on graceful shutdown
    #[arg(long, env = "BIDI_CLIPBOARD_DEBUG")]
    pub remove_output_on_exit: bool,

    /// Clipboard backend (auto, native, command, memory)
    #[arg(long, default_value = "auto", value_parser = parse_clipboard)]
    pub clipboard: ClipboardKind,

    /// Skip the policy confirmation when a key is given
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Verbose logging
    #[arg(short, long, env = "BIDI_DEBUG")]
    pub verbose: bool,
}

fn parse_refresh(s: &str) -> Result<RefreshPolicy, String> {
    s.parse().map_err(|e: crate::error::SyncError| e.to_string())
}

fn parse_clipboard(s: &str) -> Result<ClipboardKind, String> {
    s.parse().map_err(|e: crate::error::SyncError| e.to_string())
}

impl Cli {
    pub fn key(&self) -> Option<ObfuscationKey> {
        self.key
            .as_deref()
            .and_then(|k| ObfuscationKey::new(k.as_bytes().to_vec()))
    }

    pub fn refresh_policy(&self) -> RefreshPolicy {
        if self.no_refresh {
            RefreshPolicy::Never
        } else {
            self.refresh
        }
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::new(&self.input, &self.output)
            .with_key(self.key())
            .with_poll_interval(Duration::from_millis(self.interval_ms))
            .with_refresh(self.refresh_policy())
            .with_remove_output_on_exit(self.remove_output_on_exit)
    }
}
