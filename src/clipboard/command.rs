//! Clipboard access through helper binaries.
//!
//! Used where the native backend cannot connect, e.g. a headless X forwarding
//! session that still has `xclip` on the PATH.

use super::ClipboardGateway;
use crate::error::{Result, SyncError};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::trace;

/// A helper program invocation: binary plus fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Invocation {
    program: &'static str,
    args: &'static [&'static str],
}

impl Invocation {
    const fn new(program: &'static str, args: &'static [&'static str]) -> Self {
        Self { program, args }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(self.program);
        cmd.args(self.args);
        cmd
    }
}

/// Known helper pairs, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Helper {
    WlClipboard,
    Xclip,
    Pasteboard,
}

impl Helper {
    fn name(self) -> &'static str {
        match self {
            Helper::WlClipboard => "wl-clipboard",
            Helper::Xclip => "xclip",
            Helper::Pasteboard => "pbcopy/pbpaste",
        }
    }

    fn paste(self) -> Invocation {
        match self {
            Helper::WlClipboard => Invocation::new("wl-paste", &["--no-newline"]),
            Helper::Xclip => Invocation::new("xclip", &["-selection", "clipboard", "-o"]),
            Helper::Pasteboard => Invocation::new("pbpaste", &[]),
        }
    }

    fn copy(self) -> Invocation {
        match self {
            Helper::WlClipboard => Invocation::new("wl-copy", &[]),
            Helper::Xclip => Invocation::new("xclip", &["-selection", "clipboard", "-i"]),
            Helper::Pasteboard => Invocation::new("pbcopy", &[]),
        }
    }

    /// Helpers worth trying on this platform and session.
    fn candidates() -> Vec<Helper> {
        if cfg!(target_os = "macos") {
            vec![Helper::Pasteboard]
        } else if cfg!(unix) {
            let mut helpers = Vec::new();
            if std::env::var_os("WAYLAND_DISPLAY").is_some() {
                helpers.push(Helper::WlClipboard);
            }
            helpers.push(Helper::Xclip);
            helpers
        } else {
            Vec::new()
        }
    }

    fn is_installed(self) -> bool {
        which::which(self.paste().program).is_ok() && which::which(self.copy().program).is_ok()
    }
}

/// Clipboard backed by external paste/copy programs.
#[derive(Debug)]
pub struct CommandClipboard {
    helper: Helper,
}

impl CommandClipboard {
    /// Find the first installed helper pair for this session.
    pub fn detect() -> Result<Self> {
        let candidates = Helper::candidates();
        candidates
            .iter()
            .copied()
            .find(|helper| helper.is_installed())
            .map(|helper| Self { helper })
            .ok_or_else(|| {
                let wanted: Vec<&str> = candidates.iter().map(|h| h.name()).collect();
                if wanted.is_empty() {
                    SyncError::ClipboardUnavailable(
                        "no clipboard helper programs known for this platform".to_string(),
                    )
                } else {
                    SyncError::ClipboardUnavailable(format!(
                        "requires {} on the PATH",
                        wanted.join(" or ")
                    ))
                }
            })
    }
}

impl ClipboardGateway for CommandClipboard {
    fn name(&self) -> &'static str {
        self.helper.name()
    }

    fn get_text(&mut self) -> Option<String> {
        let paste = self.helper.paste();
        let output = match paste.command().stderr(Stdio::null()).output() {
            Ok(output) => output,
            Err(e) => {
                trace!("{} failed to start: {}", paste.program, e);
                return None;
            }
        };

        // Non-zero exit is how the helpers say "nothing textual copied"
        if !output.status.success() || output.stdout.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn set_text(&mut self, text: &str) -> Result<()> {
        feed_helper(&self.helper.copy(), text)
    }
}

/// Run a copy helper with `text` on its stdin and wait for it to finish.
fn feed_helper(copy: &Invocation, text: &str) -> Result<()> {
    let mut child = copy
        .command()
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| SyncError::Clipboard(format!("{}: {}", copy.program, e)))?;

    if let Some(mut stdin) = child.stdin.take() {
        if let Err(e) = stdin.write_all(text.as_bytes()) {
            // Typically EPIPE from a helper that exited early; reap it
            drop(stdin);
            let _ = child.kill();
            let _ = child.wait();
            return Err(SyncError::Clipboard(format!("{}: {}", copy.program, e)));
        }
    }

    let status = child
        .wait()
        .map_err(|e| SyncError::Clipboard(format!("{}: {}", copy.program, e)))?;
    if !status.success() {
        return Err(SyncError::Clipboard(format!(
            "{} exited with {}",
            copy.program, status
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_pair_paste_and_copy() {
        assert_eq!(Helper::Xclip.paste().program, "xclip");
        assert_eq!(Helper::Xclip.copy().args, &["-selection", "clipboard", "-i"]);
        assert_eq!(Helper::Pasteboard.paste().program, "pbpaste");
        assert_eq!(Helper::WlClipboard.copy().program, "wl-copy");
    }

    #[test]
    #[cfg(target_os = "macos")]
    fn test_macos_candidates() {
        assert_eq!(Helper::candidates(), vec![Helper::Pasteboard]);
    }

    #[test]
    #[cfg(all(unix, not(target_os = "macos")))]
    fn test_unix_candidates_end_with_xclip() {
        assert_eq!(Helper::candidates().last(), Some(&Helper::Xclip));
    }

    #[test]
    #[cfg(unix)]
    fn test_helper_that_ignores_stdin_is_reported() {
        // `true` exits without reading, so a write larger than the pipe buffer
        // fails with EPIPE
        let quitter = Invocation::new("true", &[]);
        let text = "x".repeat(1 << 20);
        let err = feed_helper(&quitter, &text).unwrap_err();
        assert!(matches!(err, SyncError::Clipboard(ref msg) if msg.starts_with("true:")));
    }

    #[test]
    #[cfg(unix)]
    fn test_helper_exit_status_is_checked() {
        assert!(feed_helper(&Invocation::new("true", &[]), "small").is_ok());
        assert!(matches!(
            feed_helper(&Invocation::new("false", &[]), "small"),
            Err(SyncError::Clipboard(_))
        ));
    }
}
