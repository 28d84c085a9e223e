//! Write-only access to the system clipboard
//!
//! Shells out to whichever clipboard tool the desktop provides.

use std::io::Write;
use std::process::{Command, Stdio};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("no clipboard tool found (tried wl-copy, xclip, xsel, pbcopy, clip.exe)")]
    Unavailable,

    #[error("{tool} exited with {status}")]
    Rejected { tool: &'static str, status: String },

    #[error("clipboard write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub trait Clipboard: Send {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Candidate tools in preference order (Wayland first)
const TOOLS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip.exe", &[]),
];

#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        for &(tool, args) in TOOLS {
            if let Some(result) = pipe_to(tool, args, text) {
                return result;
            }
        }

        Err(ClipboardError::Unavailable)
    }
}

/// Feed `text` to `tool` on stdin; `None` when the tool isn't installed.
///
/// The child is always waited for, even when the write fails, so no zombie
/// is left behind.
fn pipe_to(tool: &'static str, args: &[&str], text: &str) -> Option<Result<(), ClipboardError>> {
    let mut child = match Command::new(tool)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(child) => child,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => return Some(Err(e.into())),
    };

    // Dropping stdin at the end of the match closes the pipe so the tool can finish
    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(text.as_bytes()),
        None => Ok(()),
    };

    let status = match child.wait() {
        Ok(status) => status,
        Err(e) => return Some(Err(e.into())),
    };
    if let Err(e) = written {
        tracing::warn!("Writing to {} failed: {}", tool, e);
        return Some(Err(e.into()));
    }
    if !status.success() {
        return Some(Err(ClipboardError::Rejected {
            tool,
            status: status.to_string(),
        }));
    }

    tracing::debug!("Copied {} bytes with {}", text.len(), tool);
    Some(Ok(()))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tool_is_skipped() {
        assert!(pipe_to("biztone-no-such-clipboard-tool", &[], "x").is_none());
    }

    #[test]
    fn test_tool_reading_stdin_succeeds() {
        let result = pipe_to("sh", &["-c", "cat > /dev/null"], "hello");
        assert!(matches!(result, Some(Ok(()))));
    }

    #[test]
    fn test_nonzero_exit_is_rejected() {
        let result = pipe_to("sh", &["-c", "cat > /dev/null; exit 3"], "hello");
        assert!(matches!(result, Some(Err(ClipboardError::Rejected { tool: "sh", .. }))));
    }

    #[test]
    fn test_failed_write_still_returns() {
        // The tool exits without reading, so a large write hits a closed pipe
        let text = "x".repeat(4 * 1024 * 1024);
        let result = pipe_to("sh", &["-c", "exit 0"], &text);
        assert!(matches!(result, Some(Err(ClipboardError::Io(_)))));
    }
}
