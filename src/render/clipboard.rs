//! Clipboard writers for the panel's copy action.
//!
//! Primary path is arboard (native clipboard access). When that fails the
//! text is piped into whichever platform copy command is installed.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),
    #[error("Clipboard write failed: {0}")]
    Write(String),
    #[error("No clipboard command found")]
    NoCopyCommand,
}

pub trait ClipboardWriter {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError>;
}

/// Native clipboard via arboard.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardWriter for SystemClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
        clipboard
            .set_text(text)
            .map_err(|e| ClipboardError::Write(e.to_string()))?;
        Ok(())
    }
}

/// Candidate copy commands, in preference order.
const COPY_COMMANDS: &[(&str, &[&str])] = &[
    ("wl-copy", &[]),
    ("xclip", &["-selection", "clipboard"]),
    ("xsel", &["--clipboard", "--input"]),
    ("pbcopy", &[]),
    ("clip", &[]),
];

/// Fallback writer: pipes text into a platform copy command on stdin.
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandClipboard {
    /// First installed command from the known list.
    pub fn detect() -> Option<Self> {
        COPY_COMMANDS.iter().find_map(|(name, args)| {
            which::which(name).ok().map(|program| Self {
                program,
                args: args.iter().map(|a| a.to_string()).collect(),
            })
        })
    }

    pub fn new(program: impl Into<PathBuf>, args: &[&str]) -> Self {
        Self {
            program: program.into(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl ClipboardWriter for CommandClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ClipboardError::Unavailable(format!("{}: {}", self.program.display(), e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(text.as_bytes()) {
                drop(stdin);
                let _ = child.kill();
                let _ = child.wait();
                return Err(ClipboardError::Write(format!(
                    "{}: {}",
                    self.program.display(),
                    e
                )));
            }
        }

        let status = child
            .wait()
            .map_err(|e| ClipboardError::Write(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(ClipboardError::Write(format!(
                "{} exited with {}",
                self.program.display(),
                status
            )))
        }
    }
}

/// Detected-on-demand fallback, so a missing command is only an error
/// when the primary path already failed.
#[derive(Debug, Default)]
pub struct DetectedCommandClipboard;

impl ClipboardWriter for DetectedCommandClipboard {
    fn write_text(&mut self, text: &str) -> Result<(), ClipboardError> {
        CommandClipboard::detect()
            .ok_or(ClipboardError::NoCopyCommand)?
            .write_text(text)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMethod {
    Primary,
    Fallback,
}

/// Write with `primary`, falling back to `fallback` on any primary error.
pub fn copy_with_fallback(
    primary: &mut dyn ClipboardWriter,
    fallback: &mut dyn ClipboardWriter,
    text: &str,
) -> Result<CopyMethod, ClipboardError> {
    match primary.write_text(text) {
        Ok(()) => {
            log::info!("[PANEL] Copied {} chars to clipboard", text.len());
            Ok(CopyMethod::Primary)
        }
        Err(e) => {
            log::warn!("[PANEL] Primary clipboard failed ({}), trying fallback", e);
            fallback.write_text(text)?;
            log::info!("[PANEL] Copied {} chars via fallback", text.len());
            Ok(CopyMethod::Fallback)
        }
    }
}
