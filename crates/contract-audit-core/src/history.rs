//! Optional "bad history": reasons previous reports were rejected.
//!
//! The file is free text and is embedded verbatim into the system
//! instruction as an extra checklist. It is a soft input: a missing or
//! unreadable file never fails the run, it only falls back to
//! [`NO_HISTORY_PLACEHOLDER`]. The outcomes stay distinct so callers can log
//! or display why history was not used.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default history file name, relative to the working directory.
pub const DEFAULT_HISTORY_FILE: &str = "bad_history.txt";

/// Context text used when no history could be loaded.
pub const NO_HISTORY_PLACEHOLDER: &str = "no prior rejection history";

/// Result of looking for the history file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryOutcome {
    /// File was read successfully.
    Loaded(String),
    /// No file at the configured path.
    Absent,
    /// File exists but the process may not read it.
    PermissionDenied,
    /// File exists but could not be read (I/O error, invalid UTF-8, ...).
    Unreadable(String),
}

impl HistoryOutcome {
    /// Text to embed into the prompt.
    #[must_use]
    pub fn context_text(&self) -> &str {
        match self {
            Self::Loaded(text) if !text.trim().is_empty() => text,
            _ => NO_HISTORY_PLACEHOLDER,
        }
    }

    /// Whether real history (not the placeholder) will be used.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(text) if !text.trim().is_empty())
    }
}

/// Read the history file at `path`.
pub fn load_history(path: &Path) -> HistoryOutcome {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            tracing::info!("Loaded rejection history from {} ({} chars)", path.display(), text.len());
            HistoryOutcome::Loaded(text)
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No rejection history at {}", path.display());
            HistoryOutcome::Absent
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            tracing::warn!("Permission denied reading rejection history {}", path.display());
            HistoryOutcome::PermissionDenied
        }
        Err(e) => {
            tracing::warn!("Failed to read rejection history {}: {}", path.display(), e);
            HistoryOutcome::Unreadable(e.to_string())
        }
    }
}

/// History path used when nothing is configured.
#[must_use]
pub fn default_history_path() -> PathBuf {
    PathBuf::from(DEFAULT_HISTORY_FILE)
}
