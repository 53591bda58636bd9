//! Error types for an audit run.
//!
//! Every variant is terminal for the current run. Nothing here is retried
//! and there is no fallback model; the only soft failure in the crate is a
//! missing history file, which never becomes an error (see
//! [`crate::history`]).

use thiserror::Error;

/// Failure to turn an input file into marked text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    /// The file could not be read or is not a valid PDF/DOCX.
    #[error("Failed to read {filename}: {reason}")]
    Unreadable {
        /// Name of the offending input file
        filename: String,
        /// Underlying parser or I/O message
        reason: String,
    },

    /// The file parsed but produced no text at all.
    #[error("No text could be extracted from {filename}")]
    Empty {
        /// Name of the offending input file
        filename: String,
    },
}

impl ExtractionError {
    /// Name of the input file that failed.
    #[must_use]
    pub fn filename(&self) -> &str {
        match self {
            Self::Unreadable { filename, .. } | Self::Empty { filename } => filename,
        }
    }

    pub(crate) fn unreadable(filename: &str, reason: impl std::fmt::Display) -> Self {
        Self::Unreadable {
            filename: filename.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Error taxonomy of an audit run.
///
/// # Examples
///
/// ```
/// use contract_audit_core::{AuditError, ExtractionError};
///
/// let err = AuditError::from(ExtractionError::Empty {
///     filename: "report.docx".to_string(),
/// });
/// assert!(err.to_string().contains("report.docx"));
/// ```
#[derive(Error, Debug)]
pub enum AuditError {
    /// Missing credential or invalid configuration.
    ///
    /// Raised before any file is read or any request is made.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// An input document could not be extracted.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Network or API failure, carrying the service's message verbatim.
    #[error("Remote service error: {0}")]
    RemoteService(String),

    /// The service answered, but with neither an answer nor a reasoning trace.
    #[error("Model {model} returned an empty response; try again or switch to another model")]
    EmptyResponse {
        /// Model identifier that produced the empty response
        model: String,
    },

    /// The protocol document could not be written.
    #[error("Export error: {0}")]
    Export(String),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuditError>;
