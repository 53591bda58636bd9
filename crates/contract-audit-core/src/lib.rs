//! # contract-audit-core
//!
//! Checks a report against its contract by asking an LLM auditor for
//! discrepancies, and exports the answer as a DOCX "discrepancy protocol".
//!
//! The detection itself is entirely the model's job. This crate prepares
//! the input and handles the output:
//!
//! 1. Extract both documents to text with inline `[PAGE n]` / `[PARAGRAPH n]`
//!    markers so the model can cite locations ([`document`])
//! 2. Load the optional list of past rejection reasons ([`history`])
//! 3. Assemble the system instruction and user message, each document cut
//!    to a fixed character budget ([`prompt`])
//! 4. Send one chat-completion request ([`client`])
//! 5. Write the answer to a DOCX ([`export`])
//!
//! ## Example
//!
//! ```no_run
//! use contract_audit_core::{
//!     export_report, load_config, run_configured, ChatCompletionClient, API_KEY_ENV,
//! };
//! use std::path::Path;
//!
//! # fn example() -> contract_audit_core::Result<()> {
//! let config = load_config(Path::new("config.toml"))?;
//! let audit = run_configured(
//!     &config,
//!     std::env::var(API_KEY_ENV).ok(),
//!     Path::new("contract.pdf"),
//!     Path::new("report.docx"),
//!     |settings| {
//!         ChatCompletionClient::new(
//!             settings.api_key.clone(),
//!             settings.base_url.clone(),
//!             settings.timeout,
//!         )
//!     },
//! )?;
//!
//! if audit.result.has_answer() {
//!     let artifact = export_report(&audit.result.answer)?;
//!     std::fs::write(&artifact.file_name, &artifact.bytes).ok();
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod history;
pub mod pipeline;
pub mod prompt;

pub use client::{AuditModel, AuditResult, ChatBackend, ChatCompletionClient};
pub use config::{default_config_path, load_config, AuditSettings, Config, API_KEY_ENV};
pub use document::{
    docx_paragraphs, extract_marked_text, DocumentKind, MarkedDocument, UploadedFile,
};
pub use error::{AuditError, ExtractionError, Result};
pub use export::{
    export_report, paragraphs_to_text, sanitize_answer, text_to_paragraphs, ExportArtifact,
    EXPORT_FILE_NAME, PROTOCOL_HEADING,
};
pub use history::{load_history, HistoryOutcome, NO_HISTORY_PLACEHOLDER};
pub use pipeline::{preview_prompt, run_audit, run_configured, CompletedAudit};
pub use prompt::{assemble, truncate_chars, AuditPrompt, CHAR_BUDGET};
