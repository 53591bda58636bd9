//! One audit run: extract, assemble, ask, classify.
//!
//! Strictly linear. Both documents are extracted before anything is sent,
//! so an unreadable or empty input never reaches the model, and exactly one
//! request is issued per run.

use crate::client::{AuditResult, ChatBackend};
use crate::config::{AuditSettings, Config};
use crate::document::{extract_marked_text, MarkedDocument, UploadedFile};
use crate::error::{AuditError, Result};
use crate::history::{load_history, HistoryOutcome};
use crate::prompt::{assemble, AuditPrompt};
use std::path::Path;

/// Extract both documents, failing on the first bad one.
fn extract_pair(
    contract: &UploadedFile,
    report: &UploadedFile,
) -> Result<(MarkedDocument, MarkedDocument)> {
    let contract = extract_marked_text(contract)?;
    let report = extract_marked_text(report)?;

    tracing::info!(
        "Extracted contract {} ({} segments, {} chars) and report {} ({} segments, {} chars)",
        contract.filename,
        contract.segments,
        contract.char_count(),
        report.filename,
        report.segments,
        report.char_count()
    );

    Ok((contract, report))
}

/// Build the prompt without contacting the model.
///
/// # Errors
///
/// Returns [`AuditError::Extraction`] if either document cannot be extracted.
pub fn preview_prompt(
    contract: &UploadedFile,
    report: &UploadedFile,
    history: &HistoryOutcome,
) -> Result<AuditPrompt> {
    let (contract, report) = extract_pair(contract, report)?;
    Ok(assemble(&contract, &report, history.context_text()))
}

/// Run one audit against `backend`.
///
/// A result with only a reasoning trace is returned as `Ok`; check
/// [`AuditResult::is_reasoning_only`] before exporting.
///
/// # Errors
///
/// - [`AuditError::Extraction`] before any request if either input is bad
/// - [`AuditError::RemoteService`] from the backend
/// - [`AuditError::EmptyResponse`] if the model returned nothing at all
pub fn run_audit<B: ChatBackend>(
    settings: &AuditSettings,
    backend: &B,
    contract: &UploadedFile,
    report: &UploadedFile,
    history: &HistoryOutcome,
) -> Result<AuditResult> {
    let prompt = preview_prompt(contract, report, history)?;

    let result = backend.complete(settings.model, &prompt)?;

    if result.is_empty() {
        return Err(AuditError::EmptyResponse {
            model: settings.model.to_string(),
        });
    }
    if result.is_reasoning_only() {
        tracing::warn!("{} returned reasoning without a final answer", settings.model);
    }

    Ok(result)
}

/// Settings and result of a completed run.
#[derive(Debug, Clone)]
pub struct CompletedAudit {
    pub settings: AuditSettings,
    pub result: AuditResult,
}

/// Resolve settings, then read the inputs and run the audit.
///
/// The credential is checked first: without one, no file is read, no
/// extraction happens and `connect` is never called.
///
/// # Errors
///
/// Any [`AuditError`]; see [`run_audit`].
pub fn run_configured<B, F>(
    config: &Config,
    env_key: Option<String>,
    contract_path: &Path,
    report_path: &Path,
    connect: F,
) -> Result<CompletedAudit>
where
    B: ChatBackend,
    F: FnOnce(&AuditSettings) -> Result<B>,
{
    let settings = AuditSettings::resolve(config, env_key)?;
    let backend = connect(&settings)?;

    let contract = UploadedFile::read(contract_path)?;
    let report = UploadedFile::read(report_path)?;
    let history = load_history(&settings.history_path);

    let result = run_audit(&settings, &backend, &contract, &report, &history)?;
    Ok(CompletedAudit { settings, result })
}
