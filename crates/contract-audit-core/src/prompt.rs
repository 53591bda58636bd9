//! Prompt assembly for the auditor model.
//!
//! The system instruction fixes the persona and the shape of each finding;
//! the user message carries both documents, each cut to [`CHAR_BUDGET`]
//! characters. The output shape is a textual contract only: nothing here
//! checks that the model follows it.

use crate::document::MarkedDocument;

/// Characters kept from each document.
pub const CHAR_BUDGET: usize = 12_000;

const AUDITOR_INSTRUCTION: &str = "You are a professional compliance auditor. \
Your task is to find every discrepancy in the REPORT by checking it against the requirements of the CONTRACT.

For each discrepancy report STRICTLY:
1. Violation: the contract requirement that is not met.
2. Location: the nearest [PAGE n] or [PARAGRAPH n] marker, quoted exactly as it appears in the text.
3. Justification: the contract clause and the report passage that contradict each other.
4. Risk: what the customer can reject or penalise if the report is accepted as is.

If there are no violations, say so explicitly.";

const HISTORY_HEADER: &str = "Reports were previously rejected for the reasons below. \
Use them as an additional checklist and check every one of them:";

const CITATION_INSTRUCTION: &str =
    "Use the [PAGE] and [PARAGRAPH] markers to state the location of each finding.";

/// System instruction and user message for one audit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditPrompt {
    /// Auditor persona, output format and history checklist
    pub system_instruction: String,
    /// Truncated contract text followed by truncated report text
    pub user_content: String,
}

/// Cut `text` to at most `budget` characters.
///
/// Counts Unicode scalar values, never splits a character and ignores
/// sentence or marker boundaries. Truncating an already truncated string
/// with the same budget returns it unchanged.
#[must_use]
pub fn truncate_chars(text: &str, budget: usize) -> &str {
    match text.char_indices().nth(budget) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Build the system instruction around the history context text.
#[must_use]
pub fn system_instruction(history: &str) -> String {
    format!("{AUDITOR_INSTRUCTION}\n\n{HISTORY_HEADER}\n{history}")
}

/// Assemble the prompt for a contract/report pair.
#[must_use]
pub fn assemble(contract: &MarkedDocument, report: &MarkedDocument, history: &str) -> AuditPrompt {
    let contract_text = truncate_chars(&contract.text, CHAR_BUDGET);
    let report_text = truncate_chars(&report.text, CHAR_BUDGET);

    if contract_text.len() < contract.text.len() {
        tracing::info!(
            "Contract {} truncated to {} of {} chars",
            contract.filename,
            CHAR_BUDGET,
            contract.char_count()
        );
    }
    if report_text.len() < report.text.len() {
        tracing::info!(
            "Report {} truncated to {} of {} chars",
            report.filename,
            CHAR_BUDGET,
            report.char_count()
        );
    }

    let user_content = format!(
        "{CITATION_INSTRUCTION}\n\nCONTRACT:\n{contract_text}\n\nREPORT:\n{report_text}"
    );

    AuditPrompt {
        system_instruction: system_instruction(history),
        user_content,
    }
}
