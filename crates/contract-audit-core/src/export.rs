//! Discrepancy protocol export (DOCX).
//!
//! The model's answer is written as a fixed heading, then one paragraph per
//! line of the answer. Blank lines become empty paragraphs.
//!
//! Two normalisations apply before writing, see [`sanitize_answer`]:
//! `\r\n` and a lone `\r` are line breaks, and characters XML 1.0 cannot
//! carry (C0 controls other than tab and newline, U+FFFE, U+FFFF) are
//! dropped. Reading the paragraphs back and joining them with `\n` restores
//! the sanitized answer, which equals the answer itself whenever it has
//! neither.

use crate::error::{AuditError, Result};
use docx_rs::{Docx, Paragraph, Run, Style, StyleType};
use std::io::Cursor;

/// Heading of the exported protocol.
pub const PROTOCOL_HEADING: &str = "DISCREPANCY PROTOCOL";

/// Default file name offered for the export.
pub const EXPORT_FILE_NAME: &str = "Audit_Report.docx";

/// MIME type of the export.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

const TITLE_STYLE: &str = "Title";

/// Exported protocol document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    /// Suggested file name
    pub file_name: String,
    /// MIME type of `bytes`
    pub mime_type: &'static str,
    /// DOCX content
    pub bytes: Vec<u8>,
}

/// Split answer text into paragraphs, one per line. Blank lines are kept.
///
/// `\n`, `\r\n` and a lone `\r` all end a line.
#[must_use]
pub fn text_to_paragraphs(text: &str) -> Vec<String> {
    normalize_line_endings(text)
        .split('\n')
        .map(str::to_string)
        .collect()
}

fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Characters allowed in an XML 1.0 document. `char` already excludes
/// surrogates.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Answer text exactly as the exported protocol will carry it.
#[must_use]
pub fn sanitize_answer(answer: &str) -> String {
    normalize_line_endings(answer)
        .chars()
        .filter(|&c| is_xml_char(c))
        .collect()
}

/// Inverse of [`text_to_paragraphs`].
#[must_use]
pub fn paragraphs_to_text<S: AsRef<str>>(paragraphs: &[S]) -> String {
    paragraphs
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the protocol DOCX for an answer.
///
/// # Errors
///
/// Returns [`AuditError::Export`] if the document cannot be packaged.
pub fn export_report(answer: &str) -> Result<ExportArtifact> {
    let title_style = Style::new(TITLE_STYLE, StyleType::Paragraph)
        .name(TITLE_STYLE)
        .size(52)
        .bold();

    let mut docx = Docx::new().add_style(title_style).add_paragraph(
        Paragraph::new()
            .add_run(Run::new().add_text(PROTOCOL_HEADING))
            .style(TITLE_STYLE),
    );

    let sanitized = sanitize_answer(answer);
    if sanitized.len() != answer.len() {
        tracing::debug!(
            "Normalised answer for export: {} -> {} bytes",
            answer.len(),
            sanitized.len()
        );
    }

    let paragraphs = text_to_paragraphs(&sanitized);
    let count = paragraphs.len();
    for line in paragraphs {
        let paragraph = if line.is_empty() {
            Paragraph::new()
        } else {
            Paragraph::new().add_run(Run::new().add_text(line))
        };
        docx = docx.add_paragraph(paragraph);
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| AuditError::Export(format!("failed to write DOCX: {e}")))?;
    let bytes = buffer.into_inner();

    tracing::debug!("Exported protocol: {} paragraphs, {} bytes", count, bytes.len());

    Ok(ExportArtifact {
        file_name: EXPORT_FILE_NAME.to_string(),
        mime_type: DOCX_MIME_TYPE,
        bytes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::docx_paragraphs;

    fn read_back(artifact: &ExportArtifact) -> Vec<String> {
        docx_paragraphs(&artifact.file_name, &artifact.bytes).unwrap()
    }

    #[test]
    fn test_text_to_paragraphs_keeps_blank_lines() {
        assert_eq!(
            text_to_paragraphs("a\n\n\nb"),
            vec!["a", "", "", "b"]
        );
        assert_eq!(text_to_paragraphs(""), vec![""]);
        assert_eq!(text_to_paragraphs("tail\n"), vec!["tail", ""]);
    }

    #[test]
    fn test_paragraphs_to_text_inverts_split() {
        for text in ["", "\n", "one", "a\n\nb\n", "### 1. Violation\n\n**Risk:** high"] {
            assert_eq!(paragraphs_to_text(&text_to_paragraphs(text)), text);
        }
    }

    #[test]
    fn test_text_to_paragraphs_accepts_crlf_and_cr() {
        assert_eq!(text_to_paragraphs("a\r\nb\rc\n"), vec!["a", "b", "c", ""]);
        assert_eq!(text_to_paragraphs("\r\n\r\n"), vec!["", "", ""]);
    }

    #[test]
    fn test_sanitize_drops_xml_invalid_characters() {
        assert_eq!(sanitize_answer("a\u{b}b\u{0}c\u{1f}"), "abc");
        assert_eq!(sanitize_answer("tab\tok\u{fffe}\u{ffff}"), "tab\tok");
        assert_eq!(sanitize_answer("Ünïcödé € 𝄞"), "Ünïcödé € 𝄞");
    }

    #[test]
    fn test_export_crlf_answer_reads_back_normalised() {
        let artifact = export_report("a\r\nb\rc").unwrap();
        assert_eq!(paragraphs_to_text(&read_back(&artifact)[1..]), "a\nb\nc");
    }

    #[test]
    fn test_export_never_writes_control_characters() {
        let artifact = export_report("a\u{b}b\u{0}").unwrap();

        let mut archive = zip::ZipArchive::new(Cursor::new(&artifact.bytes)).unwrap();
        let mut xml = String::new();
        std::io::Read::read_to_string(
            &mut archive.by_name("word/document.xml").unwrap(),
            &mut xml,
        )
        .unwrap();
        assert!(!xml.contains('\u{b}'));
        assert!(!xml.contains('\u{0}'));
        assert_eq!(read_back(&artifact)[1..], ["ab"]);
    }

    #[test]
    fn test_export_metadata() {
        let artifact = export_report("No violations found.").unwrap();
        assert_eq!(artifact.file_name, "Audit_Report.docx");
        assert_eq!(
            artifact.mime_type,
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        // DOCX is a ZIP container
        assert_eq!(&artifact.bytes[..2], b"PK");
    }

    #[test]
    fn test_export_heading_comes_first() {
        let artifact = export_report("body").unwrap();
        let paragraphs = read_back(&artifact);
        assert_eq!(paragraphs[0], PROTOCOL_HEADING);
        assert_eq!(&paragraphs[1..], ["body"]);
    }

    #[test]
    fn test_export_round_trips_answer_text() {
        let answer = "1. Violation: delivery date moved\n\
                      \n\
                      2. Location: [PAGE 1] vs [PARAGRAPH 3]\n\
                      \x20  3. Justification: <contract> & \"report\" differ\n\
                      \n\
                      4. Risk: penalty 0.1% per day\n";
        let artifact = export_report(answer).unwrap();
        let paragraphs = read_back(&artifact);

        assert_eq!(paragraphs_to_text(&paragraphs[1..]), answer);
    }
}
