//! Document text extraction with inline position markers.
//!
//! Turns an input file into a single string the auditor model can cite:
//!
//! - PDF: every page is prefixed with `[PAGE n]` (via `pdf_extract`, pure Rust)
//! - DOCX: every non-blank body paragraph is prefixed with `[PARAGRAPH n]`
//!   (manual ZIP + XML parsing of `word/document.xml`)
//!
//! Markers are plain text. No offsets or structure survive extraction; the
//! output is only meant to be echoed back by the model as a citation.
//!
//! Format dispatch is purely on the file name: `.pdf` is PDF, everything
//! else is treated as DOCX. There is no content sniffing.

use crate::error::ExtractionError;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::fmt::Write;
use std::io::{Cursor, Read};
use std::path::Path;
use zip::ZipArchive;

/// Input format, decided by file name suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Portable Document Format, marked per page
    Pdf,
    /// Office Open XML word-processing document, marked per paragraph
    Docx,
}

impl DocumentKind {
    /// Pick the extractor for a file name. Anything that is not `.pdf` is DOCX.
    #[must_use]
    pub fn from_filename(name: &str) -> Self {
        if name.to_ascii_lowercase().ends_with(".pdf") {
            Self::Pdf
        } else {
            Self::Docx
        }
    }

    /// Marker label used for this kind's segments.
    #[must_use]
    pub const fn marker_label(&self) -> &'static str {
        match self {
            Self::Pdf => "PAGE",
            Self::Docx => "PARAGRAPH",
        }
    }
}

/// One input file, captured as an owned copy at the start of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// File name used for format dispatch and error messages
    pub name: String,
    /// Raw file content
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Wrap bytes that are already in memory.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Read a file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::Unreadable`] if the file cannot be read.
    pub fn read(path: &Path) -> Result<Self, ExtractionError> {
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().to_string(),
        );
        let bytes = std::fs::read(path).map_err(|e| ExtractionError::unreadable(&name, e))?;
        Ok(Self { name, bytes })
    }

    /// Format this file will be extracted as.
    #[must_use]
    pub fn kind(&self) -> DocumentKind {
        DocumentKind::from_filename(&self.name)
    }
}

/// Marked-up text of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedDocument {
    /// Source file name
    pub filename: String,
    /// Format the text was extracted from
    pub kind: DocumentKind,
    /// Concatenated `[PAGE n]` / `[PARAGRAPH n]` segments
    pub text: String,
    /// Number of markers emitted
    pub segments: usize,
}

impl MarkedDocument {
    /// Length of the marked text in characters.
    #[inline]
    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract marked text from an input file.
///
/// # Errors
///
/// - [`ExtractionError::Unreadable`] if the bytes are not a readable PDF/DOCX
/// - [`ExtractionError::Empty`] if no page or paragraph contains any text
pub fn extract_marked_text(file: &UploadedFile) -> Result<MarkedDocument, ExtractionError> {
    let kind = file.kind();
    let (text, segments, has_content) = match kind {
        DocumentKind::Pdf => mark_pdf_pages(&file.name, &file.bytes)?,
        DocumentKind::Docx => mark_docx_paragraphs(&file.name, &file.bytes)?,
    };

    if !has_content {
        return Err(ExtractionError::Empty {
            filename: file.name.clone(),
        });
    }

    tracing::debug!(
        "Extracted {}: {} {} markers, {} chars",
        file.name,
        segments,
        kind.marker_label(),
        text.len()
    );

    Ok(MarkedDocument {
        filename: file.name.clone(),
        kind,
        text,
        segments,
    })
}

/// Mark every PDF page, blank or not.
fn mark_pdf_pages(name: &str, bytes: &[u8]) -> Result<(String, usize, bool), ExtractionError> {
    // pdf_extract panics on some malformed inputs instead of returning Err.
    // The process panic hook still runs first; binaries that want a quiet
    // stderr must filter these panics in their own hook.
    let pages = std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem_by_pages(bytes))
        .map_err(|_| ExtractionError::unreadable(name, "PDF parser aborted on malformed input"))?
        .map_err(|e| ExtractionError::unreadable(name, e))?;

    let mut text = String::new();
    let mut has_content = false;
    for (i, page) in pages.iter().enumerate() {
        let _ = write!(text, "\n[PAGE {}]\n{page}", i + 1);
        has_content |= !page.trim().is_empty();
    }

    Ok((text, pages.len(), has_content))
}

/// Mark non-blank DOCX paragraphs; blank ones keep their ordinal.
fn mark_docx_paragraphs(
    name: &str,
    bytes: &[u8],
) -> Result<(String, usize, bool), ExtractionError> {
    let paragraphs = docx_paragraphs(name, bytes)?;

    let mut text = String::new();
    let mut segments = 0;
    for (i, paragraph) in paragraphs.iter().enumerate() {
        if paragraph.trim().is_empty() {
            continue;
        }
        let _ = writeln!(text, "[PARAGRAPH {}] {paragraph}", i + 1);
        segments += 1;
    }

    Ok((text, segments, segments > 0))
}

/// Read the body paragraphs of a DOCX file, in document order.
///
/// Only paragraphs that are direct children of `w:body` are returned, so
/// table content is not part of the sequence. Empty paragraphs are kept as
/// empty strings so indices match the source ordinal.
///
/// # Errors
///
/// Returns [`ExtractionError::Unreadable`] if the bytes are not a ZIP archive,
/// `word/document.xml` is missing, or the XML is malformed.
pub fn docx_paragraphs(name: &str, bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|e| ExtractionError::unreadable(name, format!("not a DOCX archive: {e}")))?;

    let xml_content = {
        let mut document_xml = archive
            .by_name("word/document.xml")
            .map_err(|e| ExtractionError::unreadable(name, format!("missing word/document.xml: {e}")))?;
        let mut content = String::new();
        document_xml
            .read_to_string(&mut content)
            .map_err(|e| ExtractionError::unreadable(name, e))?;
        content
    };

    walk_body_paragraphs(&xml_content).map_err(|e| ExtractionError::unreadable(name, e))
}

/// Element path of a body-level paragraph's parent: `w:document/w:body`.
fn is_body_level(stack: &[Vec<u8>]) -> bool {
    matches!(stack, [document, body] if document == b"document" && body == b"body")
}

/// Run whose text belongs to the paragraph itself: `w:p/w:r` or
/// `w:p/w:hyperlink/w:r`. Deeper runs (text boxes under `w:drawing`,
/// `w:pict` or `mc:AlternateContent`) are not paragraph text; Word also
/// stores text boxes twice, once per alternate-content branch.
fn is_paragraph_run(stack: &[Vec<u8>]) -> bool {
    match stack {
        [_, _, p, r] => p == b"p" && r == b"r",
        [_, _, p, link, r] => p == b"p" && link == b"hyperlink" && r == b"r",
        _ => false,
    }
}

fn walk_body_paragraphs(xml: &str) -> Result<Vec<String>, String> {
    let mut reader = Reader::from_str(xml);

    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                match name.as_slice() {
                    b"p" if is_body_level(&stack) => current = Some(String::new()),
                    b"t" if current.is_some() && is_paragraph_run(&stack) => {
                        in_text = true;
                    }
                    _ => {}
                }
                stack.push(name);
            }
            Ok(Event::Empty(e)) => {
                let in_run = current.is_some() && is_paragraph_run(&stack);
                match e.local_name().as_ref() {
                    b"p" if is_body_level(&stack) => paragraphs.push(String::new()),
                    b"tab" if in_run => {
                        if let Some(p) = current.as_mut() {
                            p.push('\t');
                        }
                    }
                    b"br" | b"cr" if in_run => {
                        if let Some(p) = current.as_mut() {
                            p.push('\n');
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                stack.pop();
                match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if is_body_level(&stack) => {
                        if let Some(p) = current.take() {
                            paragraphs.push(p);
                        }
                    }
                    _ => {}
                }
            }
            Ok(Event::Text(t)) if in_text => {
                let text = t.unescape().map_err(|e| format!("bad text content: {e}"))?;
                if let Some(p) = current.as_mut() {
                    p.push_str(&text);
                }
            }
            Ok(Event::CData(c)) if in_text => {
                if let Some(p) = current.as_mut() {
                    p.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!(
                    "malformed word/document.xml at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
            _ => {}
        }
    }

    Ok(paragraphs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    fn docx_with_body(body: &str) -> Vec<u8> {
        let xml = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
        );
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(xml.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn para(text: &str) -> String {
        format!(r#"<w:p><w:r><w:t xml:space="preserve">{text}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn test_kind_dispatch_on_suffix() {
        assert_eq!(DocumentKind::from_filename("contract.pdf"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("CONTRACT.PDF"), DocumentKind::Pdf);
        assert_eq!(DocumentKind::from_filename("report.docx"), DocumentKind::Docx);
        // No sniffing: anything else goes to the DOCX reader
        assert_eq!(DocumentKind::from_filename("notes.txt"), DocumentKind::Docx);
        assert_eq!(DocumentKind::from_filename("pdf"), DocumentKind::Docx);
    }

    #[test]
    fn test_docx_paragraph_markers_keep_source_ordinals() {
        let body = [
            para("Scope of work"),
            "<w:p/>".to_string(),
            para("   "),
            para("Deliverable due 2024-02-01"),
        ]
        .concat();
        let file = UploadedFile::new("report.docx", docx_with_body(&body));

        let doc = extract_marked_text(&file).unwrap();
        assert_eq!(doc.kind, DocumentKind::Docx);
        assert_eq!(doc.segments, 2);
        assert_eq!(
            doc.text,
            "[PARAGRAPH 1] Scope of work\n[PARAGRAPH 4] Deliverable due 2024-02-01\n"
        );
    }

    #[test]
    fn test_docx_runs_tabs_and_breaks() {
        let body = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:t>Item</w:t></w:r><w:r><w:tab/><w:t xml:space="preserve"> 1 &amp; 2</w:t><w:br/><w:t>next</w:t></w:r></w:p>"#;
        let paragraphs = docx_paragraphs("a.docx", &docx_with_body(body)).unwrap();
        assert_eq!(paragraphs, vec!["Item\t 1 & 2\nnext".to_string()]);
    }

    #[test]
    fn test_docx_hyperlink_text_is_included() {
        let body = r#"<w:p><w:r><w:t xml:space="preserve">See </w:t></w:r><w:hyperlink r:id="rId5" xmlns:r="r"><w:r><w:t>annex A</w:t></w:r></w:hyperlink></w:p>"#;
        let paragraphs = docx_paragraphs("a.docx", &docx_with_body(body)).unwrap();
        assert_eq!(paragraphs, vec!["See annex A".to_string()]);
    }

    #[test]
    fn test_docx_text_box_content_is_not_paragraph_text() {
        let text_box = |text: &str| {
            format!(
                r#"<w:txbxContent><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:txbxContent>"#
            )
        };
        let body = format!(
            r#"<w:p><w:r><w:t xml:space="preserve">Clause 4.</w:t></w:r><w:r><mc:AlternateContent xmlns:mc="mc"><mc:Choice Requires="wps"><w:drawing><wp:anchor xmlns:wp="wp"><a:graphic xmlns:a="a"><a:graphicData><wps:wsp xmlns:wps="wps"><wps:txbx>{}</wps:txbx></wps:wsp></a:graphicData></a:graphic></wp:anchor></w:drawing></mc:Choice><mc:Fallback><w:pict><v:shape xmlns:v="v"><v:textbox>{}</v:textbox></v:shape></w:pict></mc:Fallback></mc:AlternateContent></w:r><w:r><w:t xml:space="preserve"> Signed.</w:t></w:r></w:p>"#,
            text_box("Draft"),
            text_box("Draft")
        );
        let paragraphs = docx_paragraphs("a.docx", &docx_with_body(&body)).unwrap();
        assert_eq!(paragraphs, vec!["Clause 4. Signed.".to_string()]);
    }

    #[test]
    fn test_docx_table_paragraphs_are_not_body_paragraphs() {
        let body = [
            para("Before table"),
            format!("<w:tbl><w:tr><w:tc>{}</w:tc></w:tr></w:tbl>", para("In a cell")),
            para("After table"),
        ]
        .concat();
        let paragraphs = docx_paragraphs("a.docx", &docx_with_body(&body)).unwrap();
        assert_eq!(paragraphs, vec!["Before table", "After table"]);
    }

    #[test]
    fn test_docx_only_blank_paragraphs_is_empty_error() {
        let body = ["<w:p/>".to_string(), para(" \t ")].concat();
        let file = UploadedFile::new("blank.docx", docx_with_body(&body));
        let err = extract_marked_text(&file).unwrap_err();
        assert_eq!(
            err,
            ExtractionError::Empty {
                filename: "blank.docx".to_string()
            }
        );
    }

    #[test]
    fn test_non_zip_is_unreadable() {
        let file = UploadedFile::new("report.docx", b"plain text, not a zip".to_vec());
        let err = extract_marked_text(&file).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
        assert_eq!(err.filename(), "report.docx");
    }

    #[test]
    fn test_zip_without_document_xml_is_unreadable() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("other.xml", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"<doc/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = docx_paragraphs("odd.docx", &bytes).unwrap_err();
        assert!(err.to_string().contains("missing word/document.xml"));
    }

    #[test]
    fn test_garbage_pdf_is_unreadable() {
        let file = UploadedFile::new("contract.pdf", b"not a pdf".to_vec());
        let err = extract_marked_text(&file).unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable { .. }));
    }

    #[test]
    fn test_uploaded_file_read_missing_is_unreadable() {
        let err = UploadedFile::read(Path::new("/nonexistent/contract.pdf")).unwrap_err();
        assert_eq!(err.filename(), "contract.pdf");
    }
}
