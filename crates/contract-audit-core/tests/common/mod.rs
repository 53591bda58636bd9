//! Shared fixtures for integration tests.
//!
//! Builds small PDF and DOCX files in memory and provides a chat backend
//! that records what it was asked.

#![allow(dead_code)]

use contract_audit_core::{
    AuditError, AuditModel, AuditPrompt, AuditResult, ChatBackend, Result,
};
use lopdf::dictionary;
use lopdf::{Document, Object, Stream};
use std::cell::RefCell;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

fn escape_pdf_string(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('(', "\\(")
        .replace(')', "\\)")
}

/// PDF with one page per entry, each page showing its text in Helvetica.
/// An empty entry produces a page without any text.
pub fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => font_id,
        },
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = if text.is_empty() {
            String::new()
        } else {
            format!("BT /F1 12 Tf 72 720 Td ({}) Tj ET", escape_pdf_string(text))
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => resources_id,
        });
        kids.push(page_id.into());
    }

    let count = i64::try_from(kids.len()).unwrap();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// DOCX whose body holds one paragraph per entry. Empty entries become
/// `<w:p/>`.
pub fn docx_with_paragraphs(paragraphs: &[&str]) -> Vec<u8> {
    let mut body = String::new();
    for text in paragraphs {
        if text.is_empty() {
            body.push_str("<w:p/>");
        } else {
            body.push_str(&format!(
                r#"<w:p><w:r><w:t xml:space="preserve">{}</w:t></w:r></w:p>"#,
                quick_xml::escape::escape(*text)
            ));
        }
    }

    let xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}<w:sectPr/></w:body></w:document>"#
    );

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file("[Content_Types].xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"/>"#)
        .unwrap();
    zip.start_file("word/document.xml", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// Indices of all `[<label> n]` markers in order of appearance.
pub fn marker_indices(text: &str, label: &str) -> Vec<usize> {
    let open = format!("[{label} ");
    let mut indices = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        if let Some(end) = rest.find(']') {
            if let Ok(n) = rest[..end].parse() {
                indices.push(n);
            }
        }
    }
    indices
}

/// Backend that records every prompt and replies with a canned result.
pub struct RecordingBackend {
    reply: std::result::Result<AuditResult, String>,
    pub prompts: RefCell<Vec<(AuditModel, AuditPrompt)>>,
}

impl RecordingBackend {
    pub fn answering(answer: &str, reasoning: Option<&str>) -> Self {
        Self {
            reply: Ok(AuditResult::new(answer, reasoning.map(str::to_string))),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.borrow().len()
    }
}

impl ChatBackend for RecordingBackend {
    fn complete(&self, model: AuditModel, prompt: &AuditPrompt) -> Result<AuditResult> {
        self.prompts.borrow_mut().push((model, prompt.clone()));
        self.reply.clone().map_err(AuditError::RemoteService)
    }
}
