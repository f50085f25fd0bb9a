//! PDF text extraction.
//!
//! Extraction stays deliberately shallow: lopdf pulls the text of each page
//! and the pages are joined with newlines, matching what the summarize and
//! ask prompts expect. Anything beyond that (layout, OCR) is out of scope.

use lopdf::Document;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading text out of a PDF file.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The file could not be parsed as a PDF document.
    #[error("Error extracting PDF content: {0}")]
    Parse(String),
}

/// Extract the plain text of a PDF, page by page, joined with newlines.
///
/// Pages without readable text are skipped; an entirely unreadable document
/// is an error so the upload handler can report it.
pub fn extract_text(path: &Path) -> Result<String, ExtractError> {
    let document = Document::load(path).map_err(|error| ExtractError::Parse(error.to_string()))?;

    let mut pages = Vec::new();
    for (page_no, _page_id) in document.get_pages() {
        let text = document
            .extract_text(&[page_no])
            .map_err(|error| ExtractError::Parse(error.to_string()))?;
        if !text.trim().is_empty() {
            pages.push(text);
        }
    }

    if pages.is_empty() {
        return Err(ExtractError::Parse(format!(
            "pdf had no readable page text: {}",
            path.display()
        )));
    }

    Ok(pages.join("\n"))
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Minimal single-page PDF builder shared by extraction and handler tests.
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    /// Render `text` on one page and return the serialized PDF bytes.
    pub(crate) fn pdf_bytes(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("serialize pdf");
        bytes
    }
}
