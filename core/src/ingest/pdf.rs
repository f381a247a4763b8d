use crate::determinism::run_id::sha256_hex;
use crate::error::{CoreError, CoreResult};
use lopdf::Document;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Text extracted from an uploaded URS document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrsDocument {
    pub source_name: String,
    pub sha256: String,
    pub page_count: usize,
    pub text: String,
}

/// Extract page text in page order, pages joined by newlines.
pub fn extract_pdf_text(source_name: &str, pdf_bytes: &[u8]) -> CoreResult<UrsDocument> {
    if pdf_bytes.is_empty() {
        return Err(CoreError::InvalidInput("Empty PDF bytes".to_string()));
    }
    if !pdf_bytes.starts_with(b"%PDF") {
        return Err(CoreError::InvalidInput("Invalid PDF format".to_string()));
    }

    let document =
        Document::load_mem(pdf_bytes).map_err(|e| CoreError::Pdf(format!("failed to load PDF: {}", e)))?;

    let pages = document.get_pages();
    let mut page_texts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match document.extract_text(&[*page_number]) {
            Ok(text) => page_texts.push(text),
            Err(e) => {
                debug!(page = page_number, error = %e, "page has no extractable text");
                page_texts.push(String::new());
            }
        }
    }

    let text = page_texts.join("\n");
    if text.trim().is_empty() {
        return Err(CoreError::InvalidInput(
            "No text layer found in PDF".to_string(),
        ));
    }

    info!(source = source_name, pages = pages.len(), chars = text.len(), "URS text extracted");
    Ok(UrsDocument {
        source_name: source_name.to_string(),
        sha256: sha256_hex(pdf_bytes),
        page_count: pages.len(),
        text,
    })
}

/// Plain-text URS (already extracted elsewhere).
pub fn urs_from_text(source_name: &str, text: &str) -> CoreResult<UrsDocument> {
    if text.trim().is_empty() {
        return Err(CoreError::InvalidInput("URS text is empty".to_string()));
    }
    Ok(UrsDocument {
        source_name: source_name.to_string(),
        sha256: sha256_hex(text.as_bytes()),
        page_count: 1,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_pdf() {
        assert!(matches!(
            extract_pdf_text("urs.pdf", b""),
            Err(CoreError::InvalidInput(_))
        ));
        assert!(matches!(
            extract_pdf_text("urs.pdf", b"PK\x03\x04 not a pdf"),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn truncated_pdf_is_rejected() {
        assert!(extract_pdf_text("urs.pdf", b"%PDF-1.4\n%garbage").is_err());
    }

    #[test]
    fn text_urs_is_hashed() {
        let doc = urs_from_text("urs.txt", "URS-01 The system shall log in.").unwrap();
        assert_eq!(doc.sha256.len(), 64);
        assert!(urs_from_text("urs.txt", "   ").is_err());
    }
}
