//! PDF-to-text extraction.
//!
//! Loads a payload with `lopdf`, extracts each page's text in page order, joins
//! pages with a newline and trims the result. Extraction is a pure function of
//! the payload bytes, so re-running it on an unchanged document yields identical text.

use lopdf::Document;
use tracing::{debug, instrument, warn};

use courtdocs_shared::{CourtDocsError, ExtractedText, Result, RetrievedPayload};

/// Extract the text of one downloaded document.
#[instrument(skip_all, fields(ordinal = payload.reference.ordinal, bytes = payload.bytes.len()))]
pub fn extract(payload: &RetrievedPayload) -> Result<ExtractedText> {
    let text = extract_text(&payload.bytes)?;
    Ok(ExtractedText {
        document_ordinal: payload.reference.ordinal,
        text,
    })
}

/// Extract plain text from raw PDF bytes.
///
/// Fails only when the bytes are not a loadable PDF. A page whose content
/// cannot be decoded contributes an empty line.
pub fn extract_text(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| CourtDocsError::extraction(format!("not a readable PDF: {e}")))?;

    let pages = doc.get_pages();
    let mut text = String::new();

    for &number in pages.keys() {
        match doc.extract_text(&[number]) {
            Ok(page_text) => text.push_str(&page_text),
            Err(e) => warn!(page = number, error = %e, "page text could not be decoded"),
        }
        text.push('\n');
    }

    let text = text.trim().to_string();
    debug!(pages = pages.len(), chars = text.len(), "text extracted");
    Ok(text)
}
