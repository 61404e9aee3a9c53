//! Document link discovery for court case pages.
//!
//! A case page lists its filings as links to a media endpoint
//! (`SearchMedia.aspx?MediaVersionID=...`). This crate scans the page markup and
//! returns one [`DocumentReference`] per distinct document, in page order.

mod parser;

use scraper::Html;
use tracing::{info, instrument};
use url::Url;

use courtdocs_shared::{CasePage, DocumentReference};

pub use parser::{MEDIA_ENDPOINT, MEDIA_QUERY_KEY, is_document_endpoint, is_media_endpoint};

/// Find every document reference in `markup`, resolving links against `base_url`.
///
/// An empty result is not an error: the page simply lists no documents.
#[instrument(skip_all, fields(base_url = %base_url))]
pub fn find_references(markup: &str, base_url: &Url) -> Vec<DocumentReference> {
    let doc = Html::parse_document(markup);

    let mut collector = parser::ReferenceCollector::new(base_url);
    collector.primary_pass(&doc);
    collector.secondary_pass(&doc);
    let references = collector.finish();

    info!(count = references.len(), "document links discovered");
    references
}

/// [`find_references`] over a fetched page.
pub fn discover(page: &CasePage) -> Vec<DocumentReference> {
    find_references(&page.html, &page.url)
}
