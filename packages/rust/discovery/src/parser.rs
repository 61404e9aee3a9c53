//! Case page scanner.
//!
//! Two passes over the parsed HTML:
//! - primary: every `a[href]` that points at the media endpoint
//! - secondary: `td`/`div` cells that mention "PDF", whose enclosing container
//!   holds a media endpoint anchor the primary pass did not already collect
//!
//! The secondary pass only needs the endpoint path, so it also picks up
//! media links that lack the `MediaVersionID` key.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use courtdocs_shared::{DocumentReference, UNKNOWN_SIZE};

/// Path segment of the document retrieval endpoint.
pub const MEDIA_ENDPOINT: &str = "SearchMedia.aspx";

/// Query key every document link carries.
pub const MEDIA_QUERY_KEY: &str = "MediaVersionID";

// ---------------------------------------------------------------------------
// Patterns (compiled once)
// ---------------------------------------------------------------------------

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector"));

static CELL_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, div").expect("cell selector"));

/// Matches `PDF/120 KB` and captures the number.
static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PDF/(\d+)\s*KB").expect("size regex"));

// ---------------------------------------------------------------------------
// Collector
// ---------------------------------------------------------------------------

/// Accumulates references across both passes. Ordinals come from one shared counter.
pub(crate) struct ReferenceCollector<'a> {
    base_url: &'a Url,
    references: Vec<DocumentReference>,
    seen: HashSet<String>,
}

impl<'a> ReferenceCollector<'a> {
    pub(crate) fn new(base_url: &'a Url) -> Self {
        Self {
            base_url,
            references: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Scan every anchor for the endpoint pattern.
    pub(crate) fn primary_pass(&mut self, doc: &Html) {
        for anchor in doc.select(&ANCHOR_SEL) {
            let Some(url) = self.resolve(anchor).filter(is_document_endpoint) else {
                continue;
            };

            let text = visible_text(anchor);
            // Sizes are often split across inline elements (`PDF/<b>120</b> KB`),
            // so the pattern runs over the unseparated text.
            let size = SIZE_RE
                .captures(&compact_text(anchor))
                .map(|c| c[1].to_string())
                .unwrap_or_else(|| UNKNOWN_SIZE.to_string());

            self.push(url, text, size, |n, size| format!("document_{n}_{size}KB.pdf"));
        }
    }

    /// Scan cells mentioning the document type for a neighbouring endpoint anchor.
    pub(crate) fn secondary_pass(&mut self, doc: &Html) {
        for cell in doc.select(&CELL_SEL) {
            if !own_text_mentions_pdf(cell) {
                continue;
            }

            let Some(container) = cell.parent().and_then(ElementRef::wrap) else {
                continue;
            };
            let Some(anchor) = container.select(&ANCHOR_SEL).next() else {
                continue;
            };
            let Some(url) = self.resolve(anchor).filter(is_media_endpoint) else {
                continue;
            };

            self.push(url, visible_text(cell), UNKNOWN_SIZE.to_string(), |n, _| {
                format!("document_{n}.pdf")
            });
        }
    }

    pub(crate) fn finish(self) -> Vec<DocumentReference> {
        self.references
    }

    fn resolve(&self, anchor: ElementRef<'_>) -> Option<Url> {
        let href = anchor.value().attr("href")?;
        self.base_url.join(href).ok()
    }

    fn push(
        &mut self,
        url: Url,
        display_text: String,
        size: String,
        filename: impl Fn(usize, &str) -> String,
    ) {
        if !self.seen.insert(url.to_string()) {
            debug!(%url, "duplicate document link, skipping");
            return;
        }

        let ordinal = self.references.len() + 1;
        let suggested_filename = filename(ordinal, &size);
        debug!(%url, ordinal, size_kb = %size, "document link found");

        self.references.push(DocumentReference {
            ordinal,
            source_url: url,
            display_text,
            declared_size_kb: size,
            suggested_filename,
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Whether a resolved URL targets the media endpoint.
pub fn is_media_endpoint(url: &Url) -> bool {
    url.path().contains(MEDIA_ENDPOINT)
}

/// Whether a resolved URL targets the media endpoint with the required query key.
pub fn is_document_endpoint(url: &Url) -> bool {
    is_media_endpoint(url) && url.query_pairs().any(|(k, _)| k == MEDIA_QUERY_KEY)
}

/// Text nodes of an element, each trimmed, empty ones dropped, joined by single spaces.
fn visible_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Text nodes of an element, each trimmed, concatenated without separators.
fn compact_text(el: ElementRef<'_>) -> String {
    el.text().map(str::trim).collect()
}

/// Whether the element's direct text children mention "pdf" in any case.
fn own_text_mentions_pdf(el: ElementRef<'_>) -> bool {
    el.children()
        .filter_map(|child| child.value().as_text())
        .any(|text| text.to_lowercase().contains("pdf"))
}
