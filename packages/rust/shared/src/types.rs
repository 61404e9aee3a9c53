//! Core domain types flowing through the scrape pipeline.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use url::Url;

/// Size placeholder when a link carries no `PDF/<n> KB` marker.
pub const UNKNOWN_SIZE: &str = "unknown";

// ---------------------------------------------------------------------------
// OutputMode
// ---------------------------------------------------------------------------

/// How extracted text is shaped into artifacts. Fixed for the lifetime of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// One text file per document.
    #[default]
    Separate,
    /// One combined file with `<document id=N>` delimiters.
    Merged,
}

impl OutputMode {
    /// Build from the `merge_texts` flag used by request bodies and the CLI.
    pub fn from_merge_flag(merge: bool) -> Self {
        if merge { Self::Merged } else { Self::Separate }
    }
}

impl std::fmt::Display for OutputMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Separate => f.write_str("separate"),
            Self::Merged => f.write_str("merged"),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline values
// ---------------------------------------------------------------------------

/// A fetched case page, still unparsed.
#[derive(Debug, Clone)]
pub struct CasePage {
    /// Final URL of the page (used as the base for relative links).
    pub url: Url,
    /// Raw HTML.
    pub html: String,
}

/// A discovered pointer to one downloadable document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentReference {
    /// 1-based position in discovery order. Assigned before any download.
    pub ordinal: usize,
    /// Absolute document URL.
    pub source_url: Url,
    /// Text of the matched element.
    pub display_text: String,
    /// Size in KB as printed on the page, or [`UNKNOWN_SIZE`].
    pub declared_size_kb: String,
    /// File name for the payload copy, e.g. `document_3_120KB.pdf`.
    pub suggested_filename: String,
}

impl DocumentReference {
    /// File stem of [`Self::suggested_filename`].
    pub fn stem(&self) -> &str {
        self.suggested_filename
            .strip_suffix(".pdf")
            .unwrap_or(&self.suggested_filename)
    }
}

/// Bytes of one downloaded document.
#[derive(Debug, Clone)]
pub struct RetrievedPayload {
    pub reference: DocumentReference,
    pub bytes: Vec<u8>,
    /// Declared `Content-Type` header, lowercased. Empty when absent.
    pub content_type: String,
    /// Hex SHA-256 of `bytes`.
    pub sha256: String,
}

/// Plain text extracted from one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub document_ordinal: usize,
    pub text: String,
}

// ---------------------------------------------------------------------------
// ScrapeResult
// ---------------------------------------------------------------------------

/// Summary of one pipeline run.
#[derive(Debug, Clone)]
pub struct ScrapeResult {
    /// Output mode the run used.
    pub mode: OutputMode,
    /// Number of document references discovered on the page.
    pub references_found: usize,
    /// Saved payload copies, in discovery order.
    pub downloaded: Vec<PathBuf>,
    /// Number of documents whose text was extracted and handed to the assembler.
    pub documents_extracted: usize,
    /// Separate-mode text files, in discovery order.
    pub produced_artifacts: Vec<PathBuf>,
    /// Merged-mode combined file, if anything was extracted.
    pub merged_artifact: Option<PathBuf>,
}

impl ScrapeResult {
    /// An empty result for a run that found nothing to do.
    pub fn empty(mode: OutputMode) -> Self {
        Self {
            mode,
            references_found: 0,
            downloaded: Vec::new(),
            documents_extracted: 0,
            produced_artifacts: Vec::new(),
            merged_artifact: None,
        }
    }

    /// True when the run completed but produced no text artifact.
    pub fn nothing_produced(&self) -> bool {
        match self.mode {
            OutputMode::Separate => self.produced_artifacts.is_empty(),
            OutputMode::Merged => self.merged_artifact.is_none(),
        }
    }
}
