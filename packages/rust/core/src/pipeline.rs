//! End-to-end scrape pipeline: case page → links → download → extract → assemble.
//!
//! One run is strictly sequential: the page is fetched once, every reference is
//! processed fully before the next one starts, nothing is retried. A failure on a
//! single document skips that document; only a failed page fetch aborts the run.

use std::path::PathBuf;
use std::time::Instant;

use tracing::{info, instrument, warn};
use url::Url;

use courtdocs_retriever::Retriever;
use courtdocs_shared::{OutputMode, Result, ScrapeConfig, ScrapeResult};

use crate::assembler::{OutputAssembler, RunLayout};

/// Configuration for one [`scrape_case`] run.
#[derive(Debug, Clone)]
pub struct ScrapeCaseConfig {
    /// Case page URL. Assumed to have passed the host allow-list already.
    pub url: Url,
    /// Run root directory.
    pub output_root: PathBuf,
    /// Output mode, fixed for the whole run.
    pub mode: OutputMode,
    /// Delays and timeouts.
    pub scrape: ScrapeConfig,
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Stages a run moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    FetchingPage,
    DiscoveringLinks,
    ProcessingDocuments,
    Assembling,
    Done,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::FetchingPage => "Fetching case page",
            Self::DiscoveringLinks => "Discovering document links",
            Self::ProcessingDocuments => "Processing documents",
            Self::Assembling => "Assembling output",
            Self::Done => "Done",
        };
        f.write_str(label)
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, phase: RunPhase);
    /// Called before each document is downloaded.
    fn document_started(&self, current: usize, total: usize, label: &str);
    /// Called when the run completes.
    fn done(&self, result: &ScrapeResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _phase: RunPhase) {}
    fn document_started(&self, _current: usize, _total: usize, _label: &str) {}
    fn done(&self, _result: &ScrapeResult) {}
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the full scrape for one case page.
///
/// Returns `Err` only when the HTTP client cannot be built or the case page
/// cannot be fetched. Everything after that is reported through the result.
#[instrument(skip_all, fields(url = %config.url, mode = %config.mode))]
pub async fn scrape_case(
    config: &ScrapeCaseConfig,
    progress: &dyn ProgressReporter,
) -> Result<ScrapeResult> {
    let start = Instant::now();
    let retriever = Retriever::new(config.scrape.clone())?;

    // --- Page ---
    progress.phase(RunPhase::FetchingPage);
    let page = retriever.fetch_page(&config.url).await?;

    // --- Links ---
    progress.phase(RunPhase::DiscoveringLinks);
    let references = courtdocs_discovery::discover(&page);

    if references.is_empty() {
        warn!("no document links found, the page structure might have changed");
        let result = ScrapeResult::empty(config.mode);
        progress.phase(RunPhase::Done);
        progress.done(&result);
        return Ok(result);
    }

    let layout = RunLayout::create(&config.output_root, config.mode)?;
    let mut assembler = OutputAssembler::new(&layout, config.mode);
    let mut downloaded = Vec::new();
    let mut produced_artifacts = Vec::new();
    let total = references.len();

    // --- Documents ---
    progress.phase(RunPhase::ProcessingDocuments);
    for reference in &references {
        progress.document_started(reference.ordinal, total, &reference.display_text);

        let payload = match retriever.fetch_document(reference).await {
            Ok(payload) => payload,
            Err(e) => {
                warn!(ordinal = reference.ordinal, error = %e, "download failed, skipping document");
                continue;
            }
        };

        match layout.save_payload(&payload) {
            Ok(path) => downloaded.push(path),
            Err(e) => {
                warn!(ordinal = reference.ordinal, error = %e, "could not save payload, skipping document");
                continue;
            }
        }

        let text = match courtdocs_extract::extract(&payload) {
            Ok(text) => text,
            Err(e) => {
                warn!(ordinal = reference.ordinal, error = %e, "text extraction failed, skipping document");
                continue;
            }
        };

        match assembler.accept(reference.stem(), &text) {
            Ok(Some(path)) => produced_artifacts.push(path),
            Ok(None) => {}
            Err(e) => {
                warn!(ordinal = reference.ordinal, error = %e, "could not write text, skipping document");
            }
        }
    }

    // --- Output ---
    progress.phase(RunPhase::Assembling);
    let (merged_artifact, documents_extracted) = match assembler.finish() {
        Ok(output) => (output.merged_artifact, output.accepted),
        Err(e) => {
            warn!(error = %e, "could not write merged file");
            (None, 0)
        }
    };

    let result = ScrapeResult {
        mode: config.mode,
        references_found: total,
        documents_extracted,
        downloaded,
        produced_artifacts,
        merged_artifact,
    };

    progress.phase(RunPhase::Done);
    progress.done(&result);

    info!(
        references = result.references_found,
        downloaded = result.downloaded.len(),
        extracted = result.documents_extracted,
        text_files = result.produced_artifacts.len(),
        merged = result.merged_artifact.is_some(),
        elapsed_ms = start.elapsed().as_millis(),
        "scrape complete"
    );

    Ok(result)
}
