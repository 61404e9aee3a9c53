//! Page and document fetching.
//!
//! Requests are strictly sequential. After a successful page fetch the retriever
//! sleeps for the configured page delay, after each successful document fetch for
//! the document delay. Failures return immediately and are never retried.

use std::time::Duration;

use reqwest::Client;
use reqwest::redirect::Policy;
use reqwest::header::{
    ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, DNT, HeaderMap, HeaderValue,
    UPGRADE_INSECURE_REQUESTS,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};
use url::Url;

use courtdocs_shared::{
    CasePage, CourtDocsError, DocumentReference, Result, RetrievedPayload, ScrapeConfig,
    host_allowed,
};

/// Desktop browser User-Agent. The court site rejects obvious bots.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8";

const BROWSER_ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// Headers sent with every request (besides User-Agent and Accept-Encoding,
/// which the client sets itself).
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(BROWSER_ACCEPT_LANGUAGE));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    headers
}

/// Follow at most [`MAX_REDIRECTS`] hops, and only to allow-listed hosts.
fn redirect_policy(allowed_hosts: Vec<String>) -> Policy {
    Policy::custom(move |attempt| {
        if attempt.previous().len() > MAX_REDIRECTS {
            return attempt.error("too many redirects");
        }
        let host = attempt.url().host_str().unwrap_or_default().to_string();
        if host_allowed(&allowed_hosts, &host) {
            attempt.follow()
        } else {
            warn!(%host, "redirect to a host outside the allow-list refused");
            attempt.error(format!("redirect to host outside the allow-list: {host}"))
        }
    })
}

// ---------------------------------------------------------------------------
// Retriever
// ---------------------------------------------------------------------------

/// Fetches the case page and its documents over one reused HTTP client.
///
/// Owned by a single pipeline run; not meant to be shared between concurrent runs.
pub struct Retriever {
    client: Client,
    config: ScrapeConfig,
}

impl Retriever {
    /// Build a retriever with the fixed browser header set.
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .redirect(redirect_policy(config.allowed_hosts.clone()))
            .build()
            .map_err(|e| CourtDocsError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Fetch the case page HTML, then pause for the page delay.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn fetch_page(&self, url: &Url) -> Result<CasePage> {
        self.ensure_allowed(url)?;
        info!("fetching case page");

        let response = self
            .client
            .get(url.as_str())
            .timeout(self.config.page_timeout)
            .send()
            .await
            .map_err(|e| CourtDocsError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourtDocsError::Transport(format!("{url}: HTTP {status}")));
        }

        let final_url = response.url().clone();
        let html = response
            .text()
            .await
            .map_err(|e| CourtDocsError::Transport(format!("{url}: body read failed: {e}")))?;

        debug!(bytes = html.len(), %final_url, "case page fetched");
        pause(self.config.page_delay).await;

        Ok(CasePage {
            url: final_url,
            html,
        })
    }

    /// Stream one document payload, then pause for the document delay.
    ///
    /// A declared content type without "pdf" is logged and otherwise ignored:
    /// the endpoint pattern is trusted over the header.
    #[instrument(skip_all, fields(ordinal = reference.ordinal, url = %reference.source_url))]
    pub async fn fetch_document(&self, reference: &DocumentReference) -> Result<RetrievedPayload> {
        let url = &reference.source_url;
        self.ensure_allowed(url)?;
        info!(
            text = %reference.display_text,
            size_kb = %reference.declared_size_kb,
            "downloading document"
        );

        let mut response = self
            .client
            .get(url.as_str())
            .timeout(self.config.document_timeout)
            .send()
            .await
            .map_err(|e| CourtDocsError::Transport(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CourtDocsError::Transport(format!("{url}: HTTP {status}")));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if !content_type.contains("pdf") {
            warn!(%content_type, "content type is not PDF, keeping payload anyway");
        }

        let limit = self.config.max_document_bytes;
        if let Some(declared) = response.content_length().filter(|&len| len > limit) {
            return Err(too_large(url, declared, limit));
        }

        let mut bytes = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| CourtDocsError::Transport(format!("{url}: body read failed: {e}")))?
        {
            let received = (bytes.len() + chunk.len()) as u64;
            if received > limit {
                return Err(too_large(url, received, limit));
            }
            bytes.extend_from_slice(&chunk);
        }

        let sha256 = compute_hash(&bytes);
        debug!(bytes = bytes.len(), %sha256, "document downloaded");
        pause(self.config.document_delay).await;

        Ok(RetrievedPayload {
            reference: reference.clone(),
            bytes,
            content_type,
            sha256,
        })
    }

    /// Refuse any request whose host is outside the allow-list.
    fn ensure_allowed(&self, url: &Url) -> Result<()> {
        if self.config.allows(url) {
            Ok(())
        } else {
            warn!(%url, "host outside the allow-list, not fetching");
            Err(CourtDocsError::validation(format!(
                "URL not allowed: {}",
                url.host_str().unwrap_or_default()
            )))
        }
    }
}

fn too_large(url: &Url, size: u64, limit: u64) -> CourtDocsError {
    CourtDocsError::Transport(format!(
        "{url}: payload of {size} bytes exceeds the {limit} byte limit"
    ))
}

/// Politeness delay between sequential requests.
async fn pause(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Compute the hex SHA-256 digest of a payload.
pub fn compute_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
