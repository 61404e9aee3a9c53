//! Invocation boundary.
//!
//! Every external caller (CLI, web request body, serverless event) is turned into
//! one [`Invocation`] and converted exactly once into a validated [`ScrapeRequest`].
//! The host allow-list check runs here, before any network access.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument, warn};
use url::Url;
use uuid::Uuid;

use courtdocs_shared::{
    CourtDocsError, OutputMode, Result, ScrapeConfig, ScrapeResult, host_allowed,
};

use crate::pipeline::{ScrapeCaseConfig, SilentProgress, scrape_case};

/// File name suggested for the merged text in responses.
pub const MERGED_RESPONSE_FILENAME: &str = "merged_court_documents.txt";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// A validated scrape request. Only built through [`Invocation::into_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub url: Url,
    pub mode: OutputMode,
}

/// One external invocation, in the shape its host delivered it.
#[derive(Debug, Clone)]
pub enum Invocation {
    /// Command-line flags.
    Command { url: String, merged: bool },
    /// A web request body: `{"url": "...", "merge_texts": false}`.
    JsonBody(Vec<u8>),
    /// A serverless HTTP event with `httpMethod` (or `requestContext.http.method`) and `body`.
    LambdaEvent(Value),
}

/// Body shape shared by the web and serverless conventions.
#[derive(Debug, Default, Deserialize)]
struct RequestBody {
    #[serde(default)]
    url: String,
    #[serde(default)]
    merge_texts: bool,
}

impl Invocation {
    /// Convert into a validated request.
    pub fn into_request(self, allowed_hosts: &[String]) -> Result<ScrapeRequest> {
        let (url, merged) = match self {
            Self::Command { url, merged } => (url, merged),
            Self::JsonBody(bytes) => {
                let body = parse_body(&bytes)?;
                (body.url, body.merge_texts)
            }
            Self::LambdaEvent(event) => {
                let body = lambda_body(&event)?;
                (body.url, body.merge_texts)
            }
        };

        Ok(ScrapeRequest {
            url: validate_url(&url, allowed_hosts)?,
            mode: OutputMode::from_merge_flag(merged),
        })
    }
}

fn parse_body(bytes: &[u8]) -> Result<RequestBody> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(RequestBody::default());
    }
    serde_json::from_slice(bytes)
        .map_err(|e| CourtDocsError::validation(format!("Invalid request body: {e}")))
}

fn lambda_body(event: &Value) -> Result<RequestBody> {
    let method = event
        .get("httpMethod")
        .or_else(|| event.pointer("/requestContext/http/method"))
        .and_then(Value::as_str)
        .unwrap_or("GET");

    if !method.eq_ignore_ascii_case("POST") {
        return Err(CourtDocsError::validation("Method not allowed"));
    }

    match event.get("body") {
        Some(Value::String(body)) => parse_body(body.as_bytes()),
        Some(Value::Object(_)) => serde_json::from_value(event["body"].clone())
            .map_err(|e| CourtDocsError::validation(format!("Invalid request body: {e}"))),
        _ => Ok(RequestBody::default()),
    }
}

/// Check a raw URL against the scheme rule and the host allow-list.
pub fn validate_url(raw: &str, allowed_hosts: &[String]) -> Result<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CourtDocsError::validation("URL is required"));
    }

    let url = Url::parse(raw).map_err(|_| CourtDocsError::validation("Invalid URL format"))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(CourtDocsError::validation("Invalid URL scheme"));
    }

    let host = url.host_str().unwrap_or_default();
    if !host_allowed(allowed_hosts, host) {
        return Err(CourtDocsError::validation(
            "URL not allowed. Only Texas court websites are supported.",
        ));
    }

    Ok(url)
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// One separate-mode document in a response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentText {
    pub id: usize,
    pub filename: String,
    pub content: String,
}

/// Transport-independent result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScrapeResponse {
    Merged {
        success: bool,
        format: OutputMode,
        pdf_count: usize,
        processed_count: usize,
        merged_content: String,
        filename: String,
    },
    Separate {
        success: bool,
        format: OutputMode,
        pdf_count: usize,
        processed_count: usize,
        documents: Vec<DocumentText>,
    },
    /// The run finished without producing text.
    NothingProduced {
        success: bool,
        message: String,
        pdf_count: usize,
    },
    /// The run was rejected or aborted.
    Failed {
        success: bool,
        error: String,
        #[serde(skip)]
        client_error: bool,
    },
}

impl ScrapeResponse {
    fn failed(err: &CourtDocsError) -> Self {
        let error = match err {
            CourtDocsError::Validation { message } => message.clone(),
            other => other.to_string(),
        };
        Self::Failed {
            success: false,
            error,
            client_error: err.is_validation(),
        }
    }

    fn nothing_produced(message: &str, pdf_count: usize) -> Self {
        Self::NothingProduced {
            success: false,
            message: message.to_string(),
            pdf_count,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Merged { .. } | Self::Separate { .. })
    }

    /// True when the caller's input was rejected (maps to a 4xx status in HTTP hosts).
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Failed { client_error: true, .. })
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Validate, run the pipeline in a throwaway directory, and shape the response.
#[instrument(skip_all)]
pub async fn handle(invocation: Invocation, config: &ScrapeConfig) -> ScrapeResponse {
    let request = match invocation.into_request(&config.allowed_hosts) {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "invocation rejected");
            return ScrapeResponse::failed(&e);
        }
    };

    let run_dir = std::env::temp_dir().join(format!("courtdocs-run-{}", Uuid::now_v7()));
    info!(url = %request.url, mode = %request.mode, run_dir = %run_dir.display(), "handling scrape");

    let run_config = ScrapeCaseConfig {
        url: request.url,
        output_root: run_dir.clone(),
        mode: request.mode,
        scrape: config.clone(),
    };

    let response = match scrape_case(&run_config, &SilentProgress).await {
        Ok(result) => build_response(&result).unwrap_or_else(|e| ScrapeResponse::failed(&e)),
        Err(e) => ScrapeResponse::failed(&e),
    };

    if run_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&run_dir) {
            warn!(run_dir = %run_dir.display(), error = %e, "could not remove run directory");
        }
    }

    response
}

/// Read the run's artifacts back into a response.
fn build_response(result: &ScrapeResult) -> Result<ScrapeResponse> {
    let pdf_count = result.downloaded.len();

    if pdf_count == 0 {
        return Ok(ScrapeResponse::nothing_produced(
            "No PDF documents found on the page",
            0,
        ));
    }
    if result.nothing_produced() {
        return Ok(ScrapeResponse::nothing_produced(
            "No documents were successfully processed",
            pdf_count,
        ));
    }

    match (result.mode, &result.merged_artifact) {
        (OutputMode::Merged, Some(path)) => Ok(ScrapeResponse::Merged {
            success: true,
            format: OutputMode::Merged,
            pdf_count,
            processed_count: result.documents_extracted,
            merged_content: read_text(path)?,
            filename: MERGED_RESPONSE_FILENAME.to_string(),
        }),
        _ => {
            let documents = result
                .produced_artifacts
                .iter()
                .enumerate()
                .map(|(i, path)| {
                    Ok(DocumentText {
                        id: i + 1,
                        filename: path
                            .file_name()
                            .map(|n| n.to_string_lossy().into_owned())
                            .unwrap_or_default(),
                        content: read_text(path)?,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            Ok(ScrapeResponse::Separate {
                success: true,
                format: OutputMode::Separate,
                pdf_count,
                processed_count: documents.len(),
                documents,
            })
        }
    }
}

fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| CourtDocsError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fast_config, pdf_with_pages};
    use courtdocs_shared::DEFAULT_ALLOWED_HOST;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn allow_list() -> Vec<String> {
        vec![DEFAULT_ALLOWED_HOST.to_string()]
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = validate_url("ftp://search.txcourts.gov/x", &allow_list()).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("Invalid URL scheme"));
    }

    #[test]
    fn rejects_host_outside_allow_list() {
        let err = validate_url("https://evil.example.com/x", &allow_list()).unwrap_err();
        assert!(err.to_string().contains("URL not allowed"));

        // Suffix tricks do not pass either.
        assert!(validate_url("https://search.txcourts.gov.evil.com/x", &allow_list()).is_err());
    }

    #[test]
    fn accepts_allowed_case_url() {
        let url = validate_url("https://search.txcourts.gov/x?cn=1", &allow_list()).unwrap();
        assert_eq!(url.host_str(), Some("search.txcourts.gov"));
    }

    #[test]
    fn rejects_empty_and_malformed_urls() {
        let err = validate_url("   ", &allow_list()).unwrap_err();
        assert!(err.to_string().contains("URL is required"));

        let err = validate_url("not a url", &allow_list()).unwrap_err();
        assert!(err.to_string().contains("Invalid URL format"));
    }

    #[test]
    fn command_invocation_maps_mode() {
        let request = Invocation::Command {
            url: "https://search.txcourts.gov/Case.aspx?cn=1".into(),
            merged: true,
        }
        .into_request(&allow_list())
        .unwrap();
        assert_eq!(request.mode, OutputMode::Merged);
    }

    #[test]
    fn json_body_invocation() {
        let body = br#"{"url": " https://search.txcourts.gov/Case.aspx?cn=2 ", "merge_texts": false}"#;
        let request = Invocation::JsonBody(body.to_vec())
            .into_request(&allow_list())
            .unwrap();
        assert_eq!(request.mode, OutputMode::Separate);
        assert_eq!(request.url.query(), Some("cn=2"));

        let err = Invocation::JsonBody(b"{}".to_vec())
            .into_request(&allow_list())
            .unwrap_err();
        assert!(err.to_string().contains("URL is required"));

        let err = Invocation::JsonBody(b"{not json".to_vec())
            .into_request(&allow_list())
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn lambda_event_invocation() {
        let event = json!({
            "requestContext": { "http": { "method": "POST" } },
            "body": "{\"url\": \"https://search.txcourts.gov/Case.aspx?cn=3\", \"merge_texts\": true}"
        });
        let request = Invocation::LambdaEvent(event)
            .into_request(&allow_list())
            .unwrap();
        assert_eq!(request.mode, OutputMode::Merged);

        let get = json!({ "httpMethod": "GET", "body": "" });
        let err = Invocation::LambdaEvent(get)
            .into_request(&allow_list())
            .unwrap_err();
        assert!(err.to_string().contains("Method not allowed"));
    }

    #[tokio::test]
    async fn handle_rejects_before_network_access() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        // The mock server host is not allow-listed.
        let court_only = ScrapeConfig {
            allowed_hosts: allow_list(),
            ..fast_config()
        };
        let response = handle(
            Invocation::Command {
                url: format!("{}/Case.aspx?cn=1", server.uri()),
                merged: false,
            },
            &court_only,
        )
        .await;

        assert!(response.is_client_error());
        assert_eq!(
            response.to_json(),
            json!({
                "success": false,
                "error": "URL not allowed. Only Texas court websites are supported."
            })
        );
    }

    async fn serve_case(server: &MockServer, html: &str) {
        Mock::given(method("GET"))
            .and(path("/Case.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn handle_merged_response() {
        let server = MockServer::start().await;
        serve_case(
            &server,
            r#"<a href="/SearchMedia.aspx?MediaVersionID=a">Brief PDF/5 KB</a>"#,
        )
        .await;
        Mock::given(method("GET"))
            .and(path("/SearchMedia.aspx"))
            .and(query_param("MediaVersionID", "a"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(pdf_with_pages(&["Brief body"])),
            )
            .mount(&server)
            .await;

        let body = format!(r#"{{"url": "{}/Case.aspx?cn=7", "merge_texts": true}}"#, server.uri());
        let response = handle(Invocation::JsonBody(body.into_bytes()), &fast_config()).await;

        match &response {
            ScrapeResponse::Merged {
                pdf_count,
                processed_count,
                merged_content,
                filename,
                ..
            } => {
                assert_eq!(*pdf_count, 1);
                assert_eq!(*processed_count, 1);
                assert!(merged_content.starts_with("<document id=1>\n"));
                assert!(merged_content.contains("Brief body"));
                assert_eq!(filename, MERGED_RESPONSE_FILENAME);
            }
            other => panic!("expected merged response, got {other:?}"),
        }

        let json = response.to_json();
        assert_eq!(json["success"], true);
        assert_eq!(json["format"], "merged");
    }

    #[tokio::test]
    async fn handle_separate_response() {
        let server = MockServer::start().await;
        serve_case(
            &server,
            r#"<a href="/SearchMedia.aspx?MediaVersionID=a">Motion PDF/5 KB</a>
               <a href="/SearchMedia.aspx?MediaVersionID=b">Order PDF/6 KB</a>"#,
        )
        .await;
        for (id, text) in [("a", "Motion body"), ("b", "Order body")] {
            Mock::given(method("GET"))
                .and(path("/SearchMedia.aspx"))
                .and(query_param("MediaVersionID", id))
                .respond_with(
                    ResponseTemplate::new(200)
                        .insert_header("content-type", "application/pdf")
                        .set_body_bytes(pdf_with_pages(&[text])),
                )
                .mount(&server)
                .await;
        }

        let response = handle(
            Invocation::Command {
                url: format!("{}/Case.aspx?cn=8", server.uri()),
                merged: false,
            },
            &fast_config(),
        )
        .await;

        match response {
            ScrapeResponse::Separate {
                pdf_count,
                documents,
                ..
            } => {
                assert_eq!(pdf_count, 2);
                assert_eq!(documents.len(), 2);
                assert_eq!(documents[0].id, 1);
                assert_eq!(documents[0].filename, "document_1_5KB.txt");
                assert!(documents[1].content.contains("Order body"));
            }
            other => panic!("expected separate response, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn handle_reports_empty_page_as_unsuccessful() {
        let server = MockServer::start().await;
        serve_case(&server, "<html><body>No documents</body></html>").await;

        let response = handle(
            Invocation::Command {
                url: format!("{}/Case.aspx?cn=9", server.uri()),
                merged: true,
            },
            &fast_config(),
        )
        .await;

        assert!(!response.is_success());
        assert!(!response.is_client_error());
        assert_eq!(
            response.to_json(),
            json!({
                "success": false,
                "message": "No PDF documents found on the page",
                "pdf_count": 0
            })
        );
    }

    #[tokio::test]
    async fn handle_reports_page_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let response = handle(
            Invocation::Command {
                url: format!("{}/Case.aspx?cn=10", server.uri()),
                merged: false,
            },
            &fast_config(),
        )
        .await;

        assert!(!response.is_success());
        assert!(!response.is_client_error());
        assert!(response.to_json()["error"].as_str().unwrap().contains("502"));
    }

    #[tokio::test]
    async fn handle_does_not_follow_redirects_off_the_allow_list() {
        let allowed = MockServer::start().await;
        let elsewhere = MockServer::start().await;

        let target = format!("http://localhost:{}/admin", elsewhere.address().port());
        Mock::given(method("GET"))
            .and(path("/Case.aspx"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", target.as_str()))
            .mount(&allowed)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
            .expect(0)
            .mount(&elsewhere)
            .await;

        let response = handle(
            Invocation::Command {
                url: format!("{}/Case.aspx?cn=11", allowed.uri()),
                merged: true,
            },
            &fast_config(),
        )
        .await;

        assert!(!response.is_success());
        assert!(elsewhere.received_requests().await.unwrap().is_empty());
    }
}
