//! Application configuration for courtdocs.
//!
//! User config lives at `~/.courtdocs/courtdocs.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CourtDocsError, Result};
use crate::types::OutputMode;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "courtdocs.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".courtdocs";

/// The only host case pages may be fetched from unless the config says otherwise.
pub const DEFAULT_ALLOWED_HOST: &str = "search.txcourts.gov";

// ---------------------------------------------------------------------------
// Config structs (matching courtdocs.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Request pacing and timeouts.
    #[serde(default)]
    pub politeness: PolitenessConfig,

    /// Host allow-list.
    #[serde(default)]
    pub security: SecurityConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Output root directory. When unset the CLI derives one from the case number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,

    /// Output mode used when no `--separate`/`--merged` flag is given.
    #[serde(default)]
    pub mode: OutputMode,
}

/// `[politeness]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolitenessConfig {
    /// Pause after the case page fetch, in milliseconds.
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Pause after each successful document fetch, in milliseconds.
    #[serde(default = "default_document_delay")]
    pub document_delay_ms: u64,

    /// Timeout for the case page request.
    #[serde(default = "default_page_timeout")]
    pub page_timeout_secs: u64,

    /// Timeout for each document request.
    #[serde(default = "default_document_timeout")]
    pub document_timeout_secs: u64,
}

impl Default for PolitenessConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay(),
            document_delay_ms: default_document_delay(),
            page_timeout_secs: default_page_timeout(),
            document_timeout_secs: default_document_timeout(),
        }
    }
}

fn default_page_delay() -> u64 {
    2000
}
fn default_document_delay() -> u64 {
    1000
}
fn default_page_timeout() -> u64 {
    30
}
fn default_document_timeout() -> u64 {
    60
}

/// `[security]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Hosts a case page URL may point at.
    #[serde(default = "default_allowed_hosts")]
    pub allowed_hosts: Vec<String>,

    /// Largest document payload accepted, in megabytes.
    #[serde(default = "default_max_document_mb")]
    pub max_document_mb: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_hosts: default_allowed_hosts(),
            max_document_mb: default_max_document_mb(),
        }
    }
}

fn default_allowed_hosts() -> Vec<String> {
    vec![DEFAULT_ALLOWED_HOST.to_string()]
}
fn default_max_document_mb() -> u64 {
    50
}

/// Whether `host` is one of `allowed_hosts` (ASCII case-insensitive, exact match).
pub fn host_allowed(allowed_hosts: &[String], host: &str) -> bool {
    allowed_hosts
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(host))
}

// ---------------------------------------------------------------------------
// Scrape config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime scrape configuration.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Pause after the case page fetch.
    pub page_delay: Duration,
    /// Pause after each successful document fetch.
    pub document_delay: Duration,
    /// Timeout for the case page request.
    pub page_timeout: Duration,
    /// Timeout for each document request.
    pub document_timeout: Duration,
    /// Hosts any request (page, document, redirect hop) may go to.
    pub allowed_hosts: Vec<String>,
    /// Largest document payload accepted, in bytes.
    pub max_document_bytes: u64,
}

impl ScrapeConfig {
    /// Whether a request to `url` stays inside the host allow-list.
    pub fn allows(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| host_allowed(&self.allowed_hosts, host))
    }
}

impl From<&AppConfig> for ScrapeConfig {
    fn from(config: &AppConfig) -> Self {
        let p = &config.politeness;
        Self {
            page_delay: Duration::from_millis(p.page_delay_ms),
            document_delay: Duration::from_millis(p.document_delay_ms),
            page_timeout: Duration::from_secs(p.page_timeout_secs),
            document_timeout: Duration::from_secs(p.document_timeout_secs),
            allowed_hosts: config.security.allowed_hosts.clone(),
            max_document_bytes: config.security.max_document_mb.saturating_mul(1024 * 1024),
        }
    }
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.courtdocs/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CourtDocsError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.courtdocs/courtdocs.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CourtDocsError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        CourtDocsError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    init_config_at(&config_file_path()?)
}

/// Write a default config file at `path`, replacing whatever is there.
pub fn init_config_at(path: &Path) -> Result<PathBuf> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| CourtDocsError::io(dir, e))?;
    }

    let path = path.to_path_buf();
    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| CourtDocsError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CourtDocsError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
