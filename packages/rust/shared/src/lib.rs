//! Shared types, error model, and configuration for courtdocs.
//!
//! This crate is the foundation depended on by all other courtdocs crates.
//! It provides:
//! - [`CourtDocsError`]: the unified error type
//! - Domain types ([`DocumentReference`], [`RetrievedPayload`], [`ExtractedText`], [`ScrapeResult`])
//! - Configuration ([`AppConfig`], [`ScrapeConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, DEFAULT_ALLOWED_HOST, DefaultsConfig, PolitenessConfig, ScrapeConfig,
    SecurityConfig, config_dir, config_file_path, host_allowed, init_config, init_config_at,
    load_config, load_config_from,
};
pub use error::{CourtDocsError, Result};
pub use types::{
    CasePage, DocumentReference, ExtractedText, OutputMode, RetrievedPayload, ScrapeResult,
    UNKNOWN_SIZE,
};
