//! Polite HTTP retrieval of case pages and document payloads.
//!
//! This crate provides:
//! - [`Retriever`]: one pooled HTTP client per run, fixed browser headers,
//!   post-request pauses, content-type sanity checks
//! - [`browser_headers`]: the header set every request carries

pub mod fetch;

pub use fetch::{BROWSER_USER_AGENT, Retriever, browser_headers, compute_hash};
