//! Core pipeline orchestration for courtdocs.
//!
//! Ties together discovery, retrieval, and text extraction into the end-to-end
//! [`pipeline::scrape_case`] run, and exposes the [`invocation`] boundary that
//! turns CLI flags or request bodies into a validated run.

pub mod assembler;
pub mod invocation;
pub mod pipeline;

#[cfg(test)]
mod test_support;
