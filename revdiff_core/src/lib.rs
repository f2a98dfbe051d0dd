//! Core library for computing and caching revision diffs.
//!
//! The crate is layered around the per-request pipeline:
//! - resolving a loose revision pair into concrete records
//! - gating revision-level visibility for the requester
//! - materialising text and running it through an ordered backend chain
//! - caching the formatted body under a content-addressed key

#![warn(
    clippy::all,
    clippy::cargo,
    clippy::nursery,
    clippy::pedantic,
    missing_docs
)]
#![cfg_attr(
    not(test),
    deny(
        clippy::dbg_macro,
        clippy::expect_used,
        clippy::panic,
        clippy::print_stderr,
        clippy::print_stdout,
        clippy::todo,
        clippy::unwrap_used
    )
)]

/// Shared data models re-exported from `revdiff_api`.
pub mod api;
/// Backend chain with ordered fall-through.
pub mod backends;
/// Content-addressed diff body cache.
pub mod cache;
/// Engine configuration.
pub mod config;
/// Per-request diff pipeline.
pub mod engine;
/// Line-number placeholder localisation.
pub mod localise;
/// Revision record loading and its state machine.
pub mod loader;
/// Tracing subscriber setup for binaries.
pub mod logging;
/// Intervening-edit counting.
pub mod notice;
/// Relative revision resolution.
pub mod resolver;
/// Long-lived handle bundling collaborators.
pub mod session;
/// Collaborator interfaces and the in-memory store.
pub mod store;
/// Revision text loading.
pub mod text;
/// Revision-level visibility rules.
pub mod visibility;

pub use api::*;
pub use engine::{DiffContext, DifferenceEngine};
pub use session::DiffSession;

/// Common result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the core library.
///
/// Missing, hidden or unsupported revisions are not errors; they are reported
/// through [`DiffProblem`] in the response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Revision history storage failed.
    #[error("revision storage failed: {source}")]
    Store {
        /// Error reported by the storage collaborator.
        #[from]
        source: store::StoreError,
    },
    /// Configuration could not be loaded.
    #[error("invalid configuration: {source}")]
    Config {
        /// Underlying configuration error.
        #[from]
        source: config::ConfigError,
    },
    /// The pipeline reached a state its callers promised could not happen.
    #[error("caller contract violated: {0}")]
    ContractViolation(&'static str),
}
