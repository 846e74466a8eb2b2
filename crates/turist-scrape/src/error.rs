//! Error types for the scrape pipeline.
//!
//! Only run-level failures live here. Field-level misses never become
//! errors; they are carried as [`crate::extract::Miss`] and collapsed into
//! the field's default.

use std::path::PathBuf;

/// Failures that end a unit of work or the whole run.
#[derive(thiserror::Error, Debug)]
pub enum ScrapeError {
    /// The browser session could not be created.
    #[error("Session error: {0}")]
    Session(String),

    /// Navigation failed or timed out. Ends only the current unit.
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// The seed artifact could not be read or parsed.
    #[error("Input error ({}): {reason}", path.display())]
    Input { path: PathBuf, reason: String },

    /// The output artifact could not be written.
    #[error("Sink error ({}): {reason}", path.display())]
    Sink { path: PathBuf, reason: String },

    /// Fetching the listing index failed.
    #[error("Seed crawl error: {0}")]
    Seed(String),
}

/// Convenience result type.
pub type ScrapeResult<T> = Result<T, ScrapeError>;
