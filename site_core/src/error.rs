//! Error types for the site shell core.
//!
//! None of these escape to the page: the loader and the consent controller
//! log them and fall back to a safe state.

use page_model::ElementId;
use thiserror::Error;

/// Why a fragment could not be retrieved.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid fragment url for {path}: {source}")]
    InvalidUrl {
        path: String,
        #[source]
        source: url::ParseError,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("fragment unavailable: {0}")]
    Unavailable(String),
}

/// Why a single fragment was skipped.
#[derive(Debug, Error)]
pub enum FragmentError {
    #[error("failed to fetch {path}: {source}")]
    Fetch {
        path: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to load {path}: status {status}")]
    Status { path: String, status: u16 },

    #[error("container #{container} for {path} not found")]
    MissingContainer { path: String, container: ElementId },
}

/// Consent persistence failures.
#[derive(Debug, Error)]
pub enum ConsentError {
    #[error("stored consent decision is malformed: {0}")]
    MalformedStoredDecision(#[source] serde_json::Error),

    #[error("failed to serialize consent decision: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("consent retention of {days} days cannot be stored")]
    InvalidRetention { days: i64 },
}
