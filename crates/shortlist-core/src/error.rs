//! Error types for shortlist

use thiserror::Error;

/// Result type alias using ShortlistError
pub type Result<T> = std::result::Result<T, ShortlistError>;

/// Error type alias for convenience
pub type Error = ShortlistError;

/// Main error type for shortlist
#[derive(Debug, Error)]
pub enum ShortlistError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Upstream payload failed validation: {0}")]
    Schema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Request deadline exceeded")]
    DeadlineExceeded,

    #[error("External service error: {0}")]
    ExternalError(String),

    #[error("Internal invariant violation: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ShortlistError {
    /// Whether this error means the run was aborted rather than failed
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled(_) | Self::DeadlineExceeded)
    }

    /// Whether a degraded fallback is allowed for this error class
    ///
    /// Transient upstream and schema failures degrade locally in the stages
    /// that have deterministic fallbacks; everything else propagates.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Llm(_) | Self::Schema(_) | Self::ExternalError(_)
        )
    }
}
