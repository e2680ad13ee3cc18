//! Error types for the embedding service.

use thiserror::Error;

/// Main error type for all embedding operations.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// A required query parameter was absent or empty.
    #[error("{0}")]
    MissingParameter(String),

    /// The query string could not be parsed.
    #[error("Invalid query string: {0}")]
    InvalidQuery(String),

    /// The cover image could not be fetched or decoded.
    #[error("Invalid or inaccessible image URL")]
    ImageFetchFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The audio could not be fetched from upstream.
    #[error("Failed to fetch data from the provided URL")]
    UpstreamFetchFailed(#[source] reqwest::Error),

    /// Writing tags failed and the tagging policy does not tolerate it.
    #[error("Failed to write metadata: {0}")]
    TaggingFailed(String),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Anything else.
    #[error("{0}")]
    Unexpected(String),
}

impl EmbedError {
    /// HTTP status code this error is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            EmbedError::MissingParameter(_)
            | EmbedError::InvalidQuery(_)
            | EmbedError::ImageFetchFailed(_) => 400,
            EmbedError::UpstreamFetchFailed(_)
            | EmbedError::TaggingFailed(_)
            | EmbedError::Io(_)
            | EmbedError::Unexpected(_) => 500,
        }
    }

    pub(crate) fn image<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        EmbedError::ImageFetchFailed(err.into())
    }
}

/// Result type alias for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;
