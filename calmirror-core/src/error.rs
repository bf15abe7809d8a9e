//! Error types for the calmirror sync engine.

use thiserror::Error;

/// Errors that can occur during a sync run.
///
/// Everything except [`CalMirrorError::Mutation`] aborts the run before any
/// change is applied to the destination calendar.
#[derive(Error, Debug)]
pub enum CalMirrorError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch feed: {0}")]
    FeedFetch(String),

    #[error("Feed parse error: {0}")]
    FeedParse(String),

    #[error("Destination query failed: {0}")]
    DestinationQuery(String),

    #[error("Mutation failed: {0}")]
    Mutation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CalMirrorError {
    /// Whether this error halts the whole run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, CalMirrorError::Mutation(_))
    }
}

/// Result type alias for calmirror operations.
pub type CalMirrorResult<T> = Result<T, CalMirrorError>;
