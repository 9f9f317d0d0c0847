use thiserror::Error;

/// Errors a source fetch can produce.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The upstream system answered with an error or could not be reached.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The upstream answered, but the payload could not be interpreted.
    #[error("malformed upstream data: {0}")]
    Malformed(String),

    /// The fetch did not finish before the cycle deadline.
    #[error("deadline exceeded")]
    Timeout,

    /// The fetch was cancelled by its caller.
    #[error("fetch cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SourceError {
    /// Returns `true` for failures caused by the deadline or cancellation
    /// rather than by the upstream itself.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
