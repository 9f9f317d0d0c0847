use thiserror::Error;

use vista_cache::CacheError;

#[derive(Debug, Error)]
pub enum SourceConfigError {
    #[error("source name must not be empty")]
    EmptyName,

    /// Names double as fragment anchors and log keys.
    #[error("duplicate source name: {0}")]
    DuplicateName(String),

    #[error("source {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("source {name}: {source}")]
    Cache { name: String, source: CacheError },

    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub type SourceConfigResult<T> = Result<T, SourceConfigError>;
