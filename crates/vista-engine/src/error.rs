use thiserror::Error;

use vista_render::RenderError;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The aggregator was built without any sources.
    #[error("no sources configured")]
    NoSources,

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// Rendering failed; the cycle produced no artifact.
    #[error("render failed: {0}")]
    Render(#[from] RenderError),
}

pub type EngineResult<T> = Result<T, EngineError>;
