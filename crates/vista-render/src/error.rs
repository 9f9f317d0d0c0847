use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    /// A template failed to parse.
    #[error("template {name} is invalid: {source}")]
    Template {
        name: String,
        source: minijinja::Error,
    },

    /// A template parsed but failed while rendering.
    #[error("failed to render {name}: {source}")]
    Render {
        name: String,
        source: minijinja::Error,
    },

    #[error("cannot read template {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

pub type RenderResult<T> = Result<T, RenderError>;
