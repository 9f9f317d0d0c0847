use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Rendering options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Document title.
    pub title: String,
    /// Minify the final documents.
    pub minify: bool,
    /// Replaces the built-in document shell template.
    pub shell_template: Option<PathBuf>,
    /// Replaces the built-in summary template.
    pub summary_template: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            title: "Vista".into(),
            minify: true,
            shell_template: None,
            summary_template: None,
        }
    }
}
