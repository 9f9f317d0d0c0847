//! Rendering pipeline for Vista.
//!
//! The aggregation core hands this crate structured input (the merged
//! summary and the stitched fragments) and gets final document bytes back.
//! Two templates are involved:
//!
//! - the **summary** template renders the merged summary lines,
//! - the **shell** template wraps the summary and the fragments into a
//!   complete HTML document.
//!
//! Both ship as built-in defaults and can be overridden from files.
//! Documents are optionally minified; [`to_plain_text`] derives the
//! plain-text rendition used by `/text` and the email alternative part.

pub mod config;
pub mod error;
pub mod minify;
pub mod renderer;
pub mod text;

pub use config::RenderConfig;
pub use error::{RenderError, RenderResult};
pub use minify::Minifier;
pub use renderer::{DocumentRenderer, SummarySection, TemplateRenderer};
pub use text::to_plain_text;
