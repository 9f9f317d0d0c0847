use std::path::Path;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use minijinja::{context, Environment, UndefinedBehavior, Value};
use serde::Serialize;
use tracing::debug;

use vista_types::name_to_id;

use crate::config::RenderConfig;
use crate::error::{RenderError, RenderResult};
use crate::minify::Minifier;

const SHELL: &str = "shell.html";
const SUMMARY: &str = "summary.html";

const DEFAULT_SHELL: &str = include_str!("../templates/shell.html");
const DEFAULT_SUMMARY: &str = include_str!("../templates/summary.html");

/// Summary lines contributed by one source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SummarySection {
    pub name: String,
    /// Anchor of the source's fragment, see [`name_to_id`].
    pub id: String,
    pub lines: Vec<String>,
}

impl SummarySection {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        let name = name.into();
        Self {
            id: name_to_id(&name),
            name,
            lines,
        }
    }
}

/// Turns merged aggregation output into final documents.
pub trait DocumentRenderer: Send + Sync {
    /// Render the summary block. Sections arrive in source order.
    fn render_summary(&self, sections: &[SummarySection]) -> RenderResult<String>;

    /// Wrap the rendered summary and the stitched fragments into a complete
    /// document, applying minification if configured.
    fn render_document(
        &self,
        summary_html: &str,
        content: &[u8],
        generated_at: DateTime<Utc>,
    ) -> RenderResult<Vec<u8>>;
}

/// [`DocumentRenderer`] backed by minijinja templates.
///
/// Undefined template variables are errors, so a broken override fails
/// loudly instead of silently rendering an empty section.
pub struct TemplateRenderer {
    env: Environment<'static>,
    title: String,
    timezone: Tz,
    minifier: Minifier,
}

impl TemplateRenderer {
    /// A renderer using the built-in templates.
    pub fn with_defaults(
        title: impl Into<String>,
        timezone: Tz,
        minifier: Minifier,
    ) -> RenderResult<Self> {
        Self::from_sources(
            DEFAULT_SHELL.to_string(),
            DEFAULT_SUMMARY.to_string(),
            title.into(),
            timezone,
            minifier,
        )
    }

    /// Build a renderer from configuration, reading template overrides from
    /// disk.
    pub fn from_config(config: &RenderConfig, timezone: Tz) -> RenderResult<Self> {
        let shell = match &config.shell_template {
            Some(path) => read_template(path)?,
            None => DEFAULT_SHELL.to_string(),
        };
        let summary = match &config.summary_template {
            Some(path) => read_template(path)?,
            None => DEFAULT_SUMMARY.to_string(),
        };
        Self::from_sources(
            shell,
            summary,
            config.title.clone(),
            timezone,
            Minifier::new(config.minify),
        )
    }

    pub fn from_sources(
        shell: String,
        summary: String,
        title: String,
        timezone: Tz,
        minifier: Minifier,
    ) -> RenderResult<Self> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("name_to_id", |name: String| name_to_id(&name));
        env.add_template_owned(SHELL, shell)
            .map_err(|source| RenderError::Template { name: SHELL.into(), source })?;
        env.add_template_owned(SUMMARY, summary)
            .map_err(|source| RenderError::Template { name: SUMMARY.into(), source })?;

        debug!(minify = minifier.is_enabled(), "templates loaded");
        Ok(Self {
            env,
            title,
            timezone,
            minifier,
        })
    }

    fn render(&self, name: &str, ctx: Value) -> RenderResult<String> {
        let template = self
            .env
            .get_template(name)
            .map_err(|source| RenderError::Template { name: name.into(), source })?;
        template
            .render(ctx)
            .map_err(|source| RenderError::Render { name: name.into(), source })
    }
}

impl DocumentRenderer for TemplateRenderer {
    fn render_summary(&self, sections: &[SummarySection]) -> RenderResult<String> {
        let lines: Vec<&str> = sections
            .iter()
            .flat_map(|s| s.lines.iter().map(String::as_str))
            .collect();
        self.render(SUMMARY, context! { sections => sections, lines => lines })
    }

    fn render_document(
        &self,
        summary_html: &str,
        content: &[u8],
        generated_at: DateTime<Utc>,
    ) -> RenderResult<Vec<u8>> {
        let generated_at = generated_at
            .with_timezone(&self.timezone)
            .format("%Y-%m-%d %H:%M %Z")
            .to_string();
        let doc = self.render(
            SHELL,
            context! {
                title => self.title,
                summary => Value::from_safe_string(summary_html.to_string()),
                content => Value::from_safe_string(String::from_utf8_lossy(content).into_owned()),
                generated_at => generated_at,
            },
        )?;
        Ok(self.minifier.minify(doc.into_bytes()))
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer")
            .field("title", &self.title)
            .field("timezone", &self.timezone)
            .field("minifier", &self.minifier)
            .finish()
    }
}

fn read_template(path: &Path) -> RenderResult<String> {
    std::fs::read_to_string(path).map_err(|source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    })
}
