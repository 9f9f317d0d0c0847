use async_trait::async_trait;
use bytes::Bytes;

use crate::context::FetchContext;
use crate::error::SourceResult;

/// The output of one source fetch.
///
/// Immutable once produced. Fragments are [`Bytes`] so the cache and the
/// merge step can hand them around without copying.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SourceData {
    /// Short plain-text lines for the summary block, in display order.
    pub summary: Vec<String>,
    /// HTML fragment for the full document.
    pub rendered_default: Bytes,
    /// HTML fragment for the simplified document. Empty means "use the default".
    pub rendered_simplified: Bytes,
}

impl SourceData {
    /// Data consisting of a single default fragment.
    pub fn new(rendered_default: impl Into<Bytes>) -> Self {
        Self {
            summary: Vec::new(),
            rendered_default: rendered_default.into(),
            rendered_simplified: Bytes::new(),
        }
    }

    pub fn with_simplified(mut self, rendered_simplified: impl Into<Bytes>) -> Self {
        self.rendered_simplified = rendered_simplified.into();
        self
    }

    pub fn with_summary<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.summary = lines.into_iter().map(Into::into).collect();
        self
    }

    /// The simplified fragment, falling back to the default one when the
    /// source did not render a simplified variant.
    pub fn simplified_or_default(&self) -> &Bytes {
        if self.rendered_simplified.is_empty() {
            &self.rendered_default
        } else {
            &self.rendered_simplified
        }
    }

    /// Returns `true` if the source produced neither fragments nor summary.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.rendered_default.is_empty()
            && self.rendered_simplified.is_empty()
    }
}

/// A dashboard data source.
///
/// Implementations normalize one upstream system into a [`SourceData`].
/// They must honor the deadline and cancellation carried by the
/// [`FetchContext`] and report malformed upstream data as an error instead
/// of panicking.
#[async_trait]
pub trait Source: Send + Sync {
    /// Stable display name, also used for logging and cache naming.
    fn name(&self) -> &str;

    /// Fetch and render the current data.
    async fn fetch(&self, ctx: &FetchContext) -> SourceResult<SourceData>;
}

/// Turn a display name into an HTML id: lowercase, spaces become dashes.
pub fn name_to_id(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "-")
}
