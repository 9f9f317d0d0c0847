use bytes::Bytes;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The composite output of one successful refresh cycle.
///
/// Never mutated after construction; the snapshot store replaces it
/// wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub cycle_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Merged summary lines in source order.
    pub summary: Vec<String>,
    /// Names of sources whose slot stayed empty this cycle.
    pub failed_sources: Vec<String>,
    /// BLAKE3 hex digest of `rendered_default`.
    pub etag: String,
    pub rendered_default: Bytes,
    pub rendered_simplified: Bytes,
}

impl Artifact {
    pub fn new(
        cycle_id: Uuid,
        generated_at: DateTime<Utc>,
        rendered_default: impl Into<Bytes>,
        rendered_simplified: impl Into<Bytes>,
    ) -> Self {
        let rendered_default = rendered_default.into();
        let etag = blake3::hash(&rendered_default).to_hex().to_string();
        Self {
            cycle_id,
            generated_at,
            summary: Vec::new(),
            failed_sources: Vec::new(),
            etag,
            rendered_default,
            rendered_simplified: rendered_simplified.into(),
        }
    }

    pub fn with_summary(mut self, summary: Vec<String>) -> Self {
        self.summary = summary;
        self
    }

    pub fn with_failed_sources(mut self, failed: Vec<String>) -> Self {
        self.failed_sources = failed;
        self
    }

    /// The simplified document, or the default one if it is empty.
    pub fn simplified_or_default(&self) -> &Bytes {
        if self.rendered_simplified.is_empty() {
            &self.rendered_default
        } else {
            &self.rendered_simplified
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_sources.is_empty()
    }
}
