use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;
use reqwest::Client;
use tracing::debug;

use vista_cache::{CacheConfig, CachedSource};
use vista_engine::SourceEntry;
use vista_types::{name_to_id, Source};

use crate::command::CommandSource;
use crate::config::{SourceKind, SourceSpec};
use crate::error::{SourceConfigError, SourceConfigResult};
use crate::file::FileSource;
use crate::http::HttpSource;
use crate::static_source::StaticSource;

/// Resolves [`SourceSpec`]s into adapter instances, once, at startup.
#[derive(Clone, Debug)]
pub struct SourceRegistry {
    timezone: Tz,
    client: Client,
}

impl SourceRegistry {
    /// `timezone` decides where "midnight" is for cached sources.
    pub fn new(timezone: Tz) -> SourceConfigResult<Self> {
        let client = Client::builder()
            .user_agent(concat!("vista/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SourceConfigError::HttpClient)?;
        Ok(Self { timezone, client })
    }

    /// Build every source, preserving configured order.
    pub fn build_all(&self, specs: &[SourceSpec]) -> SourceConfigResult<Vec<SourceEntry>> {
        let mut seen = HashSet::new();
        specs
            .iter()
            .map(|spec| {
                if !seen.insert(name_to_id(&spec.name)) {
                    return Err(SourceConfigError::DuplicateName(spec.name.clone()));
                }
                self.build(spec)
            })
            .collect()
    }

    pub fn build(&self, spec: &SourceSpec) -> SourceConfigResult<SourceEntry> {
        let name = spec.name.trim();
        if name.is_empty() {
            return Err(SourceConfigError::EmptyName);
        }
        let invalid = |reason: &str| SourceConfigError::Invalid {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let source: Arc<dyn Source> = match &spec.kind {
            SourceKind::Static(s) => {
                let mut source =
                    StaticSource::new(name, &s.html).with_summary(s.summary.clone());
                if let Some(lite) = &s.simplified_html {
                    source = source.with_simplified(lite);
                }
                Arc::new(source)
            }
            SourceKind::File(f) => {
                let mut source = FileSource::new(name, &f.path);
                if let Some(lite) = &f.simplified_path {
                    source = source.with_simplified(lite);
                }
                Arc::new(source)
            }
            SourceKind::Command(c) => {
                if c.program.trim().is_empty() {
                    return Err(invalid("program must not be empty"));
                }
                let mut source = CommandSource::new(name, &c.program, c.args.clone());
                if let Some(prefix) = &c.summary_prefix {
                    source = source.with_summary_prefix(prefix);
                }
                Arc::new(source)
            }
            SourceKind::Http(h) => {
                if !(h.url.starts_with("http://") || h.url.starts_with("https://")) {
                    return Err(invalid("url must start with http:// or https://"));
                }
                let mut source = HttpSource::new(name, &h.url, self.client.clone())
                    .with_retries(h.max_retries, Duration::from_millis(h.retry_backoff_ms));
                if let Some(header) = &h.summary_header {
                    source = source.with_summary_header(header);
                }
                Arc::new(source)
            }
        };

        let source: Arc<dyn Source> = if spec.cached {
            let config =
                CacheConfig::new(Duration::from_secs(spec.cache_expiry_secs), self.timezone);
            let cached = CachedSource::new(source, config).map_err(|source| {
                SourceConfigError::Cache {
                    name: name.to_string(),
                    source,
                }
            })?;
            Arc::new(cached)
        } else {
            source
        };

        debug!(
            source = %name,
            kind = spec.kind.type_name(),
            cached = spec.cached,
            "source configured"
        );
        let entry = SourceEntry::new(source);
        Ok(if spec.exclude_from_summary {
            entry.excluded_from_summary()
        } else {
            entry
        })
    }
}
