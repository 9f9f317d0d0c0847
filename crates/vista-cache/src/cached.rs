use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use vista_types::{Clock, FetchContext, Source, SourceData, SourceResult, SystemClock};

use crate::config::CacheConfig;
use crate::error::CacheResult;
use crate::policy::compute_next_refresh;

/// Cached state for one wrapped source.
#[derive(Debug, Default)]
struct CacheEntry {
    last: Option<SourceData>,
    /// Unset until the first successful fetch; only ever advanced by a
    /// successful fetch.
    next_refresh_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.next_refresh_at {
            None => true,
            Some(at) => now >= at,
        }
    }
}

/// A [`Source`] decorator that caches results of the wrapped source.
///
/// Readers of fresh data share a read lock and never touch upstream. When
/// the entry is stale, the first caller to take the refresh lock performs
/// the upstream call; concurrent callers get the previous result instead of
/// waiting. Only when nothing has been cached yet do they wait for the
/// in-flight fetch.
pub struct CachedSource {
    inner: Arc<dyn Source>,
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    entry: RwLock<CacheEntry>,
    refresh: Mutex<()>,
}

impl CachedSource {
    /// Wrap `inner` using the system clock.
    pub fn new(inner: Arc<dyn Source>, config: CacheConfig) -> CacheResult<Self> {
        Self::with_clock(inner, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        inner: Arc<dyn Source>,
        config: CacheConfig,
        clock: Arc<dyn Clock>,
    ) -> CacheResult<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            config,
            clock,
            entry: RwLock::new(CacheEntry::default()),
            refresh: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// When the cached result goes stale; `None` before the first success.
    pub fn next_refresh_at(&self) -> Option<DateTime<Utc>> {
        self.entry.read().expect("lock poisoned").next_refresh_at
    }

    /// The last successfully fetched result, fresh or not.
    pub fn last(&self) -> Option<SourceData> {
        self.entry.read().expect("lock poisoned").last.clone()
    }

    fn fresh(&self, now: DateTime<Utc>) -> Option<SourceData> {
        let entry = self.entry.read().expect("lock poisoned");
        if entry.is_stale(now) {
            None
        } else {
            entry.last.clone()
        }
    }

    /// Return cached data, refreshing from upstream when stale.
    pub async fn get(&self, ctx: &FetchContext) -> SourceResult<SourceData> {
        if let Some(data) = self.fresh(self.clock.now()) {
            return Ok(data);
        }

        let _guard = match self.refresh.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                if let Some(stale) = self.last() {
                    debug!(source = self.name(), "refresh in flight, serving previous result");
                    return Ok(stale);
                }
                self.refresh.lock().await
            }
        };

        // Someone else may have refreshed while we waited for the lock.
        if let Some(data) = self.fresh(self.clock.now()) {
            return Ok(data);
        }

        debug!(source = self.name(), "refreshing cached source");
        match self.inner.fetch(ctx).await {
            Ok(data) => {
                let fetched_at = self.clock.now();
                let next = compute_next_refresh(
                    fetched_at,
                    self.config.refresh_interval,
                    &self.config.timezone,
                );
                let mut entry = self.entry.write().expect("lock poisoned");
                entry.last = Some(data.clone());
                entry.next_refresh_at = Some(next);
                debug!(source = self.name(), next_refresh_at = %next, "cache updated");
                Ok(data)
            }
            Err(err) => match self.last() {
                Some(stale) => {
                    warn!(
                        source = self.name(),
                        error = %err,
                        "upstream failed, serving stale result"
                    );
                    Ok(stale)
                }
                None => Err(err),
            },
        }
    }
}

#[async_trait]
impl Source for CachedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, ctx: &FetchContext) -> SourceResult<SourceData> {
        self.get(ctx).await
    }
}

impl std::fmt::Debug for CachedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedSource")
            .field("source", &self.inner.name())
            .field("refresh_interval", &self.config.refresh_interval)
            .field("next_refresh_at", &self.next_refresh_at())
            .finish()
    }
}
