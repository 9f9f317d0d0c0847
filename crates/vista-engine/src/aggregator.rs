use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vista_render::{DocumentRenderer, SummarySection};
use vista_types::{Clock, FetchContext, Source, SourceData, SourceError, SystemClock};

use crate::artifact::Artifact;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::snapshot::SnapshotStore;

/// A configured source together with its placement options.
#[derive(Clone)]
pub struct SourceEntry {
    pub source: Arc<dyn Source>,
    /// Whether the source's summary lines reach the summary block.
    pub in_summary: bool,
}

impl SourceEntry {
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            in_summary: true,
        }
    }

    pub fn excluded_from_summary(mut self) -> Self {
        self.in_summary = false;
        self
    }

    pub fn name(&self) -> &str {
        self.source.name()
    }
}

impl From<Arc<dyn Source>> for SourceEntry {
    fn from(source: Arc<dyn Source>) -> Self {
        Self::new(source)
    }
}

impl std::fmt::Debug for SourceEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceEntry")
            .field("name", &self.name())
            .field("in_summary", &self.in_summary)
            .finish()
    }
}

/// Per-source output stitched together in configured order, not yet
/// rendered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Merged {
    pub rendered_default: Bytes,
    pub rendered_simplified: Bytes,
    pub sections: Vec<SummarySection>,
}

impl Merged {
    /// All summary lines, source order first, then each source's own order.
    pub fn summary_lines(&self) -> Vec<String> {
        self.sections
            .iter()
            .flat_map(|s| s.lines.iter().cloned())
            .collect()
    }
}

/// Stitch the filled slots together in the order of `entries`.
///
/// `slots[i]` belongs to `entries[i]`; empty slots are skipped. The result
/// depends only on slot contents, never on the order fetches completed in.
pub fn merge(entries: &[SourceEntry], slots: &[Option<SourceData>]) -> Merged {
    let mut default = BytesMut::new();
    let mut simplified = BytesMut::new();
    let mut sections = Vec::new();

    for (entry, slot) in entries.iter().zip(slots) {
        let Some(data) = slot else { continue };
        default.extend_from_slice(&data.rendered_default);
        simplified.extend_from_slice(data.simplified_or_default());
        if entry.in_summary && !data.summary.is_empty() {
            sections.push(SummarySection::new(entry.name(), data.summary.clone()));
        }
    }

    Merged {
        rendered_default: default.freeze(),
        rendered_simplified: simplified.freeze(),
        sections,
    }
}

/// Outcome of one refresh cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub succeeded: usize,
    /// Sources whose slot stayed empty, in configured order.
    pub failed: Vec<String>,
    pub elapsed: Duration,
}

/// The fan-out/fan-in core.
///
/// Each cycle queries every source concurrently (at most
/// `max_concurrency` at a time) under one shared deadline. A source that
/// fails or misses the deadline leaves its slot empty and the cycle goes
/// on with the rest.
pub struct Aggregator {
    sources: Vec<SourceEntry>,
    renderer: Arc<dyn DocumentRenderer>,
    config: EngineConfig,
    clock: Arc<dyn Clock>,
}

impl Aggregator {
    pub fn new(
        sources: Vec<SourceEntry>,
        renderer: Arc<dyn DocumentRenderer>,
        config: EngineConfig,
    ) -> EngineResult<Self> {
        if sources.is_empty() {
            return Err(EngineError::NoSources);
        }
        config.validate()?;
        Ok(Self {
            sources,
            renderer,
            config,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replace the clock used to stamp artifacts.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn sources(&self) -> &[SourceEntry] {
        &self.sources
    }

    /// Fetch every source under `ctx`, returning one slot per source in
    /// configured order.
    pub async fn fetch_all(&self, ctx: &FetchContext) -> Vec<Option<SourceData>> {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();

        for (index, entry) in self.sources.iter().enumerate() {
            let source = Arc::clone(&entry.source);
            let permits = Arc::clone(&permits);
            let ctx = ctx.clone();
            tasks.spawn(async move {
                let started = Instant::now();
                let result = ctx
                    .run(async {
                        let _permit = permits
                            .acquire()
                            .await
                            .map_err(|_| SourceError::Cancelled)?;
                        source.fetch(&ctx).await
                    })
                    .await;
                (index, result, started.elapsed())
            });
        }

        let mut slots: Vec<Option<SourceData>> = vec![None; self.sources.len()];
        let deadline = ctx.deadline();
        loop {
            tokio::select! {
                biased;
                joined = tasks.join_next() => match joined {
                    None => break,
                    Some(Ok((index, result, elapsed))) => {
                        let name = self.sources[index].name();
                        let elapsed_ms = elapsed.as_millis() as u64;
                        match result {
                            Ok(data) => {
                                debug!(
                                    source = %name,
                                    elapsed_ms,
                                    lines = data.summary.len(),
                                    "source fetched"
                                );
                                slots[index] = Some(data);
                            }
                            Err(err) => {
                                warn!(source = %name, elapsed_ms, error = %err, "source failed");
                            }
                        }
                    }
                    Some(Err(err)) => error!(error = %err, "source task did not complete"),
                },
                _ = tokio::time::sleep_until(deadline) => {
                    warn!(
                        pending = tasks.len(),
                        "cycle deadline reached, abandoning remaining sources"
                    );
                    tasks.abort_all();
                    break;
                }
            }
        }
        slots
    }

    /// Run one full cycle: fetch, merge, render.
    ///
    /// Fails only when rendering fails; individual source failures are
    /// recorded in the artifact and the report.
    pub async fn run_cycle(&self, ctx: &FetchContext) -> EngineResult<(Artifact, CycleReport)> {
        let cycle_id = Uuid::now_v7();
        let started = Instant::now();
        debug!(%cycle_id, sources = self.sources.len(), "refresh cycle started");

        let slots = self.fetch_all(ctx).await;
        let failed: Vec<String> = self
            .sources
            .iter()
            .zip(&slots)
            .filter(|(_, slot)| slot.is_none())
            .map(|(entry, _)| entry.name().to_string())
            .collect();

        let merged = merge(&self.sources, &slots);
        let artifact = self.render(cycle_id, self.clock.now(), &merged)?;
        let artifact = artifact
            .with_summary(merged.summary_lines())
            .with_failed_sources(failed.clone());

        let report = CycleReport {
            cycle_id,
            succeeded: slots.len() - failed.len(),
            failed,
            elapsed: started.elapsed(),
        };
        info!(
            %cycle_id,
            succeeded = report.succeeded,
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "refresh cycle finished"
        );
        Ok((artifact, report))
    }

    /// Run a cycle bounded by the configured timeout and publish the result.
    ///
    /// On render failure the store keeps its previous artifact.
    pub async fn refresh(
        &self,
        store: &SnapshotStore,
        shutdown: &CancellationToken,
    ) -> EngineResult<CycleReport> {
        let ctx = FetchContext::child_of(shutdown, self.config.cycle_timeout);
        match self.run_cycle(&ctx).await {
            Ok((artifact, report)) => {
                store.swap(artifact);
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, "cycle produced no artifact, keeping previous snapshot");
                Err(err)
            }
        }
    }

    fn render(
        &self,
        cycle_id: Uuid,
        generated_at: DateTime<Utc>,
        merged: &Merged,
    ) -> EngineResult<Artifact> {
        let summary = self.renderer.render_summary(&merged.sections)?;
        let default = self
            .renderer
            .render_document(&summary, &merged.rendered_default, generated_at)?;
        let simplified = self
            .renderer
            .render_document(&summary, &merged.rendered_simplified, generated_at)?;
        Ok(Artifact::new(cycle_id, generated_at, default, simplified))
    }
}

impl std::fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aggregator")
            .field("sources", &self.sources)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use vista_render::{Minifier, RenderError, RenderResult, TemplateRenderer};
    use vista_types::{ManualClock, SourceResult};

    struct FakeSource {
        name: String,
        delay: Duration,
        outcome: Result<SourceData, String>,
    }

    #[async_trait]
    impl Source for FakeSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self, _ctx: &FetchContext) -> SourceResult<SourceData> {
            tokio::time::sleep(self.delay).await;
            self.outcome.clone().map_err(SourceError::Upstream)
        }
    }

    fn ok(name: &str, delay_ms: u64, lines: &[&str]) -> SourceEntry {
        let data = SourceData::new(format!("<{name}>")).with_summary(lines.iter().copied());
        SourceEntry::new(Arc::new(FakeSource {
            name: name.into(),
            delay: Duration::from_millis(delay_ms),
            outcome: Ok(data),
        }))
    }

    fn failing(name: &str, delay_ms: u64) -> SourceEntry {
        SourceEntry::new(Arc::new(FakeSource {
            name: name.into(),
            delay: Duration::from_millis(delay_ms),
            outcome: Err("503 from upstream".into()),
        }))
    }

    /// Renders `[summary lines joined by ';']content`.
    struct EchoRenderer;

    impl DocumentRenderer for EchoRenderer {
        fn render_summary(&self, sections: &[SummarySection]) -> RenderResult<String> {
            let lines: Vec<&str> = sections
                .iter()
                .flat_map(|s| s.lines.iter().map(String::as_str))
                .collect();
            Ok(lines.join(";"))
        }

        fn render_document(
            &self,
            summary: &str,
            content: &[u8],
            _generated_at: DateTime<Utc>,
        ) -> RenderResult<Vec<u8>> {
            let mut out = format!("[{summary}]").into_bytes();
            out.extend_from_slice(content);
            Ok(out)
        }
    }

    struct BrokenRenderer;

    impl DocumentRenderer for BrokenRenderer {
        fn render_summary(&self, _sections: &[SummarySection]) -> RenderResult<String> {
            Err(RenderError::Io {
                path: "summary.html".into(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            })
        }

        fn render_document(
            &self,
            _summary: &str,
            _content: &[u8],
            _generated_at: DateTime<Utc>,
        ) -> RenderResult<Vec<u8>> {
            unreachable!("summary fails first")
        }
    }

    fn aggregator(sources: Vec<SourceEntry>, timeout_secs: u64) -> Aggregator {
        let config = EngineConfig {
            cycle_timeout: Duration::from_secs(timeout_secs),
            ..EngineConfig::default()
        };
        Aggregator::new(sources, Arc::new(EchoRenderer), config).unwrap()
    }

    fn text(bytes: &Bytes) -> &str {
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn zero_sources_is_rejected() {
        let res = Aggregator::new(vec![], Arc::new(EchoRenderer), EngineConfig::default());
        assert!(matches!(res, Err(EngineError::NoSources)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            max_concurrency: 0,
            ..EngineConfig::default()
        };
        let res = Aggregator::new(vec![ok("A", 0, &[])], Arc::new(EchoRenderer), config);
        assert!(matches!(res, Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn merge_skips_empty_slots_and_falls_back_to_default() {
        let entries = vec![ok("A", 0, &[]), ok("B", 0, &[]), ok("C", 0, &[])];
        let slots = vec![
            Some(SourceData::new("<a>").with_simplified("<a-lite>")),
            None,
            Some(SourceData::new("<c>")),
        ];
        let merged = merge(&entries, &slots);
        assert_eq!(text(&merged.rendered_default), "<a><c>");
        assert_eq!(text(&merged.rendered_simplified), "<a-lite><c>");
        assert!(merged.sections.is_empty());
    }

    #[test]
    fn merge_honors_summary_exclusion() {
        let entries = vec![ok("A", 0, &[]), ok("B", 0, &[]).excluded_from_summary()];
        let slots = vec![
            Some(SourceData::new("").with_summary(["a1"])),
            Some(SourceData::new("").with_summary(["b1"])),
        ];
        let merged = merge(&entries, &slots);
        assert_eq!(merged.summary_lines(), vec!["a1".to_string()]);
        assert_eq!(merged.sections[0].id, "a");
    }

    #[tokio::test(start_paused = true)]
    async fn slow_source_misses_deadline_others_survive() {
        let agg = aggregator(
            vec![
                ok("A", 0, &["a1"]),
                ok("B", 2_000, &["b1"]),
                ok("C", 10_000, &["c1"]),
            ],
            5,
        );
        let ctx = FetchContext::with_timeout(agg.config().cycle_timeout);
        let start = Instant::now();
        let (artifact, report) = agg.run_cycle(&ctx).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(5));
        assert_eq!(text(&artifact.rendered_default), "[a1;b1]<A><B>");
        assert_eq!(artifact.summary, vec!["a1", "b1"]);
        assert_eq!(artifact.failed_sources, vec!["C"]);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, vec!["C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_source_leaves_gap() {
        let agg = aggregator(
            vec![ok("A", 300, &[]), failing("B", 100), ok("C", 0, &[])],
            5,
        );
        let ctx = FetchContext::with_timeout(agg.config().cycle_timeout);
        let (artifact, report) = agg.run_cycle(&ctx).await.unwrap();

        assert_eq!(text(&artifact.rendered_default), "[]<A><C>");
        assert_eq!(report.failed, vec!["B"]);
        assert!(artifact.is_partial());
    }

    #[tokio::test(start_paused = true)]
    async fn summary_length_is_sum_of_sources() {
        let agg = aggregator(
            vec![
                ok("A", 30, &["a1", "a2"]),
                ok("B", 10, &[]),
                ok("C", 20, &["c1", "c2", "c3"]),
            ],
            5,
        );
        let ctx = FetchContext::with_timeout(agg.config().cycle_timeout);
        let (artifact, _) = agg.run_cycle(&ctx).await.unwrap();
        assert_eq!(artifact.summary, vec!["a1", "a2", "c1", "c2", "c3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrency_is_bounded() {
        struct Tracking {
            name: String,
            in_flight: Arc<AtomicUsize>,
            peak: Arc<AtomicUsize>,
        }

        #[async_trait]
        impl Source for Tracking {
            fn name(&self) -> &str {
                &self.name
            }

            async fn fetch(&self, _ctx: &FetchContext) -> SourceResult<SourceData> {
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(1)).await;
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok(SourceData::new("x"))
            }
        }

        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let sources = (0..6)
            .map(|i| {
                SourceEntry::new(Arc::new(Tracking {
                    name: format!("s{i}"),
                    in_flight: Arc::clone(&in_flight),
                    peak: Arc::clone(&peak),
                }))
            })
            .collect();
        let config = EngineConfig {
            cycle_timeout: Duration::from_secs(30),
            max_concurrency: 2,
        };
        let agg = Aggregator::new(sources, Arc::new(EchoRenderer), config).unwrap();

        let start = Instant::now();
        let ctx = FetchContext::with_timeout(agg.config().cycle_timeout);
        let (_, report) = agg.run_cycle(&ctx).await.unwrap();

        assert_eq!(report.succeeded, 6);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_publishes_artifact() {
        let agg = aggregator(vec![ok("A", 0, &[])], 5);
        let store = SnapshotStore::new();
        let report = agg.refresh(&store, &CancellationToken::new()).await.unwrap();

        let live = store.read().unwrap();
        assert_eq!(live.cycle_id, report.cycle_id);
        assert_eq!(text(&live.rendered_default), "[]<A>");
    }

    #[tokio::test(start_paused = true)]
    async fn render_failure_keeps_previous_snapshot() {
        let store = SnapshotStore::new();
        aggregator(vec![ok("A", 0, &[])], 5)
            .refresh(&store, &CancellationToken::new())
            .await
            .unwrap();
        let before = store.read().unwrap();

        let broken = Aggregator::new(
            vec![ok("A", 0, &[])],
            Arc::new(BrokenRenderer),
            EngineConfig::default(),
        )
        .unwrap();
        let err = broken
            .refresh(&store, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Render(_)));
        assert!(Arc::ptr_eq(&before, &store.read().unwrap()));
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_in_flight_fetches() {
        let agg = aggregator(vec![ok("A", 0, &[]), ok("B", 20_000, &[])], 60);
        let shutdown = CancellationToken::new();
        let store = SnapshotStore::new();

        let trigger = shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let report = agg.refresh(&store, &shutdown).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(1));
        assert_eq!(report.failed, vec!["B"]);
    }

    #[tokio::test(start_paused = true)]
    async fn template_renderer_end_to_end() {
        let renderer =
            TemplateRenderer::with_defaults("Home", chrono_tz::Tz::UTC, Minifier::disabled())
                .unwrap();
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 2, 10, 6, 0, 0).unwrap(),
        ));
        let agg = Aggregator::new(
            vec![ok("Weather", 10, &["Rain at 14:00"]), ok("Tasks", 0, &["2 open"])],
            Arc::new(renderer),
            EngineConfig::default(),
        )
        .unwrap()
        .with_clock(clock);

        let ctx = FetchContext::with_timeout(Duration::from_secs(5));
        let (artifact, _) = agg.run_cycle(&ctx).await.unwrap();
        let doc = text(&artifact.rendered_default);

        assert!(doc.find("<Weather>").unwrap() < doc.find("<Tasks>").unwrap());
        assert!(doc.find("Rain at 14:00").unwrap() < doc.find("2 open").unwrap());
        assert!(doc.contains("href=\"#weather\""));
        assert_eq!(artifact.generated_at, Utc.with_ymd_and_hms(2025, 2, 10, 6, 0, 0).unwrap());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn merge_order_ignores_completion_order(
            delays in proptest::collection::vec(0u64..5_000, 1..8)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()
                .unwrap();

            let names: Vec<String> = (0..delays.len()).map(|i| format!("s{i}")).collect();
            let sources = names
                .iter()
                .zip(&delays)
                .map(|(name, delay)| ok(name, *delay, &[name.as_str()]))
                .collect();
            let agg = aggregator(sources, 10);

            let (artifact, report) = rt.block_on(async {
                let ctx = FetchContext::with_timeout(Duration::from_secs(10));
                agg.run_cycle(&ctx).await.unwrap()
            });

            let expected_body: String = names.iter().map(|n| format!("<{n}>")).collect();
            let expected = format!("[{}]{}", names.join(";"), expected_body);
            prop_assert_eq!(text(&artifact.rendered_default), expected.as_str());
            prop_assert_eq!(artifact.summary, names);
            prop_assert!(report.failed.is_empty());
        }
    }
}
