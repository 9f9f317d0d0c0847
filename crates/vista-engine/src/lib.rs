//! The Vista aggregation core.
//!
//! A refresh cycle fans out to every configured [`Source`](vista_types::Source)
//! concurrently under one deadline, merges whatever came back in configured
//! order, renders the two documents and publishes them as an [`Artifact`]
//! in the [`SnapshotStore`]. The HTTP server and the mailer only ever read
//! the store.
//!
//! ```text
//! tick -> Aggregator::refresh -> [source]xN -> merge -> render -> SnapshotStore::swap
//! ```

pub mod aggregator;
pub mod artifact;
pub mod config;
pub mod error;
pub mod snapshot;

pub use aggregator::{merge, Aggregator, CycleReport, Merged, SourceEntry};
pub use artifact::Artifact;
pub use config::{
    EngineConfig, DEFAULT_CYCLE_TIMEOUT, DEFAULT_MAX_CONCURRENCY, MAX_CYCLE_TIMEOUT,
};
pub use error::{EngineError, EngineResult};
pub use snapshot::SnapshotStore;
