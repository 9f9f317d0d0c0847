//! Caching decorator for Vista sources.
//!
//! [`CachedSource`] wraps any [`vista_types::Source`] and turns it into a
//! source that:
//!
//! 1. calls upstream at most once per refresh interval,
//! 2. refreshes at least once per calendar day (the next refresh is capped
//!    at the following local midnight),
//! 3. keeps serving the last good result while upstream is failing,
//! 4. never has more than one upstream call in flight.
//!
//! Only a failure on the very first fetch, when nothing is cached yet, is
//! reported to the caller.

pub mod cached;
pub mod config;
pub mod error;
pub mod policy;

pub use cached::CachedSource;
pub use config::{CacheConfig, DEFAULT_REFRESH_INTERVAL, MIN_REFRESH_INTERVAL};
pub use error::{CacheError, CacheResult};
pub use policy::{compute_next_refresh, next_local_midnight};
