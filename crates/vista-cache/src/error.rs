use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error("refresh interval {actual:?} is below the minimum of {minimum:?}")]
    IntervalTooShort { actual: Duration, minimum: Duration },
}

pub type CacheResult<T> = Result<T, CacheError>;
