use std::time::Duration;

use chrono_tz::Tz;

use crate::error::{CacheError, CacheResult};

/// Floor for refresh intervals, so a typo cannot hammer an upstream API.
pub const MIN_REFRESH_INTERVAL: Duration = Duration::from_secs(60);

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Refresh policy for one cached source.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheConfig {
    /// How long a successful result stays fresh.
    pub refresh_interval: Duration,
    /// Timezone whose midnight caps the refresh interval.
    pub timezone: Tz,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            timezone: Tz::UTC,
        }
    }
}

impl CacheConfig {
    pub fn new(refresh_interval: Duration, timezone: Tz) -> Self {
        Self {
            refresh_interval,
            timezone,
        }
    }

    pub fn validate(&self) -> CacheResult<()> {
        if self.refresh_interval < MIN_REFRESH_INTERVAL {
            return Err(CacheError::IntervalTooShort {
                actual: self.refresh_interval,
                minimum: MIN_REFRESH_INTERVAL,
            });
        }
        Ok(())
    }
}
