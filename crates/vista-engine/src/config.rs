use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Upper bound on the duration of one refresh cycle by default.
pub const DEFAULT_CYCLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Longest cycle timeout accepted by [`EngineConfig::validate`].
pub const MAX_CYCLE_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

/// Sources fetched in parallel by default.
pub const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Tuning for a single aggregation cycle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Every fetch of a cycle shares this deadline.
    pub cycle_timeout: Duration,
    /// Maximum number of fetches in flight at once.
    pub max_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cycle_timeout: DEFAULT_CYCLE_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> EngineResult<()> {
        if self.max_concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.cycle_timeout.is_zero() {
            return Err(EngineError::InvalidConfig(
                "cycle_timeout must be positive".into(),
            ));
        }
        if self.cycle_timeout > MAX_CYCLE_TIMEOUT {
            return Err(EngineError::InvalidConfig(format!(
                "cycle_timeout must not exceed {}s",
                MAX_CYCLE_TIMEOUT.as_secs()
            )));
        }
        Ok(())
    }

    /// Shorten the cycle timeout so a cycle never outlasts one scheduler
    /// tick.
    pub fn clamped_to(mut self, interval: Duration) -> Self {
        if !interval.is_zero() && self.cycle_timeout > interval {
            self.cycle_timeout = interval;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = EngineConfig::default();
        assert_eq!(c.cycle_timeout, Duration::from_secs(60));
        assert_eq!(c.max_concurrency, 8);
        assert!(c.validate().is_ok());
    }

    #[test]
    fn zero_values_are_rejected() {
        let c = EngineConfig {
            max_concurrency: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(EngineError::InvalidConfig(_))));

        let c = EngineConfig {
            cycle_timeout: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn oversized_timeout_is_rejected() {
        let c = EngineConfig {
            cycle_timeout: Duration::from_secs(u64::MAX),
            ..EngineConfig::default()
        };
        assert!(matches!(c.validate(), Err(EngineError::InvalidConfig(_))));

        let c = EngineConfig {
            cycle_timeout: MAX_CYCLE_TIMEOUT,
            ..EngineConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn timeout_is_clamped_to_interval() {
        let c = EngineConfig::default().clamped_to(Duration::from_secs(30));
        assert_eq!(c.cycle_timeout, Duration::from_secs(30));

        let c = EngineConfig::default().clamped_to(Duration::from_secs(600));
        assert_eq!(c.cycle_timeout, Duration::from_secs(60));
    }
}
