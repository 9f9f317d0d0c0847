use std::time::Duration;

use chrono::{
    DateTime, Days, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;

use crate::error::{MailError, MailResult};

/// A wall-clock time of day in a fixed timezone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    timezone: Tz,
}

impl DailySchedule {
    pub fn new(at: NaiveTime, timezone: Tz) -> Self {
        Self { at, timezone }
    }

    /// Parse an `HH:MM` time of day.
    pub fn parse(at: &str, timezone: Tz) -> MailResult<Self> {
        let time = NaiveTime::parse_from_str(at.trim(), "%H:%M")
            .map_err(|_| MailError::Config(format!("'at' must be HH:MM, got {at:?}")))?;
        Ok(Self::new(time, timezone))
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// The first occurrence strictly after `now`.
    ///
    /// A time skipped by a DST jump fires at the first valid local time
    /// after it; a repeated time fires on its first occurrence.
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.with_timezone(&self.timezone).date_naive();
        (0..=2)
            .filter_map(|offset| today.checked_add_days(Days::new(offset)))
            .filter_map(|date| self.resolve(date.and_time(self.at)))
            .find(|candidate| *candidate > now)
            .unwrap_or_else(|| now + TimeDelta::days(1))
    }

    /// How long to wait from `now` until the next occurrence.
    pub fn until_next(&self, now: DateTime<Utc>) -> Duration {
        (self.next_after(now) - now).to_std().unwrap_or(Duration::ZERO)
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let resolved = match self.timezone.from_local_datetime(&local) {
            LocalResult::Single(t) => Some(t),
            LocalResult::Ambiguous(earliest, _) => Some(earliest),
            LocalResult::None => (1..=3)
                .map(|h| local + TimeDelta::hours(h))
                .find_map(|shifted| {
                    self.timezone
                        .from_local_datetime(&shifted)
                        .earliest()
                        // Land on the hour boundary the gap ends at.
                        .map(|t| t - TimeDelta::minutes(i64::from(local.minute())))
                }),
        };
        resolved.map(|t| t.with_timezone(&Utc))
    }
}
