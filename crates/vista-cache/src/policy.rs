use std::time::Duration;

use chrono::{DateTime, LocalResult, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// The first instant of the next calendar day in `tz`, expressed in UTC.
///
/// Days that start inside a DST gap begin at the first valid local time
/// after midnight.
pub fn next_local_midnight(now: DateTime<Utc>, tz: &Tz) -> DateTime<Utc> {
    let local_date = now.with_timezone(tz).date_naive();
    let Some(tomorrow) = local_date.succ_opt() else {
        return now + TimeDelta::days(1);
    };
    let midnight = tomorrow.and_time(chrono::NaiveTime::MIN);

    let resolved = match tz.from_local_datetime(&midnight) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => (1..=3)
            .map(|h| midnight + TimeDelta::hours(h))
            .find_map(|candidate| tz.from_local_datetime(&candidate).earliest()),
    };

    resolved
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| now + TimeDelta::days(1))
}

/// When a result fetched at `fetched_at` goes stale.
///
/// `min(fetched_at + interval, next local midnight)`: long intervals still
/// refresh at least once per calendar day.
pub fn compute_next_refresh(
    fetched_at: DateTime<Utc>,
    interval: Duration,
    tz: &Tz,
) -> DateTime<Utc> {
    let midnight = next_local_midnight(fetched_at, tz);
    TimeDelta::from_std(interval)
        .ok()
        .and_then(|delta| fetched_at.checked_add_signed(delta))
        .map_or(midnight, |candidate| candidate.min(midnight))
}
