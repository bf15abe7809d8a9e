//! Time windows a sync run operates on.

use chrono::{DateTime, Duration, NaiveTime, Utc};

use crate::config::SyncOptions;
use crate::error::{CalMirrorError, CalMirrorResult};
use crate::timezone::local_to_utc;

/// A half-open range of instants, recomputed for every run.
///
/// Invariant: `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SyncWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> CalMirrorResult<Self> {
        if start >= end {
            return Err(CalMirrorError::Config(format!(
                "Sync window start ({}) must be before its end ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        Ok(SyncWindow { start, end })
    }

    /// Run-day `window.start` through run-day + `sync_days` at `window.end`,
    /// both in the destination zone.
    pub fn for_run(now: DateTime<Utc>, options: &SyncOptions) -> CalMirrorResult<Self> {
        let tz = options.default_zone;
        let today = now.with_timezone(&tz).date_naive();
        let last_day = Duration::try_days(options.sync_days)
            .and_then(|days| today.checked_add_signed(days))
            .ok_or_else(|| {
                CalMirrorError::Config(format!("sync_days {} is out of range", options.sync_days))
            })?;

        SyncWindow::new(
            local_to_utc(today.and_time(options.window_start), tz),
            local_to_utc(last_day.and_time(options.window_end), tz),
        )
    }

    /// The window events must start in to be ingested.
    ///
    /// With `window.ingest_until` set this is today 00:00 through tomorrow at
    /// that time; otherwise it is the same as [`SyncWindow::for_run`].
    pub fn ingest_for_run(now: DateTime<Utc>, options: &SyncOptions) -> CalMirrorResult<Self> {
        let Some(until) = options.ingest_until else {
            return SyncWindow::for_run(now, options);
        };

        let tz = options.default_zone;
        let today = now.with_timezone(&tz).date_naive();
        let tomorrow = today + Duration::days(1);

        SyncWindow::new(
            local_to_utc(today.and_time(NaiveTime::MIN), tz),
            local_to_utc(tomorrow.and_time(until), tz),
        )
    }

    /// Strict containment: instants on either boundary are outside.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant > self.start && instant < self.end
    }

    /// Inclusive containment, used when deciding what to fetch or expand.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start && instant <= self.end
    }

    /// Smallest window covering both `self` and `other`.
    pub fn hull(&self, other: &SyncWindow) -> SyncWindow {
        SyncWindow {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn start_rfc3339(&self) -> String {
        self.start.to_rfc3339()
    }

    pub fn end_rfc3339(&self) -> String {
        self.end.to_rfc3339()
    }
}

/// The two windows a run works with.
#[derive(Debug, Clone, Copy)]
pub struct RunWindows {
    /// Range the feed is expanded over and the shared calendar is read from.
    pub fetch: SyncWindow,
    /// Range events must start strictly inside of to be synced. The
    /// destination snapshot is held to the same rule.
    pub ingest: SyncWindow,
}

impl RunWindows {
    pub fn for_run(now: DateTime<Utc>, options: &SyncOptions) -> CalMirrorResult<Self> {
        let sync = SyncWindow::for_run(now, options)?;
        let ingest = SyncWindow::ingest_for_run(now, options)?;

        Ok(RunWindows {
            fetch: sync.hull(&ingest),
            ingest,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use chrono::TimeZone;

    fn options(extra: &str) -> SyncOptions {
        Settings::from_toml(&format!(
            "ics_calendar_url = \"https://example.com/feed.ics\"\n{}",
            extra
        ))
        .unwrap()
        .resolve()
        .unwrap()
    }

    #[test]
    fn test_new_rejects_empty_window() {
        let t = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        assert!(SyncWindow::new(t, t).is_err());
        assert!(SyncWindow::new(t, t - Duration::minutes(1)).is_err());
    }

    #[test]
    fn test_run_window_spans_sync_days_in_destination_zone() {
        // 2025-03-20 10:00 in Phoenix (UTC-7, no DST)
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 17, 0, 0).unwrap();
        let window = SyncWindow::for_run(now, &options("sync_days = 2")).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap());
        assert_eq!(window.end, Utc.with_ymd_and_hms(2025, 3, 23, 6, 59, 0).unwrap());
    }

    #[test]
    fn test_unrepresentable_sync_days_is_config_error() {
        let mut opts = options("");
        opts.sync_days = i64::MAX;

        let now = Utc.with_ymd_and_hms(2025, 3, 20, 17, 0, 0).unwrap();
        assert!(matches!(
            SyncWindow::for_run(now, &opts),
            Err(CalMirrorError::Config(_))
        ));
    }

    #[test]
    fn test_run_day_follows_destination_zone_not_utc() {
        // 2025-03-21 02:00 UTC is still 2025-03-20 in Phoenix
        let now = Utc.with_ymd_and_hms(2025, 3, 21, 2, 0, 0).unwrap();
        let window = SyncWindow::for_run(now, &options("")).unwrap();

        assert_eq!(window.start, Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap());
    }

    #[test]
    fn test_ingest_window_when_configured() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 17, 0, 0).unwrap();
        let opts = options("[window]\ningest_until = \"07:00\"");
        let ingest = SyncWindow::ingest_for_run(now, &opts).unwrap();

        assert_eq!(ingest.start, Utc.with_ymd_and_hms(2025, 3, 20, 7, 0, 0).unwrap());
        assert_eq!(ingest.end, Utc.with_ymd_and_hms(2025, 3, 21, 14, 0, 0).unwrap());

        let windows = RunWindows::for_run(now, &opts).unwrap();
        assert_eq!(windows.fetch.start, ingest.start);
        assert_eq!(windows.ingest, ingest);
    }

    #[test]
    fn test_contains_is_strict_and_covers_is_inclusive() {
        let start = Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap();
        let window = SyncWindow::new(start, end).unwrap();

        assert!(!window.contains(start));
        assert!(!window.contains(end));
        assert!(window.contains(start + Duration::seconds(1)));
        assert!(window.covers(start));
        assert!(window.covers(end));
        assert!(!window.covers(end + Duration::seconds(1)));
    }
}
