//! Timezone normalization for feed timestamps.
//!
//! Every feed timestamp becomes an absolute instant plus a canonical IANA
//! zone label:
//!
//! 1. A `TZID` is looked up in a small table of legacy (Windows-style) names
//!    first, then accepted as-is if it is a known IANA zone. Anything else is
//!    treated as the configured default zone.
//! 2. Floating times (no zone at all) get a fixed correction. If the feed's
//!    origin zone is listed in the correction table, the wall clock is read as
//!    UTC and shifted by that entry; otherwise it is read in the default zone
//!    and shifted by `default_offset_minutes`.
//!
//! Rule 2 is a heuristic. The correction constants were fit to the observed
//! output of one specific feed and are not a general zone-inference scheme,
//! so the table should only change when a feed is observed to need it.

use chrono::{DateTime, Duration, LocalResult, NaiveDateTime, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::config::SyncOptions;
use crate::event::{EventTime, NormalizedEvent, RawOccurrence, SourceTag, ZonedInstant};

/// Legacy zone names seen in feeds, mapped to their IANA equivalents.
const LEGACY_ZONES: &[(&str, &str)] = &[
    ("Pacific Standard Time", "America/Los_Angeles"),
    ("US Mountain Standard Time", "America/Denver"),
    ("Central Standard Time", "America/Chicago"),
    ("India Standard Time", "Asia/Kolkata"),
];

/// Map a zone identifier to a canonical zone, if it is recognized.
pub fn canonical_zone(tzid: &str) -> Option<Tz> {
    let tzid = tzid.trim();

    LEGACY_ZONES
        .iter()
        .find(|(legacy, _)| *legacy == tzid)
        .and_then(|(_, iana)| iana.parse().ok())
        .or_else(|| tzid.parse().ok())
}

/// Like [`canonical_zone`] but falls back to `default`.
pub fn resolve_zone(tzid: &str, default: Tz) -> Tz {
    canonical_zone(tzid).unwrap_or(default)
}

/// Convert a wall-clock time in `tz` to UTC.
///
/// Ambiguous times (DST fall-back) take the earlier instant; times inside a
/// spring-forward gap are moved past the gap.
pub fn local_to_utc(naive: NaiveDateTime, tz: Tz) -> DateTime<Utc> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt.with_timezone(&Utc),
        LocalResult::Ambiguous(earliest, _) => earliest.with_timezone(&Utc),
        LocalResult::None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    }
}

/// Correction applied to floating timestamps for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FloatingCorrection {
    /// Origin is listed in the table: read the wall clock as UTC, then shift.
    KnownOrigin { origin: String, offset: Duration },
    /// Origin unknown: read the wall clock in the default zone, then shift.
    Default { offset: Duration },
}

impl FloatingCorrection {
    /// Pick the correction for `origin_hint` from the configured table.
    pub fn from_options(options: &SyncOptions, origin_hint: Option<&str>) -> Self {
        let table = &options.floating.corrections;

        let known = origin_hint.and_then(|hint| {
            let hint = hint.trim();
            table
                .get(hint)
                .map(|minutes| (hint.to_string(), *minutes))
                .or_else(|| {
                    let canonical = canonical_zone(hint)?;
                    table
                        .get(canonical.name())
                        .map(|minutes| (canonical.name().to_string(), *minutes))
                })
        });

        match known {
            Some((origin, minutes)) => FloatingCorrection::KnownOrigin {
                origin,
                offset: Duration::minutes(minutes),
            },
            None => FloatingCorrection::Default {
                offset: Duration::minutes(options.floating.default_offset_minutes),
            },
        }
    }
}

/// Turns feed timestamps into `(instant, zone)` pairs.
#[derive(Debug, Clone)]
pub struct Normalizer {
    default_zone: Tz,
    floating: FloatingCorrection,
}

impl Normalizer {
    pub fn new(default_zone: Tz, floating: FloatingCorrection) -> Self {
        Normalizer {
            default_zone,
            floating,
        }
    }

    /// Build a normalizer for one run. `feed_origin` is the feed's own zone
    /// hint (`X-WR-TIMEZONE`), used when the configuration names no origin.
    pub fn for_run(options: &SyncOptions, feed_origin: Option<&str>) -> Self {
        let origin = options.floating.origin.as_deref().or(feed_origin);
        Normalizer::new(
            options.default_zone,
            FloatingCorrection::from_options(options, origin),
        )
    }

    pub fn default_zone(&self) -> Tz {
        self.default_zone
    }

    pub fn normalize_time(&self, time: &EventTime) -> ZonedInstant {
        let default_label = self.default_zone.name();

        match time {
            EventTime::DateTimeZoned { datetime, tzid } => {
                let zone = resolve_zone(tzid, self.default_zone);
                ZonedInstant::new(local_to_utc(*datetime, zone), zone.name())
            }
            EventTime::DateTimeUtc(dt) => ZonedInstant::new(*dt, default_label),
            EventTime::DateTimeFloating(naive) => {
                let instant = match &self.floating {
                    FloatingCorrection::KnownOrigin { offset, .. } => naive.and_utc() + *offset,
                    FloatingCorrection::Default { offset } => {
                        local_to_utc(*naive, self.default_zone) + *offset
                    }
                };
                ZonedInstant::new(instant, default_label)
            }
            EventTime::Date(date) => ZonedInstant::new(
                local_to_utc(date.and_time(NaiveTime::MIN), self.default_zone),
                default_label,
            ),
        }
    }

    /// Normalize a feed occurrence. Returns `None` (and logs) when the
    /// occurrence does not end after it starts.
    pub fn normalize(&self, occurrence: &RawOccurrence) -> Option<NormalizedEvent> {
        let start = self.normalize_time(&occurrence.start);
        let end = self.normalize_time(&occurrence.end);

        let normalized = NormalizedEvent::new(
            occurrence.summary.clone(),
            start,
            end,
            occurrence.location.clone(),
            SourceTag::Feed,
        );

        if normalized.is_none() {
            tracing::warn!(
                "Dropping '{}' starting {}: it does not end after it starts",
                occurrence.summary,
                occurrence.start
            );
        }

        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use chrono::NaiveDate;

    fn options(extra: &str) -> SyncOptions {
        Settings::from_toml(&format!(
            "ics_calendar_url = \"https://example.com/feed.ics\"\n{}",
            extra
        ))
        .unwrap()
        .resolve()
        .unwrap()
    }

    fn naive(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn utc(h: u32, m: u32) -> DateTime<Utc> {
        naive(h, m).and_utc()
    }

    #[test]
    fn test_legacy_zone_names_map_to_iana() {
        assert_eq!(canonical_zone("Pacific Standard Time"), Some(chrono_tz::America::Los_Angeles));
        assert_eq!(canonical_zone("US Mountain Standard Time"), Some(chrono_tz::America::Denver));
        assert_eq!(canonical_zone("Central Standard Time"), Some(chrono_tz::America::Chicago));
        assert_eq!(canonical_zone("India Standard Time"), Some(chrono_tz::Asia::Kolkata));
        assert_eq!(canonical_zone("Europe/Berlin"), Some(chrono_tz::Europe::Berlin));
        assert_eq!(canonical_zone("Atlantis Standard Time"), None);
    }

    #[test]
    fn test_zoned_time_uses_source_zone_for_instant() {
        let normalizer = Normalizer::for_run(&options(""), None);
        let time = EventTime::DateTimeZoned {
            datetime: naive(9, 0),
            tzid: "Central Standard Time".into(),
        };

        let zoned = normalizer.normalize_time(&time);
        // Chicago is on CDT (UTC-5) on 2025-03-20
        assert_eq!(zoned.instant, utc(14, 0));
        assert_eq!(zoned.zone, "America/Chicago");
    }

    #[test]
    fn test_unknown_zone_falls_back_to_default() {
        let normalizer = Normalizer::for_run(&options(""), None);
        let time = EventTime::DateTimeZoned {
            datetime: naive(9, 0),
            tzid: "Custom Campus Time".into(),
        };

        let zoned = normalizer.normalize_time(&time);
        assert_eq!(zoned.instant, utc(16, 0));
        assert_eq!(zoned.zone, "America/Phoenix");
    }

    #[test]
    fn test_utc_time_keeps_instant_with_default_label() {
        let normalizer = Normalizer::for_run(&options(""), None);
        let zoned = normalizer.normalize_time(&EventTime::DateTimeUtc(utc(9, 0)));

        assert_eq!(zoned.instant, utc(9, 0));
        assert_eq!(zoned.zone, "America/Phoenix");
    }

    #[test]
    fn test_floating_time_from_known_origin() {
        let opts = options("[floating]\norigin = \"India Standard Time\"");
        let normalizer = Normalizer::for_run(&opts, None);

        let zoned = normalizer.normalize_time(&EventTime::DateTimeFloating(naive(14, 0)));
        // 6 hours back, 30 minutes forward
        assert_eq!(zoned.instant, utc(8, 30));
        assert_eq!(zoned.zone, "America/Phoenix");
    }

    #[test]
    fn test_floating_time_without_known_origin_uses_default_correction() {
        let normalizer = Normalizer::for_run(&options(""), None);

        let zoned = normalizer.normalize_time(&EventTime::DateTimeFloating(naive(14, 0)));
        // 14:00 Phoenix is 21:00 UTC, minus 12h30m
        assert_eq!(zoned.instant, utc(8, 30));
        assert_eq!(zoned.zone, "America/Phoenix");
    }

    #[test]
    fn test_feed_origin_hint_used_when_config_has_none() {
        let opts = options("[floating]\ndefault_offset_minutes = 0");
        let hinted = Normalizer::for_run(&opts, Some("Asia/Kolkata"));
        let unhinted = Normalizer::for_run(&opts, None);

        let time = EventTime::DateTimeFloating(naive(14, 0));
        assert_eq!(hinted.normalize_time(&time).instant, utc(8, 30));
        assert_eq!(unhinted.normalize_time(&time).instant, utc(21, 0));
    }

    #[test]
    fn test_all_day_date_is_local_midnight() {
        let normalizer = Normalizer::for_run(&options(""), None);
        let zoned = normalizer.normalize_time(&EventTime::Date(naive(0, 0).date()));

        assert_eq!(zoned.instant, utc(7, 0));
    }

    #[test]
    fn test_spring_forward_gap_is_skipped() {
        // 2025-03-09 02:30 does not exist in New York
        let gap = NaiveDate::from_ymd_opt(2025, 3, 9)
            .unwrap()
            .and_hms_opt(2, 30, 0)
            .unwrap();
        let instant = local_to_utc(gap, chrono_tz::America::New_York);

        assert_eq!(
            instant,
            NaiveDate::from_ymd_opt(2025, 3, 9)
                .unwrap()
                .and_hms_opt(7, 30, 0)
                .unwrap()
                .and_utc()
        );
    }

    #[test]
    fn test_zero_length_occurrence_is_dropped() {
        let normalizer = Normalizer::for_run(&options(""), None);
        let occurrence = RawOccurrence {
            summary: "Assignment due".into(),
            location: None,
            start: EventTime::DateTimeUtc(utc(9, 0)),
            end: EventTime::DateTimeUtc(utc(9, 0)),
            recurring: false,
        };

        assert!(normalizer.normalize(&occurrence).is_none());
    }
}
