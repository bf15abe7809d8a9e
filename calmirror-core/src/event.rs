//! Event types flowing through a sync run.
//!
//! A run starts with [`RawOccurrence`]s straight out of the feed, turns them
//! into [`NormalizedEvent`]s, and compares those against the
//! [`DestinationEvent`]s already on the destination calendar.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// A timestamp as written in the feed, before any zone handling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTime {
    /// All-day value (`VALUE=DATE`)
    Date(NaiveDate),
    /// Absolute instant (`...Z`)
    DateTimeUtc(DateTime<Utc>),
    /// Wall-clock time with no zone attached
    DateTimeFloating(NaiveDateTime),
    /// Wall-clock time with a `TZID` parameter
    DateTimeZoned {
        datetime: NaiveDateTime,
        tzid: String,
    },
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventTime::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventTime::DateTimeUtc(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            EventTime::DateTimeFloating(dt) => write!(f, "{} (floating)", dt.format("%Y-%m-%d %H:%M")),
            EventTime::DateTimeZoned { datetime, tzid } => {
                write!(f, "{} ({})", datetime.format("%Y-%m-%d %H:%M"), tzid)
            }
        }
    }
}

/// One concrete occurrence parsed (and, for recurring events, expanded)
/// from the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct RawOccurrence {
    pub summary: String,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    /// Whether this occurrence was generated from a recurrence rule
    pub recurring: bool,
}

/// An absolute instant together with the canonical zone it should be shown in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ZonedInstant {
    pub instant: DateTime<Utc>,
    pub zone: String,
}

impl ZonedInstant {
    pub fn new(instant: DateTime<Utc>, zone: impl Into<String>) -> Self {
        ZonedInstant {
            instant,
            zone: zone.into(),
        }
    }
}

/// Which source an event came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceTag {
    Feed,
    Shared,
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceTag::Feed => write!(f, "feed"),
            SourceTag::Shared => write!(f, "shared"),
        }
    }
}

/// The canonical event shape used from normalization onwards.
///
/// Invariant: `start.instant < end.instant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub summary: String,
    pub start: ZonedInstant,
    pub end: ZonedInstant,
    pub location: Option<String>,
    pub source: SourceTag,
}

impl NormalizedEvent {
    /// Returns `None` when the event does not end after it starts.
    pub fn new(
        summary: impl Into<String>,
        start: ZonedInstant,
        end: ZonedInstant,
        location: Option<String>,
        source: SourceTag,
    ) -> Option<Self> {
        if start.instant >= end.instant {
            return None;
        }

        Some(NormalizedEvent {
            summary: summary.into(),
            start,
            end,
            location: location.filter(|l| !l.is_empty()),
            source,
        })
    }

    /// Two events with the same key are the same logical event, whichever
    /// source they came from.
    pub fn identity_key(&self) -> (&str, DateTime<Utc>) {
        (&self.summary, self.start.instant)
    }
}

impl fmt::Display for NormalizedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

/// An event already present on the destination calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationEvent {
    pub id: String,
    pub summary: String,
    pub start: ZonedInstant,
    pub end: ZonedInstant,
    /// Color attribute; equals the sync tag for events this engine created.
    pub color_tag: Option<String>,
    pub location: Option<String>,
}

impl DestinationEvent {
    pub fn has_color(&self, tag: &str) -> bool {
        self.color_tag.as_deref() == Some(tag)
    }
}

impl fmt::Display for DestinationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32) -> ZonedInstant {
        ZonedInstant::new(
            Utc.with_ymd_and_hms(2025, 3, 20, h, 0, 0).unwrap(),
            "America/Phoenix",
        )
    }

    #[test]
    fn test_normalized_event_requires_positive_duration() {
        assert!(NormalizedEvent::new("Lecture", at(9), at(10), None, SourceTag::Feed).is_some());
        assert!(NormalizedEvent::new("Lecture", at(9), at(9), None, SourceTag::Feed).is_none());
        assert!(NormalizedEvent::new("Lecture", at(10), at(9), None, SourceTag::Feed).is_none());
    }

    #[test]
    fn test_identity_key_ignores_source_and_location() {
        let a = NormalizedEvent::new("Lecture", at(9), at(10), None, SourceTag::Feed).unwrap();
        let b = NormalizedEvent::new(
            "Lecture",
            at(9),
            ZonedInstant::new(at(9).instant + Duration::minutes(90), "UTC"),
            Some("Hall B".into()),
            SourceTag::Shared,
        )
        .unwrap();

        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_empty_location_is_dropped() {
        let event =
            NormalizedEvent::new("Lecture", at(9), at(10), Some(String::new()), SourceTag::Feed)
                .unwrap();
        assert!(event.location.is_none());
    }
}
