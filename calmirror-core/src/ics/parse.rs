//! Feed parsing using the icalendar crate's parser.

use chrono::Duration;
use icalendar::{
    DatePerhapsTime,
    parser::{Component, Property, read_calendar, unfold},
};

use crate::error::{CalMirrorError, CalMirrorResult};
use crate::event::EventTime;

/// A parsed feed: its event definitions plus calendar-level metadata.
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    /// Calendar-level `X-WR-TIMEZONE`, if any
    pub origin_zone: Option<String>,
    pub events: Vec<FeedEvent>,
}

/// One VEVENT as defined in the feed (a single event, a recurring master,
/// or an override of one instance of a recurring master).
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub uid: Option<String>,
    pub summary: String,
    pub location: Option<String>,
    pub start: EventTime,
    pub end: EventTime,
    pub recurrence: Option<Recurrence>,
    /// Set on instance overrides (RECURRENCE-ID)
    pub recurrence_id: Option<EventTime>,
    pub cancelled: bool,
}

/// Recurrence data for a master event
#[derive(Debug, Clone, PartialEq)]
pub struct Recurrence {
    /// RRULE value, without the `RRULE:` prefix
    pub rrule: String,
    pub exdates: Vec<EventTime>,
}

/// Parse a whole feed document.
pub fn parse_feed(content: &str) -> CalMirrorResult<FeedDocument> {
    if !content.contains("BEGIN:VCALENDAR") {
        return Err(CalMirrorError::FeedParse(
            "Document is not an iCalendar feed (no VCALENDAR found)".into(),
        ));
    }

    let unfolded = unfold(content);
    let calendar = read_calendar(&unfolded).map_err(|e| CalMirrorError::FeedParse(e.to_string()))?;

    let origin_zone = calendar
        .properties
        .iter()
        .find(|p| p.name == "X-WR-TIMEZONE")
        .map(|p| p.val.to_string())
        .filter(|tz| !tz.trim().is_empty());

    let events = calendar
        .components
        .iter()
        .filter(|c| c.name == "VEVENT")
        .filter_map(parse_vevent)
        .collect();

    Ok(FeedDocument {
        origin_zone,
        events,
    })
}

fn parse_vevent(vevent: &Component) -> Option<FeedEvent> {
    let uid = vevent.find_prop("UID").map(|p| p.val.to_string());
    let summary = vevent
        .find_prop("SUMMARY")
        .map(|p| unescape_text(p.val.as_ref()))
        .unwrap_or_else(|| "(No title)".to_string());

    let Some(start) = vevent
        .find_prop("DTSTART")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
    else {
        tracing::debug!("Skipping VEVENT '{}' without a usable DTSTART", summary);
        return None;
    };

    let end = vevent
        .find_prop("DTEND")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time)
        .unwrap_or_else(|| implied_end(&start, vevent.find_prop("DURATION")));

    let location = vevent
        .find_prop("LOCATION")
        .map(|p| unescape_text(p.val.as_ref()))
        .filter(|l| !l.trim().is_empty());

    let cancelled = vevent
        .find_prop("STATUS")
        .is_some_and(|p| p.val.as_ref() == "CANCELLED");

    // Recurrence (RRULE, EXDATE)
    let rrule = vevent.find_prop("RRULE").map(|p| p.val.to_string());
    let exdates: Vec<EventTime> = vevent
        .properties
        .iter()
        .filter(|p| p.name == "EXDATE")
        .flat_map(parse_exdate_property)
        .collect();
    let recurrence = rrule.map(|rrule| Recurrence { rrule, exdates });

    let recurrence_id = vevent
        .find_prop("RECURRENCE-ID")
        .and_then(|p| DatePerhapsTime::try_from(p).ok())
        .map(to_event_time);

    Some(FeedEvent {
        uid,
        summary,
        location,
        start,
        end,
        recurrence,
        recurrence_id,
        cancelled,
    })
}

/// End of an event without DTEND: DURATION if given, otherwise one day for
/// all-day events and zero length for timed ones.
fn implied_end(start: &EventTime, duration: Option<&Property>) -> EventTime {
    let duration = duration
        .and_then(|p| parse_duration(p.val.as_ref()))
        .unwrap_or_else(|| match start {
            EventTime::Date(_) => Duration::days(1),
            _ => Duration::zero(),
        });

    match start {
        EventTime::Date(d) => EventTime::Date(*d + Duration::days(duration.num_days().max(1))),
        EventTime::DateTimeUtc(dt) => EventTime::DateTimeUtc(*dt + duration),
        EventTime::DateTimeFloating(dt) => EventTime::DateTimeFloating(*dt + duration),
        EventTime::DateTimeZoned { datetime, tzid } => EventTime::DateTimeZoned {
            datetime: *datetime + duration,
            tzid: tzid.clone(),
        },
    }
}

/// Parse a positive DURATION value (PT1H30M, P1D, ...).
fn parse_duration(value: &str) -> Option<Duration> {
    if value.starts_with('-') {
        return None;
    }
    let duration = iso8601::duration(value.trim_start_matches('+')).ok()?;
    let std_duration: std::time::Duration = duration.into();
    Duration::from_std(std_duration).ok()
}

/// Convert icalendar's DatePerhapsTime to our EventTime, preserving timezone info
fn to_event_time(dpt: DatePerhapsTime) -> EventTime {
    match dpt {
        DatePerhapsTime::Date(d) => EventTime::Date(d),
        DatePerhapsTime::DateTime(cal_dt) => match cal_dt {
            icalendar::CalendarDateTime::Utc(dt) => EventTime::DateTimeUtc(dt),
            icalendar::CalendarDateTime::Floating(naive) => EventTime::DateTimeFloating(naive),
            icalendar::CalendarDateTime::WithTimezone { date_time, tzid } => {
                EventTime::DateTimeZoned {
                    datetime: date_time,
                    tzid,
                }
            }
        },
    }
}

/// Parse an EXDATE property into a list of EventTime values.
///
/// Handles TZID and VALUE=DATE parameters, UTC and floating values, and
/// comma-separated lists.
fn parse_exdate_property(prop: &Property) -> Vec<EventTime> {
    let tzid = prop
        .params
        .iter()
        .find(|p| p.key == "TZID")
        .and_then(|p| p.val.as_ref().map(|v| v.to_string()));

    let is_date = prop
        .params
        .iter()
        .any(|p| p.key == "VALUE" && p.val.as_ref().map(|v| v.as_ref()) == Some("DATE"));

    prop.val
        .as_ref()
        .split(',')
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            if is_date {
                chrono::NaiveDate::parse_from_str(s, "%Y%m%d")
                    .ok()
                    .map(EventTime::Date)
            } else if let Some(ref tz) = tzid {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeZoned {
                        datetime: dt,
                        tzid: tz.clone(),
                    })
            } else if let Some(s) = s.strip_suffix('Z') {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(|dt| EventTime::DateTimeUtc(dt.and_utc()))
            } else {
                chrono::NaiveDateTime::parse_from_str(s, "%Y%m%dT%H%M%S")
                    .ok()
                    .map(EventTime::DateTimeFloating)
            }
        })
        .collect()
}

/// Undo RFC 5545 TEXT escaping.
fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }

    out.trim().to_string()
}
