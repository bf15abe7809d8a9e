//! Occurrence expansion.
//!
//! Turns the feed's event definitions into concrete occurrences whose start
//! falls inside the fetch window. Recurring masters are expanded with the
//! rrule crate, respecting EXDATEs and RECURRENCE-ID overrides, and capped at
//! `max_expansions` instances per master.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use rrule::RRuleSet;

use crate::config::MAX_FLOATING_OFFSET_MINUTES;
use crate::error::{CalMirrorError, CalMirrorResult};
use crate::event::{EventTime, RawOccurrence};
use crate::ics::{FeedDocument, FeedEvent, Recurrence};
use crate::timezone::{Normalizer, local_to_utc, resolve_zone};
use crate::window::SyncWindow;

/// Extra range expanded on both sides of the window. Bounded by the largest
/// zone offset plus the largest accepted floating correction.
const EXPANSION_SLACK: Duration = Duration::hours(14 + MAX_FLOATING_OFFSET_MINUTES / 60);

/// Override lookup key: (uid, instant of the replaced occurrence)
type OverrideKey = (String, DateTime<Utc>);

/// Expand every event in `doc` into occurrences starting inside `window`.
///
/// Fails with `FeedParse` when a recurrence rule cannot be parsed.
pub fn expand_feed(
    doc: &FeedDocument,
    window: &SyncWindow,
    max_expansions: u16,
    normalizer: &Normalizer,
) -> CalMirrorResult<Vec<RawOccurrence>> {
    let overrides: HashMap<OverrideKey, &FeedEvent> = doc
        .events
        .iter()
        .filter_map(|e| {
            let uid = e.uid.clone()?;
            let recurrence_id = e.recurrence_id.as_ref()?;
            Some(((uid, normalizer.normalize_time(recurrence_id).instant), e))
        })
        .collect();

    let mut used_overrides: HashSet<OverrideKey> = HashSet::new();
    let mut occurrences = Vec::new();

    for event in doc.events.iter().filter(|e| e.recurrence_id.is_none()) {
        match &event.recurrence {
            Some(recurrence) => {
                let expanded = expand_recurring_event(
                    event,
                    recurrence,
                    window,
                    max_expansions,
                    normalizer,
                    &overrides,
                    &mut used_overrides,
                )?;
                occurrences.extend(expanded);
            }
            None => {
                if let Some(occurrence) = single_occurrence(event, false, window, normalizer) {
                    occurrences.push(occurrence);
                }
            }
        }
    }

    // Overrides whose original slot was not generated this run (moved in
    // from outside the window, or no master in the feed) stand on their own.
    for event in doc.events.iter() {
        let Some(recurrence_id) = &event.recurrence_id else {
            continue;
        };
        let used = event.uid.as_ref().is_some_and(|uid| {
            used_overrides.contains(&(uid.clone(), normalizer.normalize_time(recurrence_id).instant))
        });
        if used {
            continue;
        }
        if let Some(occurrence) = single_occurrence(event, true, window, normalizer) {
            occurrences.push(occurrence);
        }
    }

    tracing::debug!(
        "Expanded {} feed definitions into {} occurrences",
        doc.events.len(),
        occurrences.len()
    );

    Ok(occurrences)
}

/// A non-recurring event (or a standalone override), if it is live and
/// starts inside the window.
fn single_occurrence(
    event: &FeedEvent,
    recurring: bool,
    window: &SyncWindow,
    normalizer: &Normalizer,
) -> Option<RawOccurrence> {
    if event.cancelled {
        return None;
    }

    let start = normalizer.normalize_time(&event.start).instant;
    if !window.covers(start) {
        return None;
    }

    Some(RawOccurrence {
        summary: event.summary.clone(),
        location: event.location.clone(),
        start: event.start.clone(),
        end: event.end.clone(),
        recurring,
    })
}

fn expand_recurring_event(
    master: &FeedEvent,
    recurrence: &Recurrence,
    window: &SyncWindow,
    max_expansions: u16,
    normalizer: &Normalizer,
    overrides: &HashMap<OverrideKey, &FeedEvent>,
    used_overrides: &mut HashSet<OverrideKey>,
) -> CalMirrorResult<Vec<RawOccurrence>> {
    if master.cancelled {
        return Ok(Vec::new());
    }

    let default_zone = normalizer.default_zone();
    let rrule_str = build_rrule_string(&master.start, recurrence, default_zone);

    let rrule_set: RRuleSet = rrule_str.parse().map_err(|e| {
        CalMirrorError::FeedParse(format!(
            "Failed to parse RRULE for event '{}': {}",
            master.summary, e
        ))
    })?;

    // Floating and all-day starts are expanded as UTC wall clocks, which can
    // sit a zone offset plus the floating correction away from their instant.
    // Expand wide and keep instances by their normalized start.
    let tz: rrule::Tz = Utc.into();
    let after = (window.start - EXPANSION_SLACK).with_timezone(&tz);
    let before = (window.end + EXPANSION_SLACK).with_timezone(&tz);

    let result = rrule_set.after(after).before(before).all(max_expansions);

    if result.limited {
        tracing::warn!(
            "Expansion of '{}' stopped at {} occurrences",
            master.summary,
            max_expansions
        );
    }

    let duration = normalizer.normalize_time(&master.end).instant
        - normalizer.normalize_time(&master.start).instant;

    let mut occurrences = Vec::new();

    for occ_dt in &result.dates {
        let start = occurrence_to_event_time(occ_dt, &master.start);
        let instant = normalizer.normalize_time(&start).instant;

        if let Some(uid) = &master.uid {
            let key = (uid.clone(), instant);
            if let Some(override_event) = overrides.get(&key) {
                used_overrides.insert(key);
                if let Some(occurrence) = single_occurrence(override_event, true, window, normalizer)
                {
                    occurrences.push(occurrence);
                }
                continue;
            }
        }

        if !window.covers(instant) {
            continue;
        }

        let end = instance_end(&start, &master.start, &master.end, duration);

        occurrences.push(RawOccurrence {
            summary: master.summary.clone(),
            location: master.location.clone(),
            start,
            end,
            recurring: true,
        });
    }

    Ok(occurrences)
}

/// Build an iCalendar-format rule set string for the rrule crate parser.
///
/// Zone names are resolved to IANA first so legacy identifiers expand
/// correctly. All-day and floating starts are expanded as UTC wall clocks.
fn build_rrule_string(start: &EventTime, recurrence: &Recurrence, default_zone: Tz) -> String {
    let mut lines = Vec::new();

    lines.push(format!("DTSTART{}", ics_value(start, default_zone)));
    lines.push(format!(
        "RRULE:{}",
        normalize_until(&recurrence.rrule, start, default_zone)
    ));

    for exdate in &recurrence.exdates {
        lines.push(format!("EXDATE{}", ics_value(exdate, default_zone)));
    }

    lines.join("\n")
}

/// `;TZID=...:value` or `:value` for a DTSTART/EXDATE line.
fn ics_value(time: &EventTime, default_zone: Tz) -> String {
    match time {
        EventTime::Date(d) => format!(":{}T000000Z", d.format("%Y%m%d")),
        EventTime::DateTimeUtc(dt) => format!(":{}", dt.format("%Y%m%dT%H%M%SZ")),
        EventTime::DateTimeFloating(dt) => format!(":{}Z", dt.format("%Y%m%dT%H%M%S")),
        EventTime::DateTimeZoned { datetime, tzid } => format!(
            ";TZID={}:{}",
            resolve_zone(tzid, default_zone).name(),
            datetime.format("%Y%m%dT%H%M%S")
        ),
    }
}

/// The rrule crate requires UNTIL in UTC; feeds often write it as a local
/// or date value.
fn normalize_until(rrule: &str, start: &EventTime, default_zone: Tz) -> String {
    rrule
        .split(';')
        .map(|part| {
            let Some(value) = part
                .get(..6)
                .filter(|key| key.eq_ignore_ascii_case("UNTIL="))
                .map(|_| &part[6..])
            else {
                return part.to_string();
            };

            if value.ends_with('Z') {
                return part.to_string();
            }

            let naive = if value.len() == 8 {
                NaiveDate::parse_from_str(value, "%Y%m%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(23, 59, 59))
            } else {
                NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S").ok()
            };

            let Some(naive) = naive else {
                return part.to_string();
            };

            let until = match start {
                EventTime::DateTimeZoned { tzid, .. } => {
                    local_to_utc(naive, resolve_zone(tzid, default_zone))
                }
                _ => naive.and_utc(),
            };

            format!("UNTIL={}", until.format("%Y%m%dT%H%M%SZ"))
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Convert an rrule occurrence back to an EventTime matching the master's variant.
fn occurrence_to_event_time(dt: &DateTime<rrule::Tz>, master_start: &EventTime) -> EventTime {
    match master_start {
        EventTime::Date(_) => EventTime::Date(dt.date_naive()),
        EventTime::DateTimeUtc(_) => EventTime::DateTimeUtc(dt.with_timezone(&Utc)),
        EventTime::DateTimeFloating(_) => EventTime::DateTimeFloating(dt.naive_utc()),
        EventTime::DateTimeZoned { tzid, .. } => EventTime::DateTimeZoned {
            datetime: dt.naive_local(),
            tzid: tzid.clone(),
        },
    }
}

/// End of a generated instance, preserving the variant of the master's start.
fn instance_end(
    start: &EventTime,
    master_start: &EventTime,
    master_end: &EventTime,
    duration: Duration,
) -> EventTime {
    match (start, master_start, master_end) {
        (EventTime::Date(d), EventTime::Date(d_start), EventTime::Date(d_end)) => {
            EventTime::Date(*d + (*d_end - *d_start))
        }
        (EventTime::Date(d), _, _) => EventTime::Date(*d + Duration::days(duration.num_days().max(1))),
        (EventTime::DateTimeUtc(dt), _, _) => EventTime::DateTimeUtc(*dt + duration),
        (EventTime::DateTimeFloating(dt), _, _) => EventTime::DateTimeFloating(*dt + duration),
        (EventTime::DateTimeZoned { datetime, tzid }, _, _) => EventTime::DateTimeZoned {
            datetime: *datetime + duration,
            tzid: tzid.clone(),
        },
    }
}
