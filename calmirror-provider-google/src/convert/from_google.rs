use calmirror_core::timezone::{canonical_zone, local_to_utc};
use calmirror_core::{CalMirrorError, CalMirrorResult, DestinationEvent, ZonedInstant};
use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::convert::FromGoogle;

impl FromGoogle<google_calendar::types::Event> for DestinationEvent {
    fn from_google(event: google_calendar::types::Event) -> CalMirrorResult<Self> {
        let start = event
            .start
            .as_ref()
            .and_then(instant_from_google)
            .ok_or_else(|| missing_time(&event, "start"))?;

        let end = event
            .end
            .as_ref()
            .and_then(instant_from_google)
            .ok_or_else(|| missing_time(&event, "end"))?;

        Ok(DestinationEvent {
            id: event.id,
            summary: event.summary,
            start,
            end,
            color_tag: if event.color_id.is_empty() {
                None
            } else {
                Some(event.color_id)
            },
            location: if event.location.is_empty() {
                None
            } else {
                Some(event.location)
            },
        })
    }
}

fn missing_time(event: &google_calendar::types::Event, which: &str) -> CalMirrorError {
    CalMirrorError::DestinationQuery(format!(
        "Event '{}' ({}) has no {} time",
        event.summary, event.id, which
    ))
}

/// Timed values keep their instant. All-day values become local midnight in
/// the event's zone, or UTC when Google reports none.
fn instant_from_google(time: &google_calendar::types::EventDateTime) -> Option<ZonedInstant> {
    let zone: Option<Tz> = canonical_zone(&time.time_zone);
    let label = zone.map(|tz| tz.name()).unwrap_or("UTC");

    if let Some(dt) = time.date_time {
        return Some(ZonedInstant::new(dt, label));
    }

    let date = time.date?;
    let midnight = date.and_time(NaiveTime::MIN);
    let instant = match zone {
        Some(tz) => local_to_utc(midnight, tz),
        None => midnight.and_utc(),
    };

    Some(ZonedInstant::new(instant, label))
}
