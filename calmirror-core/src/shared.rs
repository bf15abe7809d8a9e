//! Reading the optional shared calendar as a second event source.

use crate::destination::CalendarClient;
use crate::error::CalMirrorResult;
use crate::event::{DestinationEvent, NormalizedEvent, SourceTag};
use crate::window::SyncWindow;

/// Read `calendar_id` over `window` and map its events into the normalized
/// shape. With no shared calendar configured this is an empty set.
///
/// A failed read is a `DestinationQuery` error and aborts the run.
pub async fn fetch_shared_events(
    client: &dyn CalendarClient,
    calendar_id: Option<&str>,
    window: &SyncWindow,
) -> CalMirrorResult<Vec<NormalizedEvent>> {
    let Some(calendar_id) = calendar_id else {
        return Ok(Vec::new());
    };

    let events = client.list_events(calendar_id, window).await?;
    let total = events.len();

    let normalized: Vec<NormalizedEvent> = events.into_iter().filter_map(to_normalized).collect();

    tracing::info!(
        "Read {} events from shared calendar {} ({} usable)",
        total,
        calendar_id,
        normalized.len()
    );

    Ok(normalized)
}

fn to_normalized(event: DestinationEvent) -> Option<NormalizedEvent> {
    let summary = event.summary.clone();
    let normalized = NormalizedEvent::new(
        event.summary,
        event.start,
        event.end,
        event.location,
        SourceTag::Shared,
    );

    if normalized.is_none() {
        tracing::debug!("Ignoring shared event '{}' with no duration", summary);
    }
    normalized
}
