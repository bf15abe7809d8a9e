//! The destination calendar as seen by the engine.
//!
//! The engine only needs three operations from the calendar provider: list
//! events in a window, insert an event, and update an event. Providers
//! implement [`CalendarClient`] and are passed in explicitly, so nothing here
//! holds on to a global client or credential.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CalMirrorResult;
use crate::event::{DestinationEvent, NormalizedEvent, ZonedInstant};
use crate::window::SyncWindow;

/// Calendar provider capability consumed by the engine.
#[async_trait]
pub trait CalendarClient: Send + Sync {
    /// List events on `calendar_id` overlapping `window`, as single
    /// (already expanded) instances. Failures are `DestinationQuery` errors.
    async fn list_events(
        &self,
        calendar_id: &str,
        window: &SyncWindow,
    ) -> CalMirrorResult<Vec<DestinationEvent>>;

    /// Create an event. Failures are `Mutation` errors.
    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent>;

    /// Replace an existing event. Failures are `Mutation` errors.
    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent>;
}

/// Start or end of an event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadTime {
    pub date_time: DateTime<Utc>,
    pub time_zone: String,
}

impl From<&ZonedInstant> for PayloadTime {
    fn from(zoned: &ZonedInstant) -> Self {
        PayloadTime {
            date_time: zoned.instant,
            time_zone: zoned.zone.clone(),
        }
    }
}

/// Body of an insert or update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPayload {
    pub summary: String,
    pub start: PayloadTime,
    pub end: PayloadTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub color_tag: String,
}

impl EventPayload {
    /// Payload creating `event`, tagged with `color_tag`. Events without a
    /// location get `fallback_location`.
    pub fn for_insert(
        event: &NormalizedEvent,
        color_tag: &str,
        fallback_location: Option<&str>,
    ) -> Self {
        EventPayload {
            summary: event.summary.clone(),
            start: PayloadTime::from(&event.start),
            end: PayloadTime::from(&event.end),
            location: event
                .location
                .clone()
                .or_else(|| fallback_location.map(str::to_string)),
            color_tag: color_tag.to_string(),
        }
    }

    /// Payload marking `event` as canceled: same times, summary prefixed.
    pub fn for_cancel(event: &DestinationEvent, prefix: &str) -> Self {
        EventPayload {
            summary: format!("{}{}", prefix, event.summary),
            start: PayloadTime::from(&event.start),
            end: PayloadTime::from(&event.end),
            location: event.location.clone(),
            color_tag: event.color_tag.clone().unwrap_or_default(),
        }
    }
}
