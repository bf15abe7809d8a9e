//! Google Calendar as a calmirror destination.
//!
//! The access token is used as-is. Obtaining and refreshing it is left to
//! whoever configures calmirror.

mod convert;

use async_trait::async_trait;
use calmirror_core::{
    CalMirrorError, CalMirrorResult, CalendarClient, DestinationEvent, EventPayload, SyncWindow,
};
use google_calendar::Client;
use google_calendar::types::{OrderBy, SendUpdates};

use crate::convert::{FromGoogle, ToGoogle};

pub struct GoogleCalendar {
    client: Client,
}

impl GoogleCalendar {
    pub fn new(access_token: impl Into<String>) -> Self {
        GoogleCalendar {
            client: Client::new(
                String::new(),
                String::new(),
                String::new(),
                access_token.into(),
                String::new(),
            ),
        }
    }
}

#[async_trait]
impl CalendarClient for GoogleCalendar {
    async fn list_events(
        &self,
        calendar_id: &str,
        window: &SyncWindow,
    ) -> CalMirrorResult<Vec<DestinationEvent>> {
        let response = self
            .client
            .events()
            .list_all(
                calendar_id,
                "",
                0,
                OrderBy::StartTime,
                &[],
                "", // search query
                &[],
                false,
                false,
                true, // expand recurring events into instances
                &window.end_rfc3339(),
                &window.start_rfc3339(),
                "",
                "",
            )
            .await
            .map_err(|e| {
                CalMirrorError::DestinationQuery(format!(
                    "Failed to list events on {}: {}",
                    calendar_id, e
                ))
            })?;

        let events: Vec<DestinationEvent> = response
            .body
            .into_iter()
            .filter(|e| e.status != "cancelled" && !e.id.is_empty())
            .map(DestinationEvent::from_google)
            .collect::<Result<_, _>>()?;

        tracing::debug!("Listed {} events on {}", events.len(), calendar_id);

        Ok(events)
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent> {
        let response = self
            .client
            .events()
            .insert(
                calendar_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &payload.to_google(),
            )
            .await
            .map_err(|e| {
                CalMirrorError::Mutation(format!("Failed to create '{}': {}", payload.summary, e))
            })?;

        DestinationEvent::from_google(response.body).map_err(as_mutation)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent> {
        let response = self
            .client
            .events()
            .update(
                calendar_id,
                event_id,
                0,
                0,
                false,
                SendUpdates::None,
                false,
                &payload.to_google(),
            )
            .await
            .map_err(|e| {
                CalMirrorError::Mutation(format!("Failed to update '{}': {}", payload.summary, e))
            })?;

        DestinationEvent::from_google(response.body).map_err(as_mutation)
    }
}

/// A response we cannot read back still counts against the mutation.
fn as_mutation(err: CalMirrorError) -> CalMirrorError {
    match err {
        CalMirrorError::Mutation(_) => err,
        other => CalMirrorError::Mutation(other.to_string()),
    }
}
