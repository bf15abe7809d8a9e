//! In-memory destination calendar.
//!
//! Stands in for a real provider in the engine's unit and whole-run tests.
//! Every mutation is recorded together with the (tokio) time it was issued.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use super::{CalendarClient, EventPayload};
use crate::error::{CalMirrorError, CalMirrorResult};
use crate::event::{DestinationEvent, ZonedInstant};
use crate::window::SyncWindow;

/// A mutation received by [`MemoryCalendar`].
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedMutation {
    Insert {
        calendar_id: String,
        payload: EventPayload,
    },
    Update {
        calendar_id: String,
        event_id: String,
        payload: EventPayload,
    },
}

impl RecordedMutation {
    pub fn payload(&self) -> &EventPayload {
        match self {
            RecordedMutation::Insert { payload, .. } => payload,
            RecordedMutation::Update { payload, .. } => payload,
        }
    }
}

#[derive(Default)]
struct State {
    events: Vec<(String, DestinationEvent)>,
    mutations: Vec<(Instant, RecordedMutation)>,
    next_id: usize,
}

#[derive(Default)]
pub struct MemoryCalendar {
    state: Mutex<State>,
    failing_summaries: HashSet<String>,
    fail_queries: bool,
}

impl MemoryCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an event on `calendar_id`.
    pub fn with_event(self, calendar_id: &str, event: DestinationEvent) -> Self {
        self.lock().events.push((calendar_id.to_string(), event));
        self
    }

    /// Reject any mutation whose payload summary is `summary`.
    pub fn failing_on(mut self, summary: &str) -> Self {
        self.failing_summaries.insert(summary.to_string());
        self
    }

    /// Reject every `list_events` call.
    pub fn failing_queries(mut self) -> Self {
        self.fail_queries = true;
        self
    }

    pub fn events(&self, calendar_id: &str) -> Vec<DestinationEvent> {
        self.lock()
            .events
            .iter()
            .filter(|(cal, _)| cal == calendar_id)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn mutations(&self) -> Vec<RecordedMutation> {
        self.lock().mutations.iter().map(|(_, m)| m.clone()).collect()
    }

    /// Times at which each mutation was received, in order.
    pub fn mutation_times(&self) -> Vec<Instant> {
        self.lock().mutations.iter().map(|(at, _)| *at).collect()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means another test thread panicked
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_mutation(&self, payload: &EventPayload) -> CalMirrorResult<()> {
        if self.failing_summaries.contains(&payload.summary) {
            return Err(CalMirrorError::Mutation(format!(
                "rejected '{}'",
                payload.summary
            )));
        }
        Ok(())
    }
}

fn event_from_payload(id: String, payload: &EventPayload) -> DestinationEvent {
    DestinationEvent {
        id,
        summary: payload.summary.clone(),
        start: ZonedInstant::new(payload.start.date_time, payload.start.time_zone.clone()),
        end: ZonedInstant::new(payload.end.date_time, payload.end.time_zone.clone()),
        color_tag: Some(payload.color_tag.clone()).filter(|c| !c.is_empty()),
        location: payload.location.clone(),
    }
}

#[async_trait]
impl CalendarClient for MemoryCalendar {
    async fn list_events(
        &self,
        calendar_id: &str,
        window: &SyncWindow,
    ) -> CalMirrorResult<Vec<DestinationEvent>> {
        if self.fail_queries {
            return Err(CalMirrorError::DestinationQuery(format!(
                "cannot read calendar '{}'",
                calendar_id
            )));
        }

        Ok(self
            .lock()
            .events
            .iter()
            .filter(|(cal, e)| {
                cal == calendar_id
                    && e.start.instant < window.end
                    && e.end.instant > window.start
            })
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn insert_event(
        &self,
        calendar_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent> {
        let mut state = self.lock();
        state.mutations.push((
            Instant::now(),
            RecordedMutation::Insert {
                calendar_id: calendar_id.to_string(),
                payload: payload.clone(),
            },
        ));
        self.check_mutation(payload)?;

        state.next_id += 1;
        let event = event_from_payload(format!("mem-{}", state.next_id), payload);
        state.events.push((calendar_id.to_string(), event.clone()));
        Ok(event)
    }

    async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        payload: &EventPayload,
    ) -> CalMirrorResult<DestinationEvent> {
        let mut state = self.lock();
        state.mutations.push((
            Instant::now(),
            RecordedMutation::Update {
                calendar_id: calendar_id.to_string(),
                event_id: event_id.to_string(),
                payload: payload.clone(),
            },
        ));
        self.check_mutation(payload)?;

        let slot = state
            .events
            .iter_mut()
            .find(|(cal, e)| cal == calendar_id && e.id == event_id)
            .ok_or_else(|| CalMirrorError::Mutation(format!("no event '{}'", event_id)))?;

        slot.1 = event_from_payload(event_id.to_string(), payload);
        Ok(slot.1.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::PayloadTime;
    use chrono::{TimeZone, Utc};

    fn payload(summary: &str, h: u32) -> EventPayload {
        let at = |h| PayloadTime {
            date_time: Utc.with_ymd_and_hms(2025, 3, 20, h, 0, 0).unwrap(),
            time_zone: "UTC".into(),
        };
        EventPayload {
            summary: summary.into(),
            start: at(h),
            end: at(h + 1),
            location: None,
            color_tag: "8".into(),
        }
    }

    fn day() -> SyncWindow {
        SyncWindow::new(
            Utc.with_ymd_and_hms(2025, 3, 20, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 3, 21, 0, 0, 0).unwrap(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_insert_then_list() {
        let calendar = MemoryCalendar::new();
        calendar.insert_event("primary", &payload("Lecture", 9)).await.unwrap();

        let listed = calendar.list_events("primary", &day()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].summary, "Lecture");
        assert!(listed[0].has_color("8"));

        assert!(calendar.list_events("other", &day()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_event() {
        let calendar = MemoryCalendar::new();
        let created = calendar.insert_event("primary", &payload("Lecture", 9)).await.unwrap();

        calendar
            .update_event("primary", &created.id, &payload("Canceled: Lecture", 9))
            .await
            .unwrap();

        let events = calendar.events("primary");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Canceled: Lecture");
    }

    #[tokio::test]
    async fn test_failing_summary_is_recorded_but_rejected() {
        let calendar = MemoryCalendar::new().failing_on("Lecture");
        let err = calendar
            .insert_event("primary", &payload("Lecture", 9))
            .await
            .unwrap_err();

        assert!(matches!(err, CalMirrorError::Mutation(_)));
        assert_eq!(calendar.mutations().len(), 1);
        assert!(calendar.events("primary").is_empty());
    }
}
