//! Executing a plan against the destination calendar.
//!
//! Mutations go out one at a time, at least `base_delay_ms` apart, to stay
//! under the provider's rate limits. A failed mutation is logged and counted,
//! and the rest of the plan still runs. Nothing is retried within a run.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::SyncOptions;
use crate::destination::{CalendarClient, EventPayload};
use crate::error::CalMirrorResult;
use crate::event::SourceTag;
use crate::plan::{ActionKind, CANCEL_PREFIX, SyncAction, SyncPlan};

/// A single mutation that did not go through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationFailure {
    pub kind: ActionKind,
    pub summary: String,
    pub error: String,
}

/// Outcome of applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<MutationFailure>,
}

impl ApplyReport {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

pub struct Applier<'a> {
    client: &'a dyn CalendarClient,
    options: &'a SyncOptions,
}

impl<'a> Applier<'a> {
    pub fn new(client: &'a dyn CalendarClient, options: &'a SyncOptions) -> Self {
        Applier { client, options }
    }

    pub async fn apply(&self, plan: &SyncPlan) -> ApplyReport {
        let mut report = ApplyReport::default();
        let mut pacing = self.pacing();

        for action in &plan.actions {
            if !action.is_mutation() {
                report.skipped += 1;
                continue;
            }

            if let Some(interval) = pacing.as_mut() {
                interval.tick().await;
            }

            match self.apply_one(action).await {
                Ok(()) => {
                    tracing::debug!("Applied {}", action);
                    report.succeeded += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to {} '{}': {}", action.kind(), action.summary(), e);
                    report.failed += 1;
                    report.failures.push(MutationFailure {
                        kind: action.kind(),
                        summary: action.summary().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "Applied plan: {} succeeded, {} failed, {} skipped",
            report.succeeded,
            report.failed,
            report.skipped
        );

        report
    }

    /// Minimum spacing between mutations. The first tick fires immediately.
    fn pacing(&self) -> Option<Interval> {
        if self.options.base_delay_ms == 0 {
            return None;
        }

        let mut interval = tokio::time::interval(Duration::from_millis(self.options.base_delay_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(interval)
    }

    async fn apply_one(&self, action: &SyncAction) -> CalMirrorResult<()> {
        let calendar_id = self.options.calendar_id.as_str();

        match action {
            SyncAction::Insert(event) => {
                let color_tag = match event.source {
                    SourceTag::Feed => &self.options.sync_color_tag,
                    SourceTag::Shared => &self.options.shared_color_tag,
                };
                let payload = EventPayload::for_insert(
                    event,
                    color_tag,
                    self.options.fallback_location.as_deref(),
                );
                self.client.insert_event(calendar_id, &payload).await?;
            }
            SyncAction::Cancel(event) => {
                let payload = EventPayload::for_cancel(event, CANCEL_PREFIX);
                self.client
                    .update_event(calendar_id, &event.id, &payload)
                    .await?;
            }
            SyncAction::Skip(_) => {}
        }

        Ok(())
    }
}
