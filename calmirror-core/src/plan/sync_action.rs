use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{DestinationEvent, NormalizedEvent};
use crate::plan::ActionKind;

/// Why an event needs no mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SkipReason {
    /// The destination already has an event with this summary.
    AlreadyPresent { summary: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::AlreadyPresent { summary } => write!(f, "{} (already on calendar)", summary),
        }
    }
}

/// One step of a [`SyncPlan`](crate::plan::SyncPlan).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncAction {
    /// Create the event on the destination calendar.
    Insert(NormalizedEvent),
    /// Rewrite the event's summary with the cancellation prefix, keeping its time.
    Cancel(DestinationEvent),
    Skip(SkipReason),
}

impl SyncAction {
    pub fn kind(&self) -> ActionKind {
        match self {
            SyncAction::Insert(_) => ActionKind::Insert,
            SyncAction::Cancel(_) => ActionKind::Cancel,
            SyncAction::Skip(_) => ActionKind::Skip,
        }
    }

    /// Summary of the event the action targets.
    pub fn summary(&self) -> &str {
        match self {
            SyncAction::Insert(event) => &event.summary,
            SyncAction::Cancel(event) => &event.summary,
            SyncAction::Skip(SkipReason::AlreadyPresent { summary }) => summary,
        }
    }

    /// Whether applying this action calls the destination calendar.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, SyncAction::Skip(_))
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncAction::Skip(reason) => write!(f, "{}: {}", self.kind(), reason),
            _ => write!(f, "{}: {}", self.kind(), self.summary()),
        }
    }
}
