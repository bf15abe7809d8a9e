use serde::{Deserialize, Serialize};

use crate::event::{DestinationEvent, NormalizedEvent};
use crate::plan::{ActionKind, SkipReason, SyncAction};

/// The ordered actions computed for one run: every cancel, then every
/// insert, then the skips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncPlan {
    pub actions: Vec<SyncAction>,
}

impl SyncPlan {
    pub fn inserts(&self) -> impl Iterator<Item = &NormalizedEvent> {
        self.actions.iter().filter_map(|a| match a {
            SyncAction::Insert(event) => Some(event),
            _ => None,
        })
    }

    pub fn cancels(&self) -> impl Iterator<Item = &DestinationEvent> {
        self.actions.iter().filter_map(|a| match a {
            SyncAction::Cancel(event) => Some(event),
            _ => None,
        })
    }

    pub fn skips(&self) -> impl Iterator<Item = &SkipReason> {
        self.actions.iter().filter_map(|a| match a {
            SyncAction::Skip(reason) => Some(reason),
            _ => None,
        })
    }

    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }

    /// Number of actions that call the destination calendar.
    pub fn mutation_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_mutation()).count()
    }

    /// True when applying the plan would change nothing.
    pub fn is_empty(&self) -> bool {
        self.mutation_count() == 0
    }
}
