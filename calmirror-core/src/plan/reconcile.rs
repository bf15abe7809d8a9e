//! Plan computation: unique event set vs. destination snapshot.

use std::collections::HashSet;

use crate::event::{DestinationEvent, NormalizedEvent};
use crate::plan::{CANCEL_PREFIX, SkipReason, SyncAction, SyncPlan};

/// Compute the plan for one run.
///
/// Matching is by summary alone: a unique event is already present when any
/// snapshot event has the same summary, wherever it is scheduled. A snapshot
/// event is canceled only when it carries `sync_tag`, is not already a
/// cancellation marker, and no unique event has its summary.
///
/// The result depends only on the inputs and their order.
pub fn reconcile(
    unique: &[NormalizedEvent],
    snapshot: &[DestinationEvent],
    sync_tag: &str,
) -> SyncPlan {
    let wanted: HashSet<&str> = unique.iter().map(|e| e.summary.as_str()).collect();
    let present: HashSet<&str> = snapshot.iter().map(|e| e.summary.as_str()).collect();

    let cancels = snapshot
        .iter()
        .filter(|e| e.has_color(sync_tag))
        .filter(|e| !e.summary.starts_with(CANCEL_PREFIX))
        .filter(|e| !wanted.contains(e.summary.as_str()))
        .map(|e| SyncAction::Cancel(e.clone()));

    let mut inserts = Vec::new();
    let mut skips = Vec::new();
    for event in unique {
        if present.contains(event.summary.as_str()) {
            skips.push(SyncAction::Skip(SkipReason::AlreadyPresent {
                summary: event.summary.clone(),
            }));
        } else {
            inserts.push(SyncAction::Insert(event.clone()));
        }
    }

    let actions: Vec<SyncAction> = cancels.chain(inserts).chain(skips).collect();
    let plan = SyncPlan { actions };

    tracing::info!(
        "Plan: {} to cancel, {} to insert, {} already present",
        plan.cancels().count(),
        plan.inserts().count(),
        plan.skips().count()
    );

    plan
}
