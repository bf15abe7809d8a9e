//! Reconciliation plans.

mod action_kind;
mod reconcile;
mod sync_action;
mod sync_plan;

pub use action_kind::ActionKind;
pub use reconcile::reconcile;
pub use sync_action::{SkipReason, SyncAction};
pub use sync_plan::SyncPlan;

/// Prepended to the summary of a synced event that left the feed.
pub const CANCEL_PREFIX: &str = "Canceled: ";
