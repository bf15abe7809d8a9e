//! Calendar sync engine for calmirror.
//!
//! Mirrors an ICS feed (plus, optionally, a shared calendar) into a
//! destination calendar:
//! - `ics` and `recurrence` turn the feed into concrete occurrences
//! - `timezone` pins every occurrence to an instant and a zone
//! - `filter` and `plan` decide what to insert and what to cancel
//! - `apply` writes the plan out, one rate-limited mutation at a time
//!
//! [`engine::SyncEngine`] ties these together for a single run. The
//! destination calendar and the feed are passed in as trait objects
//! ([`destination::CalendarClient`], [`feed::FeedSource`]).

pub mod apply;
pub mod config;
pub mod destination;
pub mod engine;
pub mod error;
pub mod event;
pub mod feed;
pub mod filter;
pub mod ics;
pub mod plan;
pub mod recurrence;
pub mod shared;
pub mod timezone;
pub mod window;

pub use apply::{ApplyReport, MutationFailure};
pub use config::{Settings, SyncOptions};
pub use destination::{CalendarClient, EventPayload, PayloadTime};
pub use engine::{PreparedRun, RunOutcome, SyncEngine};
pub use error::{CalMirrorError, CalMirrorResult};
pub use event::*;
pub use feed::{FeedSource, HttpFeed};
pub use plan::{ActionKind, SyncAction, SyncPlan};
pub use window::SyncWindow;
