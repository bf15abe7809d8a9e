//! One sync run, start to finish.
//!
//! ```text
//! feed ──fetch──parse──expand──normalize─┐
//!                                        ├─ filter ── reconcile ── apply
//! shared calendar ──read─────────────────┘     (against one destination snapshot)
//! ```
//!
//! The feed and shared-calendar branches are independent and run
//! concurrently. Any error before the apply phase aborts the run with nothing
//! written.

use chrono::{DateTime, Utc};

use crate::apply::{Applier, ApplyReport};
use crate::config::SyncOptions;
use crate::destination::CalendarClient;
use crate::error::CalMirrorResult;
use crate::event::{DestinationEvent, NormalizedEvent};
use crate::feed::FeedSource;
use crate::filter::EventFilter;
use crate::ics::parse_feed;
use crate::plan::{SyncPlan, reconcile};
use crate::recurrence::expand_feed;
use crate::shared::fetch_shared_events;
use crate::timezone::Normalizer;
use crate::window::{RunWindows, SyncWindow};

/// Everything computed before any mutation is issued.
#[derive(Debug, Clone)]
pub struct PreparedRun {
    pub windows: RunWindows,
    pub unique: Vec<NormalizedEvent>,
    pub snapshot: Vec<DestinationEvent>,
    pub plan: SyncPlan,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub prepared: PreparedRun,
    pub report: ApplyReport,
}

pub struct SyncEngine<'a> {
    client: &'a dyn CalendarClient,
    feed: &'a dyn FeedSource,
    options: &'a SyncOptions,
}

impl<'a> SyncEngine<'a> {
    pub fn new(
        client: &'a dyn CalendarClient,
        feed: &'a dyn FeedSource,
        options: &'a SyncOptions,
    ) -> Self {
        SyncEngine {
            client,
            feed,
            options,
        }
    }

    /// Compute the plan for a run at `now` without changing anything.
    pub async fn prepare(&self, now: DateTime<Utc>) -> CalMirrorResult<PreparedRun> {
        let windows = RunWindows::for_run(now, self.options)?;
        tracing::info!(
            "Sync window {} to {}, ingesting {} to {}",
            windows.fetch.start_rfc3339(),
            windows.fetch.end_rfc3339(),
            windows.ingest.start_rfc3339(),
            windows.ingest.end_rfc3339()
        );

        let (feed_events, shared_events) = tokio::try_join!(
            self.feed_events(&windows.fetch),
            fetch_shared_events(
                self.client,
                self.options.shared_calendar_id.as_deref(),
                &windows.fetch
            ),
        )?;

        let mut merged = feed_events;
        merged.extend(shared_events);

        let unique = EventFilter::new(windows.ingest, &self.options.skip_events).apply(merged);

        // The provider returns everything overlapping the window; reconcile
        // only against events that start inside it, like the unique set.
        let listed = self
            .client
            .list_events(&self.options.calendar_id, &windows.ingest)
            .await?;
        let listed_count = listed.len();
        let snapshot: Vec<DestinationEvent> = listed
            .into_iter()
            .filter(|e| windows.ingest.contains(e.start.instant))
            .collect();
        tracing::info!(
            "Destination calendar {} has {} events starting in the window ({} overlapping)",
            self.options.calendar_id,
            snapshot.len(),
            listed_count
        );

        let plan = reconcile(&unique, &snapshot, &self.options.sync_color_tag);

        Ok(PreparedRun {
            windows,
            unique,
            snapshot,
            plan,
        })
    }

    /// Run a full sync at `now`. Only pre-apply failures are returned as
    /// errors; mutation failures end up in the report.
    pub async fn run(&self, now: DateTime<Utc>) -> CalMirrorResult<RunOutcome> {
        let prepared = self.prepare(now).await?;
        let report = Applier::new(self.client, self.options)
            .apply(&prepared.plan)
            .await;

        Ok(RunOutcome { prepared, report })
    }

    async fn feed_events(&self, window: &SyncWindow) -> CalMirrorResult<Vec<NormalizedEvent>> {
        let content = self.feed.fetch().await?;
        let doc = parse_feed(&content)?;

        let normalizer = Normalizer::for_run(self.options, doc.origin_zone.as_deref());
        let occurrences = expand_feed(&doc, window, self.options.max_expansions, &normalizer)?;

        let events: Vec<NormalizedEvent> = occurrences
            .iter()
            .filter_map(|o| normalizer.normalize(o))
            .collect();

        tracing::info!(
            "Expanded {} feed events into {} occurrences",
            doc.events.len(),
            events.len()
        );

        Ok(events)
    }
}
