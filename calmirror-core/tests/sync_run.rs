//! Whole-run tests: feed text in, destination calendar state out.

use calmirror_core::destination::memory::{MemoryCalendar, RecordedMutation};
use calmirror_core::feed::StaticFeed;
use calmirror_core::{
    ActionKind, DestinationEvent, Settings, SourceTag, SyncEngine, SyncOptions, ZonedInstant,
};
use chrono::{DateTime, TimeZone, Utc};

/// 2025-03-20 08:00 in Phoenix. The sync window runs from 2025-03-20 05:00
/// to 2025-03-21 23:59 Phoenix time (12:00Z to 06:59Z two days later).
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap()
}

fn options(extra: &str) -> SyncOptions {
    Settings::from_toml(&format!(
        "icsCalendarUrl = \"https://example.com/feed.ics\"\nbase_delay_ms = 0\n{}",
        extra
    ))
    .unwrap()
    .resolve()
    .unwrap()
}

fn feed(events: &[&str]) -> StaticFeed {
    let mut doc = String::from("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//Test//EN\r\n");
    for event in events {
        doc.push_str("BEGIN:VEVENT\r\n");
        for line in event.lines().map(str::trim).filter(|l| !l.is_empty()) {
            doc.push_str(line);
            doc.push_str("\r\n");
        }
        doc.push_str("END:VEVENT\r\n");
    }
    doc.push_str("END:VCALENDAR\r\n");
    StaticFeed(doc)
}

fn utc(d: u32, h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, d, h, m, 0).unwrap()
}

fn synced(id: &str, summary: &str, color: &str) -> DestinationEvent {
    DestinationEvent {
        id: id.into(),
        summary: summary.into(),
        start: ZonedInstant::new(utc(20, 16, 0), "America/Phoenix"),
        end: ZonedInstant::new(utc(20, 17, 0), "America/Phoenix"),
        color_tag: Some(color.into()),
        location: None,
    }
}

const LECTURE: &str = "
    UID:lecture-1
    SUMMARY:Lecture
    DTSTART:20250320T160000Z
    DTEND:20250320T170000Z
";

#[tokio::test]
async fn test_new_feed_event_is_inserted() {
    let opts = options("");
    let client = MemoryCalendar::new();
    let feed = feed(&[LECTURE]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let kinds: Vec<ActionKind> = outcome.prepared.plan.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![ActionKind::Insert]);
    assert_eq!(outcome.report.succeeded, 1);

    let events = client.events("primary");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, "Lecture");
    assert_eq!(events[0].start.instant, utc(20, 16, 0));
    assert_eq!(events[0].color_tag.as_deref(), Some("8"));
}

#[tokio::test]
async fn test_single_and_recurring_copies_dedup_to_one() {
    let opts = options("");
    let client = MemoryCalendar::new();
    let feed = feed(&[
        LECTURE,
        "
        UID:lecture-series
        SUMMARY:Lecture
        DTSTART:20250320T160000Z
        DTEND:20250320T170000Z
        RRULE:FREQ=WEEKLY;COUNT=4
        ",
    ]);

    let prepared = SyncEngine::new(&client, &feed, &opts).prepare(now()).await.unwrap();

    assert_eq!(prepared.unique.len(), 1);
    assert_eq!(prepared.unique[0].summary, "Lecture");
    assert_eq!(prepared.plan.inserts().count(), 1);
}

#[tokio::test]
async fn test_event_gone_from_feed_is_canceled() {
    let opts = options("");
    let client = MemoryCalendar::new()
        .with_event("primary", synced("evt-1", "Lecture", "8"))
        .with_event("primary", synced("evt-2", "Dentist", "3"));
    let feed = feed(&["
        UID:lab-1
        SUMMARY:Lab
        DTSTART:20250320T200000Z
        DTEND:20250320T210000Z
    "]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let kinds: Vec<ActionKind> = outcome.prepared.plan.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![ActionKind::Cancel, ActionKind::Insert]);

    let events = client.events("primary");
    let summaries: Vec<&str> = events.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(summaries, vec!["Canceled: Lecture", "Dentist", "Lab"]);
    assert_eq!(events[0].start.instant, utc(20, 16, 0));
}

#[tokio::test]
async fn test_skip_phrase_excludes_event_entirely() {
    let opts = options("skipEvents = [\"office\"]");
    let client = MemoryCalendar::new();
    let feed = feed(&[
        LECTURE,
        "
        UID:oh-1
        SUMMARY:Office Hours
        DTSTART:20250320T180000Z
        DTEND:20250320T190000Z
        ",
    ]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    assert!(outcome.prepared.plan.actions.iter().all(|a| a.summary() != "Office Hours"));
    assert_eq!(client.events("primary").len(), 1);
}

#[tokio::test]
async fn test_floating_time_from_known_origin_is_corrected() {
    let opts = options("[floating]\norigin = \"India Standard Time\"");
    let client = MemoryCalendar::new();
    let feed = feed(&["
        UID:float-1
        SUMMARY:Guest talk
        DTSTART:20250321T140000
        DTEND:20250321T150000
    "]);

    SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let mutations = client.mutations();
    assert_eq!(mutations.len(), 1);
    let payload = mutations[0].payload();
    assert_eq!(payload.start.date_time, utc(21, 8, 30));
    assert_eq!(payload.start.time_zone, "America/Phoenix");
    assert_eq!(payload.end.date_time, utc(21, 9, 30));
}

#[tokio::test]
async fn test_second_run_changes_nothing() {
    let opts = options("");
    let client = MemoryCalendar::new();
    let feed = feed(&[
        LECTURE,
        "
        UID:lab-series
        SUMMARY:Lab
        DTSTART:20250320T200000Z
        DTEND:20250320T210000Z
        RRULE:FREQ=DAILY;COUNT=3
        ",
    ]);
    let engine = SyncEngine::new(&client, &feed, &opts);

    let first = engine.run(now()).await.unwrap();
    assert_eq!(first.report.succeeded, 3);

    let second = engine.run(now()).await.unwrap();
    assert!(second.prepared.plan.is_empty());
    assert_eq!(second.report.succeeded, 0);
    assert_eq!(client.events("primary").len(), 3);
}

#[tokio::test]
async fn test_renamed_event_cancels_old_and_inserts_new() {
    let opts = options("");
    let client = MemoryCalendar::new().with_event("primary", synced("evt-1", "Lecture", "8"));
    let feed = feed(&["
        UID:lecture-1
        SUMMARY:Lecture (Room change)
        DTSTART:20250320T160000Z
        DTEND:20250320T170000Z
    "]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let kinds: Vec<ActionKind> = outcome.prepared.plan.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![ActionKind::Cancel, ActionKind::Insert]);
}

#[tokio::test]
async fn test_shared_calendar_events_are_mirrored_with_their_own_tag() {
    let opts = options("shared_calendar_id = \"team\"");
    let client = MemoryCalendar::new().with_event("team", synced("t-1", "Team sync", "1"));
    let feed = feed(&[LECTURE]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let sources: Vec<SourceTag> = outcome.prepared.unique.iter().map(|e| e.source).collect();
    assert_eq!(sources, vec![SourceTag::Feed, SourceTag::Shared]);

    let primary = client.events("primary");
    let team_copy = primary.iter().find(|e| e.summary == "Team sync").unwrap();
    assert_eq!(team_copy.color_tag.as_deref(), Some("7"));

    // The shared copy never looks like an engine-owned feed event.
    let rerun = SyncEngine::new(&client, &feed, &opts).prepare(now()).await.unwrap();
    assert_eq!(rerun.plan.cancels().count(), 0);
}

#[tokio::test]
async fn test_mutation_failure_is_isolated() {
    let opts = options("");
    let client = MemoryCalendar::new().failing_on("Lecture");
    let feed = feed(&[
        LECTURE,
        "
        UID:lab-1
        SUMMARY:Lab
        DTSTART:20250320T200000Z
        DTEND:20250320T210000Z
        ",
    ]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    assert_eq!(outcome.report.succeeded, 1);
    assert_eq!(outcome.report.failed, 1);
    assert_eq!(outcome.report.failures[0].summary, "Lecture");

    let inserted: Vec<String> = client
        .mutations()
        .iter()
        .filter_map(|m| match m {
            RecordedMutation::Insert { payload, .. } => Some(payload.summary.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(inserted, vec!["Lecture", "Lab"]);
    assert_eq!(client.events("primary").len(), 1);
}

#[tokio::test]
async fn test_ingest_window_narrows_what_is_synced() {
    let opts = options("syncDays = 3\n[window]\ningest_until = \"07:00\"");
    let client = MemoryCalendar::new();
    let feed = feed(&[
        LECTURE,
        "
        UID:later
        SUMMARY:Later lecture
        DTSTART:20250322T160000Z
        DTEND:20250322T170000Z
        ",
    ]);

    let prepared = SyncEngine::new(&client, &feed, &opts).prepare(now()).await.unwrap();

    let summaries: Vec<&str> = prepared.unique.iter().map(|e| e.summary.as_str()).collect();
    assert_eq!(summaries, vec!["Lecture"]);
}

fn synced_between(
    id: &str,
    summary: &str,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> DestinationEvent {
    DestinationEvent {
        start: ZonedInstant::new(start, "America/Phoenix"),
        end: ZonedInstant::new(end, "America/Phoenix"),
        ..synced(id, summary, "8")
    }
}

#[tokio::test]
async fn test_event_on_window_start_is_left_alone() {
    // Inserted by yesterday's run, now sitting exactly on today's 05:00 boundary
    let opts = options("");
    let client = MemoryCalendar::new().with_event(
        "primary",
        synced_between("evt-1", "Early Lecture", utc(20, 12, 0), utc(20, 13, 0)),
    );
    let feed = feed(&["
        UID:early-1
        SUMMARY:Early Lecture
        DTSTART:20250320T120000Z
        DTEND:20250320T130000Z
    "]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    assert!(outcome.prepared.unique.is_empty());
    assert!(outcome.prepared.snapshot.is_empty());
    assert_eq!(outcome.prepared.plan.mutation_count(), 0);
    assert!(client.mutations().is_empty());
    assert_eq!(client.events("primary")[0].summary, "Early Lecture");
}

#[tokio::test]
async fn test_event_spanning_into_window_is_not_canceled() {
    let opts = options("");
    let client = MemoryCalendar::new().with_event(
        "primary",
        synced_between("evt-1", "Night shift", utc(20, 9, 0), utc(20, 14, 0)),
    );
    let feed = feed(&[LECTURE]);

    let outcome = SyncEngine::new(&client, &feed, &opts).run(now()).await.unwrap();

    let kinds: Vec<ActionKind> = outcome.prepared.plan.actions.iter().map(|a| a.kind()).collect();
    assert_eq!(kinds, vec![ActionKind::Insert]);

    let summaries: Vec<String> = client
        .events("primary")
        .into_iter()
        .map(|e| e.summary)
        .collect();
    assert_eq!(summaries, vec!["Night shift", "Lecture"]);
}
