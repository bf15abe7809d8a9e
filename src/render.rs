//! Colored terminal rendering for plans and apply reports.

use calmirror_core::{ActionKind, ApplyReport, SyncAction, SyncPlan, ZonedInstant};
use chrono_tz::Tz;
use owo_colors::OwoColorize;

pub trait Render {
    fn render(&self) -> String;
}

impl Render for ActionKind {
    fn render(&self) -> String {
        let symbol = self.symbol();
        match self {
            ActionKind::Insert => symbol.green().to_string(),
            ActionKind::Cancel => symbol.red().to_string(),
            ActionKind::Skip => symbol.dimmed().to_string(),
        }
    }
}

fn colorize(kind: ActionKind, text: &str) -> String {
    match kind {
        ActionKind::Insert => text.green().to_string(),
        ActionKind::Cancel => text.red().to_string(),
        ActionKind::Skip => text.dimmed().to_string(),
    }
}

/// Start time in the event's own zone, e.g. "Thu Mar 20 09:00".
fn render_time(time: &ZonedInstant) -> String {
    match time.zone.parse::<Tz>() {
        Ok(tz) => time.instant.with_timezone(&tz).format("%a %b %-d %H:%M").to_string(),
        Err(_) => time.instant.format("%a %b %-d %H:%M UTC").to_string(),
    }
}

impl Render for SyncAction {
    fn render(&self) -> String {
        let kind = self.kind();
        let (text, time) = match self {
            SyncAction::Insert(event) => (event.summary.clone(), Some(render_time(&event.start))),
            SyncAction::Cancel(event) => (event.summary.clone(), Some(render_time(&event.start))),
            SyncAction::Skip(reason) => (reason.to_string(), None),
        };

        match time {
            Some(time) => format!("{} {} {}", kind.render(), colorize(kind, &text), time.dimmed()),
            None => format!("{} {}", kind.render(), colorize(kind, &text)),
        }
    }
}

/// Above this many actions of one kind, show a count instead of each action
const COMPACT_THRESHOLD: usize = 5;

fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{}s", word)
    }
}

pub trait PlanRender {
    fn render(&self, verbose: bool) -> String;
}

impl PlanRender for SyncPlan {
    fn render(&self, verbose: bool) -> String {
        let mut lines = Vec::new();

        for (kind, label) in [
            (ActionKind::Cancel, "canceled"),
            (ActionKind::Insert, "new"),
            (ActionKind::Skip, "unchanged"),
        ] {
            let count = self.count(kind);
            if count == 0 || (kind == ActionKind::Skip && !verbose) {
                continue;
            }

            if verbose || count <= COMPACT_THRESHOLD {
                lines.extend(
                    self.actions
                        .iter()
                        .filter(|a| a.kind() == kind)
                        .map(|a| format!("   {}", a.render())),
                );
            } else {
                let text = format!("({} {} {})", count, label, pluralize("event", count));
                lines.push(format!("   {} {}", kind.render(), colorize(kind, &text)));
            }
        }

        if self.is_empty() && lines.is_empty() {
            return "   Calendar is up to date".dimmed().to_string();
        }

        lines.join("\n")
    }
}

impl Render for ApplyReport {
    fn render(&self) -> String {
        let mut lines = vec![format!(
            "Applied: {} succeeded, {} failed, {} unchanged",
            self.succeeded.green(),
            if self.failed > 0 {
                self.failed.red().to_string()
            } else {
                self.failed.to_string()
            },
            self.skipped
        )];

        for failure in &self.failures {
            lines.push(format!(
                "   {} {} {}",
                failure.kind.render(),
                failure.summary,
                failure.error.red()
            ));
        }

        lines.join("\n")
    }
}
