//! Sync configuration.
//!
//! Settings live in `~/.config/calmirror/config.toml`. Secrets (the destination
//! access token and the opaque feed credential) may instead come from the
//! environment so they never have to be written to disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::Deserialize;
use url::Url;

use crate::error::{CalMirrorError, CalMirrorResult};

pub const DEFAULT_SYNC_DAYS: i64 = 1;
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
pub const DEFAULT_MAX_EXPANSIONS: u16 = 100;
pub const DEFAULT_ZONE: &str = "America/Phoenix";
pub const DEFAULT_SYNC_COLOR_TAG: &str = "8";
pub const DEFAULT_SHARED_COLOR_TAG: &str = "7";

/// Largest accepted `sync_days`.
pub const MAX_SYNC_DAYS: i64 = 3660;
/// Largest accepted floating correction, in either direction.
pub const MAX_FLOATING_OFFSET_MINUTES: i64 = 24 * 60;

const ENV_ACCESS_TOKEN: &str = "CALMIRROR_GOOGLE_ACCESS_TOKEN";
const ENV_FEED_CREDENTIAL: &str = "CALMIRROR_FEED_CREDENTIAL";
const ENV_FEED_URL: &str = "CALMIRROR_ICS_CALENDAR_URL";

fn default_sync_days() -> i64 {
    DEFAULT_SYNC_DAYS
}

fn default_calendar_id() -> String {
    "primary".to_string()
}

fn default_sync_color_tag() -> String {
    DEFAULT_SYNC_COLOR_TAG.to_string()
}

fn default_shared_color_tag() -> String {
    DEFAULT_SHARED_COLOR_TAG.to_string()
}

fn default_base_delay_ms() -> u64 {
    DEFAULT_BASE_DELAY_MS
}

fn default_max_expansions() -> u16 {
    DEFAULT_MAX_EXPANSIONS
}

fn default_zone() -> String {
    DEFAULT_ZONE.to_string()
}

fn default_window_start() -> String {
    "05:00".to_string()
}

fn default_window_end() -> String {
    "23:59".to_string()
}

fn default_floating_offset() -> i64 {
    -750
}

fn default_floating_corrections() -> BTreeMap<String, i64> {
    BTreeMap::from([("Asia/Kolkata".to_string(), -330)])
}

/// Raw settings as read from `config.toml`.
///
/// The camelCase names used by older deployments (`icsCalendarUrl`,
/// `syncDays`, ...) are accepted as aliases.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default, alias = "icsCalendarUrl")]
    pub ics_calendar_url: String,

    #[serde(default, alias = "sharedCalendarId")]
    pub shared_calendar_id: Option<String>,

    #[serde(default = "default_sync_days", alias = "syncDays")]
    pub sync_days: i64,

    #[serde(default, alias = "skipEvents")]
    pub skip_events: Vec<String>,

    /// Location used when an event has none.
    #[serde(default)]
    pub location: Option<String>,

    #[serde(default = "default_calendar_id", alias = "calendarId")]
    pub calendar_id: String,

    #[serde(default = "default_sync_color_tag")]
    pub sync_color_tag: String,

    #[serde(default = "default_shared_color_tag")]
    pub shared_color_tag: String,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_expansions")]
    pub max_expansions: u16,

    #[serde(default = "default_zone")]
    pub default_zone: String,

    #[serde(default)]
    pub window: WindowSettings,

    #[serde(default)]
    pub floating: FloatingSettings,

    #[serde(default)]
    pub feed_credential: Option<String>,

    #[serde(default)]
    pub google_access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowSettings {
    /// Wall-clock time on the run day where the sync window opens ("HH:MM").
    #[serde(default = "default_window_start")]
    pub start: String,

    /// Wall-clock time on the last day where the sync window closes.
    #[serde(default = "default_window_end")]
    pub end: String,

    /// When set, only events between today 00:00 and tomorrow at this time
    /// are ingested.
    #[serde(default)]
    pub ingest_until: Option<String>,
}

impl Default for WindowSettings {
    fn default() -> Self {
        WindowSettings {
            start: default_window_start(),
            end: default_window_end(),
            ingest_until: None,
        }
    }
}

/// Correction table for floating (zone-less) feed timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct FloatingSettings {
    /// Origin zone the feed's floating times are known to come from. Falls
    /// back to the feed's `X-WR-TIMEZONE` when unset.
    #[serde(default)]
    pub origin: Option<String>,

    /// Offset applied to floating times whose origin is not in `corrections`.
    #[serde(default = "default_floating_offset")]
    pub default_offset_minutes: i64,

    #[serde(default = "default_floating_corrections")]
    pub corrections: BTreeMap<String, i64>,
}

impl FloatingSettings {
    fn check_offsets(&self) -> CalMirrorResult<()> {
        let offsets = std::iter::once(("default_offset_minutes", &self.default_offset_minutes))
            .chain(self.corrections.iter().map(|(origin, m)| (origin.as_str(), m)));

        for (key, minutes) in offsets {
            if minutes.unsigned_abs() > MAX_FLOATING_OFFSET_MINUTES.unsigned_abs() {
                return Err(CalMirrorError::Config(format!(
                    "Floating correction for {} must be within {} minutes (got {})",
                    key, MAX_FLOATING_OFFSET_MINUTES, minutes
                )));
            }
        }

        Ok(())
    }
}

impl Default for FloatingSettings {
    fn default() -> Self {
        FloatingSettings {
            origin: None,
            default_offset_minutes: default_floating_offset(),
            corrections: default_floating_corrections(),
        }
    }
}

/// Validated, typed options consumed by the engine.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub feed_url: Url,
    pub feed_credential: Option<String>,
    pub calendar_id: String,
    pub shared_calendar_id: Option<String>,
    pub sync_days: i64,
    pub skip_events: Vec<String>,
    pub fallback_location: Option<String>,
    pub sync_color_tag: String,
    pub shared_color_tag: String,
    pub base_delay_ms: u64,
    pub max_expansions: u16,
    pub default_zone: Tz,
    pub window_start: NaiveTime,
    pub window_end: NaiveTime,
    pub ingest_until: Option<NaiveTime>,
    pub floating: FloatingSettings,
}

impl Settings {
    pub fn config_path() -> CalMirrorResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CalMirrorError::Config("Could not determine config directory".into()))?
            .join("calmirror");

        Ok(config_dir.join("config.toml"))
    }

    /// Load settings from `path` (or the default location), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> CalMirrorResult<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Err(CalMirrorError::Config(format!(
                "Config file not found at {}\n\n\
                Create it with at least the feed location:\n\n\
                ics_calendar_url = \"https://example.com/calendar.ics\"",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(&path)?;
        let mut settings = Self::from_toml(&content)?;
        settings.apply_env();

        Ok(settings)
    }

    pub fn from_toml(content: &str) -> CalMirrorResult<Self> {
        toml::from_str(content).map_err(|e| CalMirrorError::Config(e.to_string()))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(ENV_FEED_URL) {
            self.ics_calendar_url = url;
        }
        if let Ok(credential) = std::env::var(ENV_FEED_CREDENTIAL) {
            self.feed_credential = Some(credential);
        }
        if let Ok(token) = std::env::var(ENV_ACCESS_TOKEN) {
            self.google_access_token = Some(token);
        }
    }

    /// Check every option and convert into [`SyncOptions`].
    ///
    /// Runs before any network call so misconfiguration surfaces as a
    /// `Config` error rather than a failed fetch.
    pub fn resolve(&self) -> CalMirrorResult<SyncOptions> {
        if self.ics_calendar_url.trim().is_empty() {
            return Err(CalMirrorError::Config("ics_calendar_url is required".into()));
        }

        let feed_url = Url::parse(self.ics_calendar_url.trim()).map_err(|e| {
            CalMirrorError::Config(format!(
                "Invalid ics_calendar_url '{}': {}",
                self.ics_calendar_url, e
            ))
        })?;

        let default_zone: Tz = self.default_zone.parse().map_err(|_| {
            CalMirrorError::Config(format!("Unknown default_zone '{}'", self.default_zone))
        })?;

        if !(0..=MAX_SYNC_DAYS).contains(&self.sync_days) {
            return Err(CalMirrorError::Config(format!(
                "sync_days must be between 0 and {} (got {})",
                MAX_SYNC_DAYS, self.sync_days
            )));
        }

        self.floating.check_offsets()?;

        if self.max_expansions == 0 {
            return Err(CalMirrorError::Config("max_expansions must be at least 1".into()));
        }

        let window_start = parse_clock("window.start", &self.window.start)?;
        let window_end = parse_clock("window.end", &self.window.end)?;
        let ingest_until = self
            .window
            .ingest_until
            .as_deref()
            .map(|s| parse_clock("window.ingest_until", s))
            .transpose()?;

        if self.sync_days == 0 && window_start >= window_end {
            return Err(CalMirrorError::Config(format!(
                "window.start ({}) must be before window.end ({}) when sync_days is 0",
                self.window.start, self.window.end
            )));
        }

        let shared_calendar_id = self
            .shared_calendar_id
            .as_ref()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty());

        Ok(SyncOptions {
            feed_url,
            feed_credential: self.feed_credential.clone(),
            calendar_id: self.calendar_id.clone(),
            shared_calendar_id,
            sync_days: self.sync_days,
            skip_events: self.skip_events.clone(),
            fallback_location: self.location.clone().filter(|l| !l.is_empty()),
            sync_color_tag: self.sync_color_tag.clone(),
            shared_color_tag: self.shared_color_tag.clone(),
            base_delay_ms: self.base_delay_ms,
            max_expansions: self.max_expansions,
            default_zone,
            window_start,
            window_end,
            ingest_until,
            floating: self.floating.clone(),
        })
    }
}

/// Parse "HH:MM" (or "HH:MM:SS").
fn parse_clock(key: &str, value: &str) -> CalMirrorResult<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| CalMirrorError::Config(format!("Invalid {} '{}'. Expected HH:MM", key, value)))
}
