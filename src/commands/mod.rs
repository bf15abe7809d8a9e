pub mod plan;
pub mod sync;

use anyhow::Result;
use calmirror_core::{HttpFeed, Settings, SyncOptions};
use calmirror_provider_google::GoogleCalendar;

fn destination(settings: &Settings) -> Result<GoogleCalendar> {
    let Some(token) = settings
        .google_access_token
        .as_deref()
        .filter(|t| !t.trim().is_empty())
    else {
        anyhow::bail!(
            "No Google access token configured.\n\n\
            Set it in config.toml:\n  \
            google_access_token = \"...\"\n\n\
            or in the environment:\n  \
            CALMIRROR_GOOGLE_ACCESS_TOKEN=..."
        );
    };

    Ok(GoogleCalendar::new(token.trim()))
}

fn feed(options: &SyncOptions) -> HttpFeed {
    HttpFeed::new(options.feed_url.clone(), options.feed_credential.clone())
}
