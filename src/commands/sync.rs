use anyhow::Result;
use calmirror_core::{Settings, SyncEngine, SyncOptions};
use chrono::Utc;

use crate::render::{PlanRender, Render};

pub async fn run(settings: &Settings, options: &SyncOptions, verbose: bool) -> Result<()> {
    let client = super::destination(settings)?;
    let feed = super::feed(options);

    let outcome = SyncEngine::new(&client, &feed, options)
        .run(Utc::now())
        .await?;

    if !outcome.report.is_success() {
        tracing::warn!(
            failed = outcome.report.failed,
            "Sync finished with failures; rerun to retry them"
        );
    }

    println!("{}", outcome.prepared.plan.render(verbose));
    println!("\n{}", outcome.report.render());

    Ok(())
}
