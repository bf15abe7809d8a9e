use anyhow::Result;
use calmirror_core::{Settings, SyncEngine, SyncOptions};
use chrono::Utc;

use crate::render::PlanRender;

pub async fn run(settings: &Settings, options: &SyncOptions, verbose: bool) -> Result<()> {
    let client = super::destination(settings)?;
    let feed = super::feed(options);

    let prepared = SyncEngine::new(&client, &feed, options)
        .prepare(Utc::now())
        .await?;

    tracing::debug!(
        unique = prepared.unique.len(),
        snapshot = prepared.snapshot.len(),
        mutations = prepared.plan.mutation_count(),
        "Plan computed"
    );

    println!("{}", prepared.plan.render(verbose));

    Ok(())
}
