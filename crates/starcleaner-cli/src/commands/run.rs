use crate::output::Output;
use color_eyre::Result;
use media_retention_config::PathManager;
use tracing::info;

pub async fn run_once(dry_run_override: Option<bool>, output: &Output) -> Result<()> {
    let paths = PathManager::default();
    let config = super::load_config(&paths)?;
    let mut scheduler = super::build_scheduler(&paths, &config, dry_run_override)?;

    if scheduler.policy().dry_run {
        output.warn("Dry run: nothing will be sent, deleted or recorded");
    }
    info!(operation = "manual_run_start", dry_run = scheduler.policy().dry_run, "Starting manual retention run");

    let summary = scheduler
        .run_once(chrono::Utc::now())
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Retention run failed: {}", e))?;

    output.summary(&summary);
    if summary.has_errors() {
        output.warn(format!(
            "{} item(s) could not be processed; they will be retried on the next run",
            summary.errors.len()
        ));
    } else {
        output.success("Retention run complete");
    }
    Ok(())
}
