use crate::logging;
use crate::output::Output;
use color_eyre::Result;
use media_retention_config::{PathManager, ResolvedSchedule};
use media_retention_core::{RunDriver, TriggerOutcome};
use std::path::PathBuf;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

pub struct Scheduler {
    scheduler: JobScheduler,
    driver: RunDriver,
    schedule: ResolvedSchedule,
}

impl Scheduler {
    pub async fn new(driver: RunDriver, schedule: ResolvedSchedule) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            driver,
            schedule,
        })
    }

    /// Startup pass (if enabled), then register the daily job and start ticking.
    pub async fn start(&mut self) -> Result<()> {
        if self.schedule.run_on_startup {
            info!(operation = "scheduler_startup", "Running initial retention pass on startup");
            log_outcome(self.driver.trigger().await);
        }

        let cron = self.schedule.time.cron_expression();
        let driver = self.driver.clone();
        let job = Job::new_async_tz(cron.as_str(), self.schedule.timezone, move |_uuid, _lock| {
            let driver = driver.clone();
            Box::pin(async move {
                info!(operation = "scheduled_run_start", "Starting scheduled retention pass");
                log_outcome(driver.trigger().await);
            })
        })
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create daily job '{}': {}", cron, e))?;

        self.scheduler.add(job).await?;
        self.scheduler.start().await?;

        info!(
            operation = "scheduler_started",
            schedule_time = %self.schedule.time,
            timezone = %self.schedule.timezone,
            "Scheduler started, running daily at {} {}",
            self.schedule.time,
            self.schedule.timezone
        );
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        info!(operation = "scheduler_shutdown", "Stopping scheduler");
        self.scheduler.shutdown().await?;
        Ok(())
    }
}

fn log_outcome(outcome: TriggerOutcome) {
    match outcome {
        TriggerOutcome::Completed(summary) => info!(
            operation = "scheduled_run_complete",
            examined = summary.items_examined,
            warned = summary.warned.len(),
            deleted = summary.deleted.len(),
            skipped = summary.skipped.len(),
            errors = summary.errors.len(),
            dry_run = summary.dry_run,
            "Retention pass finished"
        ),
        TriggerOutcome::Skipped => info!(
            operation = "scheduled_run_skipped",
            "Retention pass skipped, previous pass still running"
        ),
        TriggerOutcome::Failed(e) => error!(
            operation = "scheduled_run_error",
            error = %e,
            "Retention pass failed"
        ),
    }
}

async fn wait_for_shutdown() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => result?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

pub async fn run_daemon(
    no_startup_run: bool,
    log_file_arg: Option<PathBuf>,
    verbose: u8,
    quiet: bool,
    output: &Output,
) -> Result<()> {
    let paths = PathManager::default();
    let config = super::load_config(&paths)?;

    let log_file = log_file_arg.or_else(|| config.logging.file.clone());
    logging::init_logging_with_file(verbose, quiet, log_file.as_deref())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to initialize logging: {}", e))?;
    if let Some(path) = &log_file {
        output.info(format!("Logs are being written to: {}", path.display()));
    }

    let mut schedule = config
        .schedule()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid scheduler configuration: {}", e))?;
    if no_startup_run {
        schedule.run_on_startup = false;
    }

    let retention = super::build_scheduler(&paths, &config, None)?;
    if retention.policy().dry_run {
        output.warn("Dry run is enabled: the daemon will only report what it would do");
    }
    let driver = RunDriver::new(retention);

    let mut scheduler = Scheduler::new(driver, schedule)
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create scheduler: {}", e))?;
    scheduler
        .start()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to start scheduler: {}", e))?;

    wait_for_shutdown()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to listen for shutdown signals: {}", e))?;
    info!(operation = "daemon_shutdown", "Shutdown signal received");

    scheduler
        .shutdown()
        .await
        .map_err(|e| color_eyre::eyre::eyre!("Failed to stop scheduler: {}", e))?;
    output.success("Daemon stopped");
    Ok(())
}
