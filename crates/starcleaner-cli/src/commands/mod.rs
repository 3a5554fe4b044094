pub mod config;
pub mod daemon;
pub mod run;
pub mod state;

use color_eyre::Result;
use media_retention_config::{Config, CredentialStore, PathManager, ServiceCredentials};
use media_retention_core::{JsonFileStore, RetentionScheduler};
use media_retention_sources::Adapters;
use tracing::debug;

/// Load config.toml (plus environment overrides) and reject anything invalid.
pub fn load_config(paths: &PathManager) -> Result<Config> {
    let config_file = paths.config_file();
    if !config_file.exists() {
        debug!("No config file at {}, using defaults and environment", config_file.display());
    }
    let config = Config::load(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;
    config
        .validate()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {}", e))?;
    Ok(config)
}

pub fn load_credentials(paths: &PathManager) -> Result<ServiceCredentials> {
    let credentials_file = paths.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    ServiceCredentials::from_env(&cred_store).map_err(|e| color_eyre::eyre::eyre!("Missing credentials: {}", e))
}

/// Everything a run needs, wired from config: adapters, state file, policy.
pub fn build_scheduler(paths: &PathManager, config: &Config, dry_run_override: Option<bool>) -> Result<RetentionScheduler> {
    let credentials = load_credentials(paths)?;

    let mut policy = config
        .policy()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid configuration: {}", e))?;
    if let Some(dry_run) = dry_run_override {
        policy.dry_run = dry_run;
    }

    let adapters = Adapters::from_config(config, &credentials)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create service clients: {:#}", e))?;

    paths
        .ensure_directories()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create data directories: {}", e))?;
    let store = JsonFileStore::open_default(paths)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to open retention state: {}", e))?;

    Ok(RetentionScheduler::new(policy, adapters, Box::new(store)))
}
