use crate::output::{header_cell, styled_table, Output, OutputFormat};
use crate::ConfigCommands;
use color_eyre::Result;
use comfy_table::Cell;
use media_retention_config::{Config, CredentialStore, PathManager};
use media_retention_sources::Adapters;
use owo_colors::OwoColorize;
use serde_json::json;

pub async fn run_config(cmd: ConfigCommands, output: &Output) -> Result<()> {
    match cmd {
        ConfigCommands::Show { full } => show_config(full, output),
        ConfigCommands::Check => check_config(output),
        ConfigCommands::Credentials {
            tautulli_api_key,
            plex_token,
            radarr_api_key,
            sonarr_api_key,
        } => save_credentials(tautulli_api_key, plex_token, radarr_api_key, sonarr_api_key, output),
    }
}

fn show_config(full: bool, output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config_file = path_manager.config_file();
    let credentials_file = path_manager.credentials_file();

    if !config_file.exists() {
        output.warn(format!(
            "Configuration file not found at: {} (showing defaults and environment overrides)",
            config_file.display()
        ));
    }

    // Effective configuration; not validated so a broken setup can still be inspected
    let config = Config::load(&config_file)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load config from {}: {}", config_file.display(), e))?;

    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;
    let secret = |env_key: &str, stored: Option<&String>| -> String {
        let value = std::env::var(env_key)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| stored.cloned())
            .unwrap_or_default();
        if full {
            value
        } else {
            mask_string(&value)
        }
    };
    let tautulli_key = secret("TAUTULLI_API_KEY", cred_store.get_tautulli_api_key());
    let plex_token = secret("PLEX_TOKEN", cred_store.get_plex_token());
    let radarr_key = secret("RADARR_API_KEY", cred_store.get_radarr_api_key());
    let sonarr_key = secret("SONARR_API_KEY", cred_store.get_sonarr_api_key());

    match output.format() {
        OutputFormat::Human => {
            if output.is_quiet() {
                return Ok(());
            }

            println!("\n{}", "╔════════════════════════════════════════════════════════════╗".bright_white());
            println!("{} {}", "║".bright_white(), "Starcleaner Configuration".bright_cyan().bold());
            println!("{}", "╚════════════════════════════════════════════════════════════╝".bright_white());
            println!();

            let mut files_table = styled_table();
            files_table.set_header(vec![
                Cell::new("Config File").add_attribute(comfy_table::Attribute::Bold),
                Cell::new(config_file.display().to_string()),
            ]);
            files_table.add_row(vec![Cell::new("Credentials File"), Cell::new(credentials_file.display().to_string())]);
            files_table.add_row(vec![Cell::new("State File"), Cell::new(path_manager.state_file().display().to_string())]);
            println!("{}", files_table);
            println!();

            let p = &config.policy;
            let mut policy_table = styled_table();
            policy_table.set_header(vec![header_cell("Retention Policy")]);
            policy_table.add_row(vec![
                Cell::new("Dry Run"),
                Cell::new(if p.dry_run { "✓".yellow().to_string() } else { "✗ (live)".red().to_string() }),
            ]);
            policy_table.add_row(vec![Cell::new("Rating Threshold"), Cell::new(p.rating_threshold)]);
            policy_table.add_row(vec![Cell::new("Rating Mode"), Cell::new(p.rating_mode)]);
            policy_table.add_row(vec![Cell::new("Series Watch Mode"), Cell::new(p.series_watch_mode)]);
            policy_table.add_row(vec![
                Cell::new("Warn Before Delete"),
                Cell::new(if p.warn_before_delete { "✓".green().to_string() } else { "✗".red().to_string() }),
            ]);
            if p.warn_before_delete {
                policy_table.add_row(vec![Cell::new("Warn After"), Cell::new(format!("{} days", p.days_delay_warning))]);
            }
            policy_table.add_row(vec![Cell::new("Delete After"), Cell::new(format!("{} days", p.days_delay_deletion))]);
            policy_table.add_row(vec![
                Cell::new("Excluded Libraries"),
                Cell::new(if p.excluded_libraries.is_empty() {
                    "<none>".to_string()
                } else {
                    p.excluded_libraries.join(", ")
                }),
            ]);
            println!("{}", policy_table);
            println!();

            let mut scheduler_table = styled_table();
            scheduler_table.set_header(vec![header_cell("Scheduler")]);
            scheduler_table.add_row(vec![Cell::new("Daily At"), Cell::new(&config.scheduler.schedule_time)]);
            scheduler_table.add_row(vec![Cell::new("Timezone"), Cell::new(&config.scheduler.timezone)]);
            scheduler_table.add_row(vec![
                Cell::new("Run On Startup"),
                Cell::new(if config.scheduler.run_on_startup { "✓".green().to_string() } else { "✗".red().to_string() }),
            ]);
            println!("{}", scheduler_table);
            println!();

            let mut services_table = styled_table();
            services_table.set_header(vec![header_cell("Service"), header_cell("URL"), header_cell("Key")]);
            services_table.add_row(vec![Cell::new("Tautulli"), Cell::new(or_not_set(&config.tautulli.url)), Cell::new(&tautulli_key)]);
            services_table.add_row(vec![
                Cell::new("Plex"),
                Cell::new(config.plex.server_url.as_deref().unwrap_or(&config.plex.graphql_url)),
                Cell::new(&plex_token),
            ]);
            match &config.radarr {
                Some(radarr) => services_table.add_row(vec![Cell::new("Radarr"), Cell::new(&radarr.url), Cell::new(&radarr_key)]),
                None => services_table.add_row(vec![Cell::new("Radarr"), Cell::new("Not configured".bright_black().to_string()), Cell::new("")]),
            };
            match &config.sonarr {
                Some(sonarr) => services_table.add_row(vec![Cell::new("Sonarr"), Cell::new(&sonarr.url), Cell::new(&sonarr_key)]),
                None => services_table.add_row(vec![Cell::new("Sonarr"), Cell::new("Not configured".bright_black().to_string()), Cell::new("")]),
            };
            services_table.add_row(vec![
                Cell::new("Notifications"),
                Cell::new(match &config.notifications.webhook_url {
                    Some(url) if full => url.clone(),
                    Some(url) => mask_url(url),
                    None => "log only".to_string(),
                }),
                Cell::new(""),
            ]);
            println!("{}", services_table);

            if let Some(log_file) = &config.logging.file {
                println!();
                println!("{} {}", "Log file:".bright_black(), log_file.display());
            }
            println!();
        }
        OutputFormat::Json | OutputFormat::JsonPretty => {
            let p = &config.policy;
            let json = json!({
                "config_file": config_file.display().to_string(),
                "credentials_file": credentials_file.display().to_string(),
                "state_file": path_manager.state_file().display().to_string(),
                "policy": {
                    "dry_run": p.dry_run,
                    "rating_threshold": p.rating_threshold,
                    "rating_mode": p.rating_mode,
                    "series_watch_mode": p.series_watch_mode,
                    "warn_before_delete": p.warn_before_delete,
                    "days_delay_warning": p.days_delay_warning,
                    "days_delay_deletion": p.days_delay_deletion,
                    "excluded_libraries": p.excluded_libraries,
                },
                "scheduler": {
                    "schedule_time": config.scheduler.schedule_time,
                    "timezone": config.scheduler.timezone,
                    "run_on_startup": config.scheduler.run_on_startup,
                },
                "tautulli": {
                    "url": config.tautulli.url,
                    "history_length": config.tautulli.history_length,
                    "api_key": tautulli_key,
                },
                "plex": {
                    "graphql_url": config.plex.graphql_url,
                    "server_url": config.plex.server_url,
                    "token": plex_token,
                },
                "radarr": config.radarr.as_ref().map(|r| json!({ "url": r.url, "api_key": radarr_key })),
                "sonarr": config.sonarr.as_ref().map(|s| json!({ "url": s.url, "api_key": sonarr_key })),
                "notifications": {
                    "webhook_url": config.notifications.webhook_url.as_ref().map(|u| if full { u.clone() } else { mask_url(u) }),
                },
                "logging": {
                    "file": config.logging.file.as_ref().map(|f| f.display().to_string()),
                },
            });
            output.json(&json);
        }
    }

    Ok(())
}

/// Run every startup check a run would do, without touching any service.
fn check_config(output: &Output) -> Result<()> {
    let path_manager = PathManager::default();
    let config = super::load_config(&path_manager)?;
    let policy = config
        .policy()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid retention policy: {}", e))?;
    let schedule = config
        .schedule()
        .map_err(|e| color_eyre::eyre::eyre!("Invalid scheduler configuration: {}", e))?;
    let credentials = super::load_credentials(&path_manager)?;
    Adapters::from_config(&config, &credentials)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to create service clients: {:#}", e))?;

    if config.radarr.is_none() && config.sonarr.is_none() {
        output.warn("Neither Radarr nor Sonarr is configured; deletions will fail");
    }
    if policy.dry_run {
        output.info("Dry run is enabled; set DRY_RUN=false or policy.dry_run = false to act for real");
    }
    output.success(format!(
        "Configuration is valid (daily at {} {}, threshold {} in {} mode)",
        schedule.time, schedule.timezone, policy.rating_threshold, policy.rating_mode
    ));
    Ok(())
}

fn save_credentials(
    tautulli_api_key: Option<String>,
    plex_token: Option<String>,
    radarr_api_key: Option<String>,
    sonarr_api_key: Option<String>,
    output: &Output,
) -> Result<()> {
    if tautulli_api_key.is_none() && plex_token.is_none() && radarr_api_key.is_none() && sonarr_api_key.is_none() {
        output.warn("Nothing to save; pass at least one of --tautulli-api-key, --plex-token, --radarr-api-key, --sonarr-api-key");
        return Ok(());
    }

    let path_manager = PathManager::default();
    let credentials_file = path_manager.credentials_file();
    let mut cred_store = CredentialStore::new(credentials_file.clone());
    cred_store
        .load()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to load credentials from {}: {}", credentials_file.display(), e))?;

    if let Some(key) = tautulli_api_key {
        cred_store.set_tautulli_api_key(key);
    }
    if let Some(token) = plex_token {
        cred_store.set_plex_token(token);
    }
    if let Some(key) = radarr_api_key {
        cred_store.set_radarr_api_key(key);
    }
    if let Some(key) = sonarr_api_key {
        cred_store.set_sonarr_api_key(key);
    }

    cred_store
        .save()
        .map_err(|e| color_eyre::eyre::eyre!("Failed to save credentials to {}: {}", credentials_file.display(), e))?;
    output.success(format!("Credentials saved to {}", credentials_file.display()));
    Ok(())
}

fn or_not_set(s: &str) -> String {
    if s.trim().is_empty() {
        "<not set>".to_string()
    } else {
        s.to_string()
    }
}

fn mask_string(s: &str) -> String {
    if s.is_empty() {
        return "<not set>".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..2].iter().collect();
    let tail: String = chars[chars.len() - 2..].iter().collect();
    format!("{}***{}", head, tail)
}

/// Webhook URLs embed their secret in the path; keep only scheme and host.
fn mask_url(url: &str) -> String {
    match url.split_once("://") {
        Some((scheme, rest)) => {
            let host = rest.split('/').next().unwrap_or(rest);
            format!("{}://{}/***", scheme, host)
        }
        None => mask_string(url),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_string() {
        assert_eq!(mask_string(""), "<not set>");
        assert_eq!(mask_string("abc"), "***");
        assert_eq!(mask_string("abcdef123456"), "ab***56");
    }

    #[test]
    fn test_mask_url_hides_path() {
        assert_eq!(
            mask_url("https://discord.com/api/webhooks/123/secret-token"),
            "https://discord.com/***"
        );
        assert_eq!(mask_url("not-a-url-at-all"), "no***ll");
    }
}
