use clap::{ArgAction, Parser, Subcommand};
use commands::{config, daemon, run, state};
use std::path::PathBuf;

mod commands;
mod logging;
mod output;

#[derive(Parser)]
#[command(name = "starcleaner")]
#[command(about = "Starcleaner - Delete what your household rated badly, after a warning")]
#[command(version)]
struct Cli {
    /// Enable verbose output (use multiple times for more verbosity: -v, -vv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, global = true, default_value = "human", value_enum)]
    output: output::OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one retention pass now
    #[command(long_about = "Fetch the watch history, warn about low-rated items that have not been watched for a while, and delete items whose grace period is over. Whether anything is actually sent or deleted follows the dry_run setting unless --dry-run or --live is given.")]
    Run {
        /// Decide and report only; send nothing, delete nothing, record nothing
        #[arg(long, action = ArgAction::SetTrue, conflicts_with = "live")]
        dry_run: bool,

        /// Act for real even if the configuration says dry_run
        #[arg(long, action = ArgAction::SetTrue)]
        live: bool,
    },
    /// Run as daemon with the internal daily scheduler
    #[command(long_about = "Run Starcleaner in the foreground and trigger a retention pass every day at the configured time and timezone. A pass also runs on startup unless disabled in the configuration or with --no-startup-run.")]
    Daemon {
        /// Skip the pass on startup
        #[arg(long, action = ArgAction::SetTrue)]
        no_startup_run: bool,

        /// Write logs to this file (rotated daily) instead of stderr
        #[arg(long, value_name = "PATH")]
        log_file: Option<PathBuf>,
    },
    /// Inspect and check configuration
    Config {
        #[command(subcommand)]
        cmd: ConfigCommands,
    },
    /// Inspect the persisted warn/delete state
    State {
        #[command(subcommand)]
        cmd: StateCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show current configuration (masks sensitive data)
    #[command(long_about = "Display the effective configuration, after environment overrides. API keys and tokens are masked unless --full is given.")]
    Show {
        /// Show secrets unmasked
        #[arg(long, action = ArgAction::SetTrue)]
        full: bool,
    },

    /// Validate configuration and credentials without running
    Check,

    /// Store service credentials in the credentials file
    #[command(long_about = "Save API keys and tokens to credentials.toml. Environment variables (TAUTULLI_API_KEY, PLEX_TOKEN, RADARR_API_KEY, SONARR_API_KEY) still take precedence at runtime.")]
    Credentials {
        #[arg(long)]
        tautulli_api_key: Option<String>,

        #[arg(long)]
        plex_token: Option<String>,

        #[arg(long)]
        radarr_api_key: Option<String>,

        #[arg(long)]
        sonarr_api_key: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// List every warned or deleted item
    Show,

    /// Drop the record of one item so it is treated as never seen
    Forget {
        /// Item id (Plex rating key)
        item_id: String,
    },
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    let output = output::Output::new(cli.output, cli.quiet);

    match cli.command {
        Commands::Run { dry_run, live } => {
            logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            let dry_run_override = match (dry_run, live) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            run::run_once(dry_run_override, &output).await
        }
        Commands::Daemon { no_startup_run, log_file } => {
            // Logging is set up inside, once the log file location is known
            daemon::run_daemon(no_startup_run, log_file, cli.verbose, cli.quiet, &output).await
        }
        Commands::Config { cmd } => {
            logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            config::run_config(cmd, &output).await
        }
        Commands::State { cmd } => {
            logging::init_logging(cli.verbose, cli.quiet).map_err(|e| color_eyre::eyre::eyre!("{}", e))?;
            state::run_state(cmd, &output)
        }
    }
}
