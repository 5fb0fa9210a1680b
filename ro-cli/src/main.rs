//! ReachOut CLI - keep in touch with the people who matter.
//!
//! Manages the contact list, reminder settings and the local reminder queue
//! from the terminal. Every invocation runs the normal startup sequence
//! (load settings, load contacts with backup recovery, missed-reminder sweep,
//! reminder rebuild) before dispatching the command.

mod commands;

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::info;

use ro_core::config::{AppConfig, ConfigHandle};
use ro_core::constants::APP_VERSION;
use ro_core::error::RoResult;
use ro_core::logging;
use ro_services::ServiceRegistry;

/// ReachOut - reminders to reach out to your contacts.
#[derive(Parser)]
#[command(
    name = "reachout",
    version,
    about = "ReachOut contact reminder CLI",
    long_about = "A command-line interface for ReachOut.\n\
                  Track how often you want to talk to each contact and get reminded when it is time."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Show startup status and service health.
    Status,
    /// List and manage contacts.
    Contacts {
        #[command(subcommand)]
        action: commands::contacts::ContactsAction,
    },
    /// View and modify reminder settings.
    Settings {
        #[command(subcommand)]
        action: commands::settings::SettingsAction,
    },
    /// Inspect and deliver scheduled reminders.
    Reminders {
        #[command(subcommand)]
        action: commands::reminders::RemindersAction,
    },
    /// Inspect the contact backup ring.
    Backup {
        #[command(subcommand)]
        action: commands::backup::BackupAction,
    },
    /// View the activity log.
    Logs {
        #[command(subcommand)]
        action: commands::logs::LogsAction,
    },
    /// Onboarding state.
    Onboarding {
        #[command(subcommand)]
        action: commands::onboarding::OnboardingAction,
    },
}

fn load_config(path: Option<&str>) -> RoResult<AppConfig> {
    match path {
        Some(path) => AppConfig::load_from_file(Path::new(path)),
        None => {
            let config = AppConfig::load_default()?;
            if !AppConfig::default_config_path()?.exists() {
                // First run: leave an editable copy of the defaults.
                if let Err(e) = config.save_default() {
                    eprintln!("could not write default config: {e}");
                }
            }
            Ok(config)
        }
    }
}

#[tokio::main]
async fn main() -> RoResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = load_config(cli.config.as_deref())?;

    // Initialize logging
    let log_level = if cli.verbose {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    };
    let log_dir = config
        .effective_log_dir()
        .unwrap_or_else(|_| PathBuf::from("logs"));
    let _guard = logging::init_logging(&log_level, &log_dir, config.logging.json_output)?;

    info!("ReachOut CLI v{APP_VERSION}");

    let mut registry = ServiceRegistry::open(ConfigHandle::new(config)).await?;
    let report = registry.start().await?;
    commands::report_startup(&report);

    // Dispatch to command handlers
    let result = match cli.command {
        Commands::Status => commands::status::run(&registry, &report, cli.format).await,
        Commands::Contacts { action } => {
            commands::contacts::run(&registry, action, cli.format).await
        }
        Commands::Settings { action } => {
            commands::settings::run(&registry, action, cli.format).await
        }
        Commands::Reminders { action } => {
            commands::reminders::run(&mut registry, &report, action, cli.format).await
        }
        Commands::Backup { action } => commands::backup::run(&registry, action, cli.format).await,
        Commands::Logs { action } => commands::logs::run(&registry, action, cli.format).await,
        Commands::Onboarding { action } => {
            commands::onboarding::run(&registry, action, cli.format).await
        }
    };

    registry.shutdown();
    result
}
