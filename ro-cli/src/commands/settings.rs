//! Settings commands.

use clap::Subcommand;
use console::style;

use ro_core::error::RoResult;
use ro_services::ServiceRegistry;

use crate::commands::Toggle;
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum SettingsAction {
    /// Show the current reminder settings.
    Show,
    /// Turn all reminders on or off.
    Notifications {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Set the time of day reminders fire at (24-hour HH:mm).
    Time {
        /// e.g. 09:00 or 18:30
        time: String,
    },
}

pub async fn run(registry: &ServiceRegistry, action: SettingsAction, format: OutputFormat) -> RoResult<()> {
    let settings = match action {
        SettingsAction::Show => registry.settings.settings().await,
        SettingsAction::Notifications { state } => {
            let settings = registry.settings.set_notifications_enabled(state.enabled()).await?;
            let report = super::rebuild_reminders(registry).await?;
            if let OutputFormat::Text = format {
                if settings.global_notifications {
                    super::print_ok(format!(
                        "Notifications on. {} reminder(s) scheduled.",
                        report.scheduled.len()
                    ));
                } else {
                    super::print_ok("Notifications off. All reminders cancelled.");
                }
            }
            settings
        }
        SettingsAction::Time { time } => {
            let settings = registry.settings.set_notification_time(&time).await?;
            super::rebuild_reminders(registry).await?;
            if let OutputFormat::Text = format {
                super::print_ok(format!("Reminders will fire at {}.", settings.notification_time));
            }
            settings
        }
    };

    match format {
        OutputFormat::Json => super::print_json(&settings),
        OutputFormat::Text => {
            println!("{}", style("Reminder Settings").bold().underlined());
            println!(
                "  Notifications:  {}",
                if settings.global_notifications {
                    style("on").green()
                } else {
                    style("off").red()
                }
            );
            println!("  Time of day:    {}", settings.notification_time);
        }
    }
    Ok(())
}
