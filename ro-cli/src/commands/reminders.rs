//! Reminder commands.

use std::time::Duration;

use chrono::Utc;
use clap::Subcommand;
use console::style;
use tracing::warn;

use ro_core::error::RoResult;
use ro_models::{RepeatInterval, ScheduledReminder};
use ro_services::{ReminderPlatform, ServiceRegistry, StartupReport};

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum RemindersAction {
    /// List pending reminders, earliest first.
    List,
    /// Cancel and reschedule every reminder.
    Rebuild,
    /// Reschedule monthly reminders whose date passed without firing.
    CheckMissed,
    /// Show every reminder that is due now, including those shown at startup.
    Fire,
    /// Keep running and show reminders as they come due.
    Watch {
        /// Seconds between checks.
        #[arg(short, long, default_value = "60")]
        interval: u64,
    },
}

pub async fn run(
    registry: &mut ServiceRegistry,
    startup: &StartupReport,
    action: RemindersAction,
    format: OutputFormat,
) -> RoResult<()> {
    match action {
        RemindersAction::List => {
            let pending = registry.reminders.scheduled().await?;
            match format {
                OutputFormat::Json => super::print_json(&pending),
                OutputFormat::Text => {
                    if pending.is_empty() {
                        println!("No reminders scheduled.");
                    } else {
                        let mut table = super::new_table();
                        table.set_header(vec!["Contact", "Fires at", "Repeats", "Message"]);
                        for r in &pending {
                            let name = registry
                                .contacts
                                .get(&r.payload.contact_id)
                                .await
                                .map(|c| c.name)
                                .unwrap_or_else(|| r.payload.contact_id.clone());
                            table.add_row(vec![
                                name,
                                super::format_local(r.fire_at),
                                repeat_label(r.repeat).to_string(),
                                super::truncate(&r.message, 48),
                            ]);
                        }
                        println!("{table}");
                        println!("\n{} reminder(s) pending", pending.len());
                    }
                }
            }
        }
        RemindersAction::Rebuild => {
            let report = super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&report),
                OutputFormat::Text => super::print_ok(format!(
                    "{} reminder(s) scheduled, {} failed, {} stale record(s) pruned",
                    report.scheduled.len(),
                    report.failed.len(),
                    report.pruned
                )),
            }
        }
        RemindersAction::CheckMissed => {
            let rescheduled = registry.scheduler.check_missed(Utc::now()).await;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "rescheduled": rescheduled })),
                OutputFormat::Text => {
                    super::print_ok(format!("{} missed reminder(s) rescheduled", rescheduled.len()))
                }
            }
        }
        RemindersAction::Fire => {
            let mut delivered = startup.delivered.clone();
            delivered.extend(registry.deliver_due(Utc::now()).await?);
            match format {
                OutputFormat::Json => super::print_json(&delivered),
                OutputFormat::Text => {
                    if delivered.is_empty() {
                        println!("No reminders due.");
                    }
                    for reminder in &delivered {
                        print_delivered(reminder);
                    }
                }
            }
        }
        RemindersAction::Watch { interval } => {
            registry.start_listener();
            println!(
                "  {} Checking for due reminders every {}s (Ctrl+C to stop)\n",
                style("WATCH").cyan().bold(),
                interval.max(1)
            );

            let mut ticker = tokio::time::interval(Duration::from_secs(interval.max(1)));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        match registry.deliver_due(Utc::now()).await {
                            Ok(delivered) => {
                                for reminder in &delivered {
                                    match format {
                                        OutputFormat::Json => println!(
                                            "{}",
                                            serde_json::to_string(reminder).unwrap_or_default()
                                        ),
                                        OutputFormat::Text => print_delivered(reminder),
                                    }
                                }
                            }
                            Err(e) => warn!("failed to deliver reminders: {e}"),
                        }
                    }
                    _ = tokio::signal::ctrl_c() => {
                        println!();
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

fn print_delivered(reminder: &ScheduledReminder) {
    println!(
        "  {} {} - {}",
        style("REMIND").magenta().bold(),
        reminder.title,
        reminder.message
    );
}

fn repeat_label(repeat: Option<RepeatInterval>) -> &'static str {
    match repeat {
        Some(RepeatInterval::Day) => "daily",
        Some(RepeatInterval::Week) => "weekly",
        None => "-",
    }
}
