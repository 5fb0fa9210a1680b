//! Status command.

use chrono::Utc;
use console::style;

use ro_core::error::RoResult;
use ro_models::SortOrder;
use ro_services::{LoadOutcome, ReminderPlatform, ServiceRegistry, StartupReport};

use crate::OutputFormat;

pub async fn run(registry: &ServiceRegistry, report: &StartupReport, format: OutputFormat) -> RoResult<()> {
    let now = Utc::now();
    let summary = registry.contacts.summary(SortOrder::NextReachOut, now).await;
    let overdue = summary.iter().filter(|s| s.status.is_overdue()).count();
    let settings = registry.settings.settings().await;
    let pending = registry.reminders.scheduled().await?;
    let health = registry.health_check();

    match format {
        OutputFormat::Json => {
            let services: Vec<_> = health
                .iter()
                .map(|(name, state, healthy)| {
                    serde_json::json!({ "name": name, "state": state.to_string(), "healthy": healthy })
                })
                .collect();
            super::print_json(&serde_json::json!({
                "startup": report,
                "contacts": summary.len(),
                "overdue": overdue,
                "pendingReminders": pending.len(),
                "settings": settings,
                "onboardingComplete": registry.onboarding.is_complete(),
                "services": services,
            }));
        }
        OutputFormat::Text => {
            println!("{}", style("ReachOut Status").bold().underlined());
            let load = match &report.load {
                LoadOutcome::Normal => style("normal".to_string()).green(),
                LoadOutcome::RecoveredFromBackup { timestamp } => {
                    style(format!("recovered from backup ({})", super::format_local(*timestamp))).yellow()
                }
                LoadOutcome::ResetToEmpty => style("reset to empty".to_string()).red(),
            };
            println!("  Contact data:      {load}");
            println!("  Contacts:          {} ({} overdue)", summary.len(), overdue);
            println!(
                "  Notifications:     {} at {}",
                if settings.global_notifications { "on" } else { "off" },
                settings.notification_time
            );
            println!("  Pending reminders: {}", pending.len());
            if let Some(next) = pending.first() {
                println!("  Next reminder:     {}", super::format_local(next.fire_at));
            }
            println!(
                "  Onboarding:        {}",
                if registry.onboarding.is_complete() { "complete" } else { "not complete" }
            );
            println!();

            let mut table = super::new_table();
            table.set_header(vec!["Service", "State", "Healthy"]);
            for (name, state, healthy) in &health {
                table.add_row(vec![
                    name.clone(),
                    state.to_string(),
                    if *healthy { "yes".to_string() } else { "no".to_string() },
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
