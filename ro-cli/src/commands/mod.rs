//! CLI command implementations.

pub mod status;
pub mod contacts;
pub mod settings;
pub mod reminders;
pub mod backup;
pub mod logs;
pub mod onboarding;

use chrono::{DateTime, Local, Utc};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use console::style;
use serde::Serialize;

use ro_core::error::RoResult;
use ro_services::{LoadOutcome, RescheduleReport, ServiceRegistry, StartupReport};

/// On/off switch argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::On
    }
}

/// Table with the CLI's standard look.
pub fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Render a timestamp in the local time zone.
pub fn format_local(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

/// Truncate a string to a maximum number of characters, appending an ellipsis if truncated.
pub fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let head: String = s.chars().take(max_len - 3).collect();
        format!("{head}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

/// Warn on stderr when startup had to recover or discard the contact list.
pub fn report_startup(report: &StartupReport) {
    match &report.load {
        LoadOutcome::Normal => {}
        LoadOutcome::RecoveredFromBackup { timestamp } => eprintln!(
            "  {} Contact data was unreadable; restored the backup from {}.",
            style("WARN").yellow().bold(),
            format_local(*timestamp)
        ),
        LoadOutcome::ResetToEmpty => eprintln!(
            "  {} Contact data was unreadable and no valid backup exists; starting empty.",
            style("WARN").yellow().bold()
        ),
    }
    if !report.delivered.is_empty() {
        eprintln!(
            "  {} Showed {} reminder(s) that came due since the last run.",
            style("INFO").cyan().bold(),
            report.delivered.len()
        );
    }
    if !report.missed.is_empty() {
        eprintln!(
            "  {} Rescheduled {} missed monthly reminder(s).",
            style("INFO").cyan().bold(),
            report.missed.len()
        );
    }
}

/// Rebuild every reminder after a mutation and warn about contacts that
/// could not be scheduled.
pub async fn rebuild_reminders(registry: &ServiceRegistry) -> RoResult<RescheduleReport> {
    let report = registry.scheduler.rebuild_all().await?;
    for failure in &report.failed {
        eprintln!(
            "  {} Could not schedule reminder for {}: {}",
            style("WARN").yellow().bold(),
            failure.contact_id,
            failure.error
        );
    }
    Ok(report)
}

pub fn print_ok(message: impl std::fmt::Display) {
    println!("  {} {message}", style("OK").green().bold());
}
