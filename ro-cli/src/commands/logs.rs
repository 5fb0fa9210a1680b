//! Activity log commands.

use std::path::PathBuf;

use clap::Subcommand;
use comfy_table::{Cell, Color};
use dialoguer::Confirm;

use ro_core::error::{RoError, RoResult};
use ro_models::{LogEntry, LogLevel};
use ro_services::ServiceRegistry;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum LogsAction {
    /// Show recent activity log entries.
    Show {
        /// Number of entries to show.
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,
        /// Only show entries of this level (info, warn, error).
        #[arg(short, long)]
        level: Option<String>,
    },
    /// Export the whole activity log as JSON.
    Export {
        /// Write to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Delete every activity log entry.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the tail of the diagnostic log file.
    File {
        /// Number of lines to show.
        #[arg(short = 'n', long, default_value = "50")]
        count: usize,
    },
}

pub async fn run(registry: &ServiceRegistry, action: LogsAction, format: OutputFormat) -> RoResult<()> {
    match action {
        LogsAction::Show { count, level } => {
            let level = level.as_deref().map(parse_level).transpose()?;
            let entries: Vec<LogEntry> = registry
                .activity_log
                .entries()
                .await
                .into_iter()
                .filter(|e| level.map_or(true, |l| e.level == l))
                .take(count)
                .collect();

            match format {
                OutputFormat::Json => super::print_json(&entries),
                OutputFormat::Text => {
                    if entries.is_empty() {
                        println!("No activity logged.");
                    } else {
                        let mut table = super::new_table();
                        table.set_header(vec!["Time", "Level", "Message", "Context"]);
                        for e in &entries {
                            table.add_row(vec![
                                Cell::new(super::format_local(e.timestamp)),
                                level_cell(e.level),
                                Cell::new(&e.message),
                                Cell::new(
                                    e.context
                                        .as_ref()
                                        .map(|c| super::truncate(&c.to_string(), 60))
                                        .unwrap_or_default(),
                                ),
                            ]);
                        }
                        println!("{table}");
                    }
                }
            }
        }
        LogsAction::Export { output } => {
            let json = registry.activity_log.export().await?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    super::print_ok(format!("Exported activity log to {}", path.display()));
                }
                None => println!("{json}"),
            }
        }
        LogsAction::Clear { yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt("Delete all activity log entries?")
                    .default(false)
                    .interact()
                    .map_err(|e| RoError::Internal(e.to_string()))?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }
            registry.activity_log.clear().await?;
            super::print_ok("Activity log cleared");
        }
        LogsAction::File { count } => {
            let log_dir = registry.config.read().await.effective_log_dir()?;
            if !log_dir.exists() {
                println!("No log directory found at: {}", log_dir.display());
                return Ok(());
            }

            // Most recently written rolling file
            let mut files: Vec<_> = std::fs::read_dir(&log_dir)?
                .filter_map(|e| e.ok())
                .filter(|e| e.file_name().to_string_lossy().starts_with(ro_core::constants::LOG_FILE_NAME))
                .collect();
            files.sort_by_key(|e| std::cmp::Reverse(e.metadata().ok().and_then(|m| m.modified().ok())));

            let Some(latest) = files.first() else {
                println!("No log files in {}", log_dir.display());
                return Ok(());
            };
            let content = std::fs::read_to_string(latest.path())?;
            let lines: Vec<&str> = content.lines().collect();
            let start = lines.len().saturating_sub(count);
            for line in &lines[start..] {
                println!("{line}");
            }
        }
    }

    Ok(())
}

fn parse_level(raw: &str) -> RoResult<LogLevel> {
    match raw.to_ascii_lowercase().as_str() {
        "info" => Ok(LogLevel::Info),
        "warn" | "warning" => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(RoError::Config(format!("unknown log level: {other}"))),
    }
}

fn level_cell(level: LogLevel) -> Cell {
    let cell = Cell::new(level);
    match level {
        LogLevel::Info => cell.fg(Color::Cyan),
        LogLevel::Warn => cell.fg(Color::Yellow),
        LogLevel::Error => cell.fg(Color::Red),
    }
}
