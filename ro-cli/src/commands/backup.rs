//! Backup ring commands.

use clap::Subcommand;
use console::style;

use ro_core::error::RoResult;
use ro_services::contact::parse_contact_list;
use ro_services::ServiceRegistry;

use crate::OutputFormat;

#[derive(Subcommand)]
pub enum BackupAction {
    /// List the snapshots in the backup ring, newest first.
    List,
    /// Check which snapshots would be usable for recovery.
    RestoreCheck,
}

pub async fn run(registry: &ServiceRegistry, action: BackupAction, format: OutputFormat) -> RoResult<()> {
    let ring = registry.contacts.backups()?;

    match action {
        BackupAction::List => match format {
            OutputFormat::Json => {
                let json: Vec<_> = ring
                    .iter()
                    .map(|b| {
                        serde_json::json!({
                            "timestamp": b.timestamp,
                            "bytes": b.data.len(),
                            "contacts": parse_contact_list(&b.data).ok().map(|c| c.len()),
                        })
                    })
                    .collect();
                super::print_json(&json);
            }
            OutputFormat::Text => {
                if ring.is_empty() {
                    println!("No backups yet. A backup is written after every contact change.");
                } else {
                    let mut table = super::new_table();
                    table.set_header(vec!["#", "Taken", "Contacts", "Size"]);
                    for (i, b) in ring.iter().enumerate() {
                        let count = parse_contact_list(&b.data)
                            .map(|c| c.len().to_string())
                            .unwrap_or_else(|_| "invalid".to_string());
                        table.add_row(vec![
                            (i + 1).to_string(),
                            super::format_local(b.timestamp),
                            count,
                            format!("{} B", b.data.len()),
                        ]);
                    }
                    println!("{table}");
                }
            }
        },
        BackupAction::RestoreCheck => {
            let results: Vec<_> = ring
                .iter()
                .map(|b| (b, parse_contact_list(&b.data)))
                .collect();
            let first_valid = results.iter().position(|(_, r)| r.is_ok());

            match format {
                OutputFormat::Json => {
                    let json: Vec<_> = results
                        .iter()
                        .enumerate()
                        .map(|(i, (b, r))| {
                            serde_json::json!({
                                "timestamp": b.timestamp,
                                "valid": r.is_ok(),
                                "error": r.as_ref().err().map(|e| e.to_string()),
                                "wouldRestore": Some(i) == first_valid,
                            })
                        })
                        .collect();
                    super::print_json(&json);
                }
                OutputFormat::Text => {
                    if results.is_empty() {
                        println!("No backups to check.");
                    }
                    for (i, (b, r)) in results.iter().enumerate() {
                        let taken = super::format_local(b.timestamp);
                        match r {
                            Ok(contacts) if Some(i) == first_valid => println!(
                                "  {} {taken}: {} contact(s), would be restored",
                                style("OK").green().bold(),
                                contacts.len()
                            ),
                            Ok(contacts) => println!(
                                "  {} {taken}: {} contact(s)",
                                style("OK").green(),
                                contacts.len()
                            ),
                            Err(e) => println!("  {} {taken}: {e}", style("BAD").red().bold()),
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
