//! Contact commands.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Subcommand, ValueEnum};
use comfy_table::{Attribute, Cell, Color};
use console::style;
use dialoguer::Confirm;

use ro_core::error::{FieldError, RoError, RoResult};
use ro_models::{
    next_due_date, Contact, DeviceContact, Frequency, NewContact, PhoneNumber, ReachOutStatus,
    SortOrder,
};
use ro_services::{ContactSummary, ServiceRegistry};

use crate::commands::Toggle;
use crate::OutputFormat;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortArg {
    /// Alphabetical by name.
    Name,
    /// Overdue first, then soonest due.
    Next,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Name => SortOrder::Name,
            SortArg::Next => SortOrder::NextReachOut,
        }
    }
}

#[derive(Subcommand)]
pub enum ContactsAction {
    /// List all contacts with their reach-out status.
    List {
        /// Sort order.
        #[arg(short, long, value_enum, default_value = "next")]
        sort: SortArg,
        /// Only show overdue contacts.
        #[arg(long)]
        overdue: bool,
    },
    /// Show one contact.
    Show {
        /// Contact ID.
        id: String,
    },
    /// Add a contact.
    Add {
        /// Display name.
        name: String,
        /// How often to reach out: daily, weekly or monthly.
        #[arg(short = 'q', long, default_value = "weekly")]
        frequency: String,
        /// Phone number, optionally labelled as `label:number`. Repeatable.
        #[arg(short, long)]
        phone: Vec<String>,
        /// Email address.
        #[arg(short, long)]
        email: Option<String>,
        /// Create the contact with reminders disabled.
        #[arg(long)]
        no_reminder: bool,
    },
    /// Edit a contact.
    Edit {
        /// Contact ID.
        id: String,
        /// New display name.
        #[arg(long)]
        name: Option<String>,
        /// New frequency: daily, weekly or monthly.
        #[arg(short = 'q', long)]
        frequency: Option<String>,
        /// New email address.
        #[arg(short, long)]
        email: Option<String>,
        /// Turn this contact's reminder on or off.
        #[arg(long, value_enum)]
        reminder: Option<Toggle>,
    },
    /// Delete a contact.
    Delete {
        /// Contact ID.
        id: String,
    },
    /// Delete every contact.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },
    /// Record that you just reached out to a contact.
    ReachOut {
        /// Contact ID.
        id: String,
    },
    /// Import contacts from a JSON export of the device address book.
    Import {
        /// Path to a JSON array of address-book records.
        file: PathBuf,
        /// Frequency for imported contacts (defaults to the configured one).
        #[arg(short = 'q', long)]
        frequency: Option<String>,
    },
}

pub async fn run(registry: &ServiceRegistry, action: ContactsAction, format: OutputFormat) -> RoResult<()> {
    match action {
        ContactsAction::List { sort, overdue } => {
            let mut summary = registry.contacts.summary(sort.into(), Utc::now()).await;
            if overdue {
                summary.retain(|s| s.status.is_overdue());
            }

            match format {
                OutputFormat::Json => super::print_json(&summary),
                OutputFormat::Text => {
                    if summary.is_empty() {
                        println!("No contacts. Run `reachout contacts add <name>` to add one.");
                    } else {
                        let mut table = super::new_table();
                        table.set_header(vec!["ID", "Name", "Frequency", "Last reached out", "Next", "Status", "Reminder"]);
                        for s in &summary {
                            table.add_row(vec![
                                Cell::new(super::truncate(&s.contact.id, 12)),
                                Cell::new(&s.contact.name),
                                Cell::new(s.contact.frequency),
                                Cell::new(super::format_local(s.contact.last_reached_out)),
                                Cell::new(super::format_local(s.next_due)),
                                status_cell(&s.status),
                                Cell::new(if s.contact.reminder_enabled { "on" } else { "off" }),
                            ]);
                        }
                        println!("{table}");
                        println!("\n{} contact(s) shown", summary.len());
                    }
                }
            }
        }
        ContactsAction::Show { id } => {
            let contact = find(registry, &id).await?;
            let summary = summarize(contact);
            match format {
                OutputFormat::Json => super::print_json(&summary),
                OutputFormat::Text => print_contact(&summary),
            }
        }
        ContactsAction::Add {
            name,
            frequency,
            phone,
            email,
            no_reminder,
        } => {
            let mut new = NewContact::new(name, frequency.parse()?);
            new.reminder_enabled = !no_reminder;
            new.email = email;
            if !phone.is_empty() {
                new.phone_numbers = Some(phone.iter().map(|p| parse_phone(p)).collect());
            }

            let contact = registry.contacts.add(new).await?;
            super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&contact),
                OutputFormat::Text => super::print_ok(format!("Added {} ({})", contact.name, contact.id)),
            }
        }
        ContactsAction::Edit {
            id,
            name,
            frequency,
            email,
            reminder,
        } => {
            let mut contact = find(registry, &id).await?;
            if let Some(name) = name {
                contact.name = name;
            }
            if let Some(frequency) = frequency {
                contact.frequency = frequency.parse()?;
            }
            if let Some(email) = email {
                contact.email = if email.is_empty() { None } else { Some(email) };
            }
            if let Some(reminder) = reminder {
                contact.reminder_enabled = reminder.enabled();
            }

            let contact = registry.contacts.update(contact).await?;
            super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&contact),
                OutputFormat::Text => super::print_ok(format!("Updated {}", contact.name)),
            }
        }
        ContactsAction::Delete { id } => {
            let contact = find(registry, &id).await?;
            registry.contacts.delete(&contact.id).await?;
            super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "deleted": contact.id })),
                OutputFormat::Text => super::print_ok(format!("Deleted {}", contact.name)),
            }
        }
        ContactsAction::Clear { yes } => {
            let count = registry.contacts.list().await.len();
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete all {count} contact(s)? This cannot be undone"))
                    .default(false)
                    .interact()
                    .map_err(|e| RoError::Internal(e.to_string()))?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            registry.contacts.clear_all().await?;
            super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "deleted": count })),
                OutputFormat::Text => super::print_ok(format!("Deleted {count} contact(s)")),
            }
        }
        ContactsAction::ReachOut { id } => {
            let contact = find(registry, &id).await?;
            let contact = registry.contacts.mark_reached_out(&contact.id).await?;
            super::rebuild_reminders(registry).await?;
            let summary = summarize(contact);
            match format {
                OutputFormat::Json => super::print_json(&summary),
                OutputFormat::Text => super::print_ok(format!(
                    "Reached out to {}. Next reach-out {}.",
                    summary.contact.name,
                    super::format_local(summary.next_due)
                )),
            }
        }
        ContactsAction::Import { file, frequency } => {
            let (default_frequency, reminder_enabled) = {
                let cfg = registry.config.read().await;
                (cfg.import.default_frequency.clone(), cfg.import.reminder_enabled)
            };
            let frequency: Frequency = frequency.unwrap_or(default_frequency).parse()?;

            let raw = std::fs::read_to_string(&file)?;
            let records: Vec<DeviceContact> = serde_json::from_str(&raw)?;
            let total = records.len();
            let now = Utc::now();
            let news: Vec<NewContact> = records
                .into_iter()
                .filter_map(|r| r.into_new_contact(frequency, reminder_enabled, now))
                .collect();
            let skipped = total - news.len();

            let imported = registry.contacts.import(news).await?;
            super::rebuild_reminders(registry).await?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({
                    "imported": imported,
                    "skipped": skipped,
                })),
                OutputFormat::Text => {
                    super::print_ok(format!("Imported {} contact(s)", imported.len()));
                    if skipped > 0 {
                        println!("  {} Skipped {skipped} record(s) without a name.", style("..").dim());
                    }
                }
            }
        }
    }

    Ok(())
}

/// Look up a contact by ID, accepting a unique ID prefix as shown by `list`.
async fn find(registry: &ServiceRegistry, id: &str) -> RoResult<Contact> {
    if let Some(contact) = registry.contacts.get(id).await {
        return Ok(contact);
    }
    let mut matches: Vec<Contact> = registry
        .contacts
        .list()
        .await
        .into_iter()
        .filter(|c| c.id.starts_with(id))
        .collect();
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(RoError::ContactNotFound(id.to_string())),
        n => Err(RoError::Validation {
            message: "Ambiguous contact ID".into(),
            errors: vec![FieldError::new("id", format!("{id} matches {n} contacts"))],
        }),
    }
}

fn summarize(contact: Contact) -> ContactSummary {
    let now = Utc::now();
    ContactSummary {
        next_due: next_due_date(contact.last_reached_out, contact.frequency, now),
        status: ReachOutStatus::of(&contact, now),
        contact,
    }
}

fn status_cell(status: &ReachOutStatus) -> Cell {
    let cell = Cell::new(status);
    match status {
        ReachOutStatus::Overdue => cell.fg(Color::Red).add_attribute(Attribute::Bold),
        ReachOutStatus::Today | ReachOutStatus::Tomorrow => cell.fg(Color::Yellow),
        ReachOutStatus::InDays(_) => cell,
    }
}

fn status_label(status: &ReachOutStatus) -> String {
    let label = status.to_string();
    match status {
        ReachOutStatus::Overdue => style(label).red().bold().to_string(),
        ReachOutStatus::Today => style(label).yellow().bold().to_string(),
        ReachOutStatus::Tomorrow => style(label).yellow().to_string(),
        ReachOutStatus::InDays(_) => label,
    }
}

fn print_contact(summary: &ContactSummary) {
    let c = &summary.contact;
    println!("{}", style(&c.name).bold().underlined());
    println!("  ID:               {}", c.id);
    println!("  Frequency:        {}", c.frequency);
    println!("  Last reached out: {}", super::format_local(c.last_reached_out));
    println!("  Next reach-out:   {}", super::format_local(summary.next_due));
    println!("  Status:           {}", status_label(&summary.status));
    println!("  Reminder:         {}", if c.reminder_enabled { "on" } else { "off" });
    if let Some(phones) = &c.phone_numbers {
        for phone in phones {
            println!("  Phone ({}): {}", phone.label, phone.number);
        }
    }
    if let Some(email) = &c.email {
        println!("  Email:            {email}");
    }
}

/// Parse `label:number`, defaulting the label to "mobile".
fn parse_phone(raw: &str) -> PhoneNumber {
    match raw.split_once(':') {
        Some((label, number)) if !label.trim().is_empty() => PhoneNumber {
            label: label.trim().to_string(),
            number: number.trim().to_string(),
        },
        _ => PhoneNumber {
            label: "mobile".to_string(),
            number: raw.trim().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_phone() {
        assert_eq!(
            parse_phone("work: 555-0100"),
            PhoneNumber { label: "work".into(), number: "555-0100".into() }
        );
        assert_eq!(
            parse_phone("555-0101"),
            PhoneNumber { label: "mobile".into(), number: "555-0101".into() }
        );
    }

    #[test]
    fn test_sort_arg_maps_to_order() {
        assert_eq!(SortOrder::from(SortArg::Name), SortOrder::Name);
        assert_eq!(SortOrder::from(SortArg::Next), SortOrder::NextReachOut);
    }

    #[test]
    fn test_summarize_overdue_contact() {
        let mut new = NewContact::new("Ada", Frequency::Daily);
        new.last_reached_out = Utc::now() - chrono::Duration::days(3);
        let summary = summarize(Contact::with_id("c1".into(), new));
        assert!(summary.status.is_overdue());
        assert!(summary.next_due > Utc::now());
    }
}
