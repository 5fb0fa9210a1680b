//! Contact store.
//!
//! Owns the persisted `contacts` record and its in-memory snapshot. Every
//! mutation writes the full list first and only then advances the snapshot,
//! so a failed write leaves memory exactly as it was. Each successful write
//! also pushes a copy onto the backup ring, which `load` falls back to when
//! the primary record is unreadable or invalid.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use ro_core::constants::keys;
use ro_core::error::{RoError, RoResult};
use ro_models::models::backup::push_backup;
use ro_models::kv::KeyValueStoreExt;
use ro_models::state::{reduce_contacts, ContactAction, ContactState};
use ro_models::{
    validate_contact, validate_new_contact, BackupRecord, Contact, KeyValueStore, NewContact,
    ReachOutStatus, SortOrder,
};

use crate::activity_log::ActivityLog;
use crate::event_bus::{AppEvent, EventBus};
use crate::service::{Service, ServiceState};

/// How the contact list was obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LoadOutcome {
    /// The primary record was valid, or absent.
    Normal,
    /// The primary record was unusable; the newest valid backup was restored.
    RecoveredFromBackup { timestamp: DateTime<Utc> },
    /// The primary record was unusable and no backup was valid.
    ResetToEmpty,
}

/// A contact with its countdown, as shown in the summary view.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub contact: Contact,
    pub next_due: DateTime<Utc>,
    #[serde(serialize_with = "serialize_status")]
    pub status: ReachOutStatus,
}

fn serialize_status<S: serde::Serializer>(status: &ReachOutStatus, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(status)
}

#[derive(Clone)]
pub struct ContactStore {
    state: ServiceState,
    store: Arc<dyn KeyValueStore>,
    event_bus: EventBus,
    activity: ActivityLog,
    snapshot: Arc<Mutex<ContactState>>,
}

fn apply(snapshot: &mut ContactState, action: ContactAction) {
    *snapshot = reduce_contacts(std::mem::take(snapshot), action);
}

fn invalid_data_message(err: &RoError) -> String {
    let details = err
        .field_errors()
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    format!("Invalid contact data: {details}")
}

/// Parse and validate a persisted contact list.
pub fn parse_contact_list(raw: &str) -> RoResult<Vec<Contact>> {
    let value: Value = serde_json::from_str(raw)?;
    let items = value
        .as_array()
        .ok_or_else(|| RoError::Serialization("contacts record is not a list".into()))?;
    items.iter().map(validate_contact).collect()
}

impl ContactStore {
    pub fn new(store: Arc<dyn KeyValueStore>, event_bus: EventBus, activity: ActivityLog) -> Self {
        Self {
            state: ServiceState::Created,
            store,
            event_bus,
            activity,
            snapshot: Arc::new(Mutex::new(ContactState {
                loading: true,
                ..Default::default()
            })),
        }
    }

    // ─── Loading ────────────────────────────────────────────────────────

    /// Load the persisted list, recovering from the backup ring if needed.
    pub async fn load(&self) -> LoadOutcome {
        let mut snapshot = self.snapshot.lock().await;
        apply(&mut snapshot, ContactAction::SetLoading(true));

        let primary = match self.store.get(keys::CONTACTS) {
            Ok(None) => {
                debug!("no stored contacts");
                apply(&mut snapshot, ContactAction::SetContacts(Vec::new()));
                return LoadOutcome::Normal;
            }
            Ok(Some(raw)) => parse_contact_list(&raw),
            Err(e) => Err(e),
        };

        match primary {
            Ok(contacts) => {
                info!("loaded {} contacts", contacts.len());
                apply(&mut snapshot, ContactAction::SetContacts(contacts));
                LoadOutcome::Normal
            }
            Err(e) => {
                warn!("error loading contacts: {e}");
                self.activity
                    .error("Error loading contacts", Some(json!({ "error": e.to_string() })))
                    .await;
                self.recover(&mut snapshot).await
            }
        }
    }

    async fn recover(&self, snapshot: &mut ContactState) -> LoadOutcome {
        let Some((backup, contacts)) = self.latest_valid_backup() else {
            warn!("no valid contact backup, starting with an empty list");
            self.activity.error("Contacts reset: no valid backup", None).await;
            apply(snapshot, ContactAction::SetContacts(Vec::new()));
            self.event_bus.emit(AppEvent::ContactsReset);
            return LoadOutcome::ResetToEmpty;
        };

        if let Err(e) = self.store.set(keys::CONTACTS, &backup.data) {
            warn!("failed to re-persist recovered contacts: {e}");
        }
        info!(
            "restored {} contacts from backup taken at {}",
            contacts.len(),
            backup.timestamp
        );
        self.activity
            .warn(
                "Contacts restored from backup",
                Some(json!({ "backupTimestamp": backup.timestamp, "count": contacts.len() })),
            )
            .await;

        let count = contacts.len();
        apply(snapshot, ContactAction::SetContacts(contacts));
        self.event_bus.emit(AppEvent::ContactsRecovered {
            backup_timestamp: backup.timestamp,
            count,
        });
        LoadOutcome::RecoveredFromBackup {
            timestamp: backup.timestamp,
        }
    }

    /// The newest backup whose every record validates.
    fn latest_valid_backup(&self) -> Option<(BackupRecord, Vec<Contact>)> {
        let backups = match self.store.get_json::<Vec<BackupRecord>>(keys::BACKUP) {
            Ok(backups) => backups.unwrap_or_default(),
            Err(e) => {
                warn!("failed to retrieve backups: {e}");
                return None;
            }
        };

        backups.into_iter().find_map(|backup| match parse_contact_list(&backup.data) {
            Ok(contacts) => Some((backup, contacts)),
            Err(e) => {
                debug!("skipping invalid backup from {}: {e}", backup.timestamp);
                None
            }
        })
    }

    /// Backup ring as stored, newest first.
    pub fn backups(&self) -> RoResult<Vec<BackupRecord>> {
        Ok(self.store.get_json(keys::BACKUP)?.unwrap_or_default())
    }

    // ─── Reads ──────────────────────────────────────────────────────────

    pub async fn list(&self) -> Vec<Contact> {
        self.snapshot.lock().await.contacts.clone()
    }

    pub async fn get(&self, id: &str) -> Option<Contact> {
        self.snapshot
            .lock()
            .await
            .contacts
            .iter()
            .find(|c| c.id == id)
            .cloned()
    }

    pub async fn state(&self) -> ContactState {
        self.snapshot.lock().await.clone()
    }

    /// Contacts with their countdown, in the requested order.
    pub async fn summary(&self, order: SortOrder, now: DateTime<Utc>) -> Vec<ContactSummary> {
        let mut contacts = self.list().await;
        order.sort(&mut contacts, now);
        contacts
            .into_iter()
            .map(|contact| ContactSummary {
                next_due: ro_models::next_due_date(contact.last_reached_out, contact.frequency, now),
                status: ReachOutStatus::of(&contact, now),
                contact,
            })
            .collect()
    }

    // ─── Mutations ──────────────────────────────────────────────────────

    /// Add a contact under a freshly generated identifier.
    pub async fn add(&self, new: NewContact) -> RoResult<Contact> {
        let mut snapshot = self.snapshot.lock().await;

        let contact = match check(&Contact::from_new(new)) {
            Ok(contact) => contact,
            Err(e) => {
                apply(&mut snapshot, ContactAction::SetError(invalid_data_message(&e)));
                return Err(e);
            }
        };

        let mut next = snapshot.contacts.clone();
        next.push(contact.clone());
        if let Err(e) = self.persist(&next).await {
            apply(&mut snapshot, ContactAction::SetError("Failed to add contact".into()));
            return Err(e);
        }

        apply(&mut snapshot, ContactAction::AddContact(contact.clone()));
        let count = snapshot.contacts.len();
        drop(snapshot);

        info!("added contact {}", contact.id);
        self.event_bus.emit(AppEvent::ContactsChanged { count });
        Ok(contact)
    }

    /// Add a contact from untrusted JSON fields.
    pub async fn add_value(&self, value: &Value) -> RoResult<Contact> {
        match validate_new_contact(value) {
            Ok(new) => self.add(new).await,
            Err(e) => {
                let mut snapshot = self.snapshot.lock().await;
                apply(&mut snapshot, ContactAction::SetError(invalid_data_message(&e)));
                Err(e)
            }
        }
    }

    /// Add many contacts in one write. Either all are added or none.
    pub async fn import(&self, news: Vec<NewContact>) -> RoResult<Vec<Contact>> {
        let mut snapshot = self.snapshot.lock().await;

        let mut imported = Vec::with_capacity(news.len());
        for new in news {
            match check(&Contact::from_new(new)) {
                Ok(contact) => imported.push(contact),
                Err(e) => {
                    apply(&mut snapshot, ContactAction::SetError(invalid_data_message(&e)));
                    return Err(e);
                }
            }
        }
        if imported.is_empty() {
            return Ok(imported);
        }

        let mut next = snapshot.contacts.clone();
        next.extend(imported.iter().cloned());
        if let Err(e) = self.persist(&next).await {
            apply(&mut snapshot, ContactAction::SetError("Failed to import contacts".into()));
            return Err(e);
        }

        let count = next.len();
        apply(&mut snapshot, ContactAction::SetContacts(next));
        drop(snapshot);

        info!("imported {} contacts", imported.len());
        self.event_bus.emit(AppEvent::ContactsChanged { count });
        Ok(imported)
    }

    /// Replace an existing contact.
    pub async fn update(&self, contact: Contact) -> RoResult<Contact> {
        let mut snapshot = self.snapshot.lock().await;
        let contact = self.update_locked(&mut snapshot, contact, "Failed to update contact").await?;
        let count = snapshot.contacts.len();
        drop(snapshot);

        self.event_bus.emit(AppEvent::ContactsChanged { count });
        Ok(contact)
    }

    async fn update_locked(
        &self,
        snapshot: &mut ContactState,
        contact: Contact,
        failure: &str,
    ) -> RoResult<Contact> {
        let contact = match check(&contact) {
            Ok(contact) => contact,
            Err(e) => {
                apply(snapshot, ContactAction::SetError(invalid_data_message(&e)));
                return Err(e);
            }
        };

        let Some(index) = snapshot.contacts.iter().position(|c| c.id == contact.id) else {
            apply(snapshot, ContactAction::SetError(failure.to_string()));
            return Err(RoError::ContactNotFound(contact.id));
        };

        let mut next = snapshot.contacts.clone();
        next[index] = contact.clone();
        if let Err(e) = self.persist(&next).await {
            apply(snapshot, ContactAction::SetError(failure.to_string()));
            return Err(e);
        }

        apply(snapshot, ContactAction::UpdateContact(contact.clone()));
        debug!("updated contact {}", contact.id);
        Ok(contact)
    }

    /// Stamp a contact as reached out now. Frequency and reminder flag are kept.
    pub async fn mark_reached_out(&self, id: &str) -> RoResult<Contact> {
        self.mark_reached_out_at(id, Utc::now()).await
    }

    pub async fn mark_reached_out_at(&self, id: &str, at: DateTime<Utc>) -> RoResult<Contact> {
        let mut snapshot = self.snapshot.lock().await;
        let failure = "Failed to update reach-out status";

        let Some(mut contact) = snapshot.contacts.iter().find(|c| c.id == id).cloned() else {
            apply(&mut snapshot, ContactAction::SetError(failure.into()));
            return Err(RoError::ContactNotFound(id.to_string()));
        };
        contact.last_reached_out = at;

        let contact = self.update_locked(&mut snapshot, contact, failure).await?;
        let count = snapshot.contacts.len();
        drop(snapshot);

        info!("marked {} as reached out", contact.id);
        self.event_bus.emit(AppEvent::ContactsChanged { count });
        Ok(contact)
    }

    pub async fn delete(&self, id: &str) -> RoResult<()> {
        let mut snapshot = self.snapshot.lock().await;

        if !snapshot.contacts.iter().any(|c| c.id == id) {
            apply(&mut snapshot, ContactAction::SetError("Failed to delete contact".into()));
            return Err(RoError::ContactNotFound(id.to_string()));
        }

        let next: Vec<Contact> = snapshot.contacts.iter().filter(|c| c.id != id).cloned().collect();
        if let Err(e) = self.persist(&next).await {
            apply(&mut snapshot, ContactAction::SetError("Failed to delete contact".into()));
            return Err(e);
        }

        apply(&mut snapshot, ContactAction::DeleteContact(id.to_string()));
        let count = snapshot.contacts.len();
        drop(snapshot);

        if let Err(e) = self.store.remove(&keys::monthly_notification(id)) {
            warn!("failed to remove monthly reminder record for {id}: {e}");
        }
        info!("deleted contact {id}");
        self.event_bus.emit(AppEvent::ContactsChanged { count });
        Ok(())
    }

    /// Remove every contact and the persisted record itself.
    pub async fn clear_all(&self) -> RoResult<()> {
        let mut snapshot = self.snapshot.lock().await;

        if let Err(e) = self.store.remove(keys::CONTACTS) {
            apply(&mut snapshot, ContactAction::SetError("Failed to clear contacts".into()));
            return Err(e);
        }
        apply(&mut snapshot, ContactAction::ClearAll);
        drop(snapshot);

        match self.store.keys_with_prefix(keys::MONTHLY_NOTIFICATION_PREFIX) {
            Ok(side_keys) => {
                for key in side_keys {
                    if let Err(e) = self.store.remove(&key) {
                        warn!("failed to remove {key}: {e}");
                    }
                }
            }
            Err(e) => warn!("failed to list monthly reminder records: {e}"),
        }

        info!("cleared all contacts");
        self.event_bus.emit(AppEvent::ContactsChanged { count: 0 });
        Ok(())
    }

    pub async fn clear_error(&self) {
        apply(&mut *self.snapshot.lock().await, ContactAction::ClearError);
    }

    // ─── Persistence ────────────────────────────────────────────────────

    /// Write the full list, then append it to the backup ring.
    async fn persist(&self, contacts: &[Contact]) -> RoResult<()> {
        let json = serde_json::to_string(contacts)?;
        self.store.set(keys::CONTACTS, &json)?;

        if let Err(e) = self.append_backup(json) {
            warn!("failed to create backup: {e}");
            self.activity
                .warn("Failed to create backup", Some(json!({ "error": e.to_string() })))
                .await;
        }
        Ok(())
    }

    fn append_backup(&self, data: String) -> RoResult<()> {
        let mut ring = match self.store.get_json::<Vec<BackupRecord>>(keys::BACKUP) {
            Ok(ring) => ring.unwrap_or_default(),
            Err(RoError::Serialization(e)) => {
                warn!("backup ring is corrupt, starting a new one: {e}");
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        push_backup(
            &mut ring,
            BackupRecord {
                timestamp: Utc::now(),
                data,
            },
        );
        self.store.set_json(keys::BACKUP, &ring)
    }
}

/// Validate a typed contact the same way stored records are validated.
fn check(contact: &Contact) -> RoResult<Contact> {
    validate_contact(&serde_json::to_value(contact)?)
}

impl Service for ContactStore {
    fn name(&self) -> &str { "contacts" }
    fn state(&self) -> ServiceState { self.state }
    fn init(&mut self) -> RoResult<()> {
        self.state = ServiceState::Running;
        info!("contact store initialized");
        Ok(())
    }
    fn shutdown(&mut self) -> RoResult<()> {
        self.state = ServiceState::Stopped;
        Ok(())
    }
}
