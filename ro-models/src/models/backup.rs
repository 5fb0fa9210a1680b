//! Backup ring of prior contact-list snapshots.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ro_core::constants::MAX_BACKUPS;

use crate::models::contact::Contact;

/// One snapshot of the persisted contact list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub timestamp: DateTime<Utc>,
    /// The contact list as it was written, serialized JSON.
    pub data: String,
}

impl BackupRecord {
    /// Snapshot a contact list.
    pub fn snapshot(contacts: &[Contact], timestamp: DateTime<Utc>) -> serde_json::Result<Self> {
        Ok(Self {
            timestamp,
            data: serde_json::to_string(contacts)?,
        })
    }
}

/// Push a snapshot to the front of the ring, dropping the oldest past capacity.
pub fn push_backup(ring: &mut Vec<BackupRecord>, record: BackupRecord) {
    ring.insert(0, record);
    ring.truncate(MAX_BACKUPS);
}
