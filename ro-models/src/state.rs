//! In-memory store state and the pure reducers that advance it.
//!
//! Stores apply an action only after the matching write has been committed,
//! so the state never runs ahead of what is persisted.

use serde::Serialize;

use crate::models::contact::Contact;
use crate::models::settings::Settings;

/// Snapshot held by the contact store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContactState {
    pub contacts: Vec<Contact>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactAction {
    SetContacts(Vec<Contact>),
    AddContact(Contact),
    UpdateContact(Contact),
    DeleteContact(String),
    ClearAll,
    SetLoading(bool),
    SetError(String),
    ClearError,
}

/// Apply a contact action. Updating or deleting an unknown id is a no-op.
pub fn reduce_contacts(mut state: ContactState, action: ContactAction) -> ContactState {
    match action {
        ContactAction::SetContacts(contacts) => {
            state.contacts = contacts;
            state.loading = false;
        }
        ContactAction::AddContact(contact) => state.contacts.push(contact),
        ContactAction::UpdateContact(contact) => {
            if let Some(slot) = state.contacts.iter_mut().find(|c| c.id == contact.id) {
                *slot = contact;
            }
        }
        ContactAction::DeleteContact(id) => state.contacts.retain(|c| c.id != id),
        ContactAction::ClearAll => state.contacts.clear(),
        ContactAction::SetLoading(loading) => state.loading = loading,
        ContactAction::SetError(error) => {
            state.error = Some(error);
            state.loading = false;
        }
        ContactAction::ClearError => state.error = None,
    }
    state
}

/// Snapshot held by the settings store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SettingsState {
    pub settings: Settings,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsAction {
    SetSettings(Settings),
    SetLoading(bool),
    SetError(String),
    ClearError,
}

pub fn reduce_settings(mut state: SettingsState, action: SettingsAction) -> SettingsState {
    match action {
        SettingsAction::SetSettings(settings) => {
            state.settings = settings;
            state.loading = false;
        }
        SettingsAction::SetLoading(loading) => state.loading = loading,
        SettingsAction::SetError(error) => {
            state.error = Some(error);
            state.loading = false;
        }
        SettingsAction::ClearError => state.error = None,
    }
    state
}
