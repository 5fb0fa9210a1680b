//! Persisted record types.

pub mod contact;
pub mod settings;
pub mod backup;
pub mod reminder;
pub mod log_entry;
