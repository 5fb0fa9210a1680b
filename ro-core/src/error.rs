//! Global error types for the ReachOut application.
//!
//! All error categories across the application are unified into a single
//! `RoError` enum with conversions from underlying library errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience type alias for Results using RoError.
pub type RoResult<T> = Result<T, RoError>;

/// A single violated field reported by record validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field as it appears in the persisted JSON.
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Unified error type covering all error categories in ReachOut.
#[derive(Error, Debug)]
pub enum RoError {
    // -- Configuration errors --
    /// Failed to load or parse application configuration.
    #[error("configuration error: {0}")]
    Config(String),

    // -- Validation errors --
    /// A record failed schema validation. Every violated field is listed.
    #[error("{message}: {}", join_field_errors(.errors))]
    Validation {
        /// Summary of what was being validated.
        message: String,
        /// All field-level violations, in field order.
        errors: Vec<FieldError>,
    },

    /// Notification time is not a 24-hour `HH:mm` string.
    #[error("invalid notification time: {0}")]
    InvalidTime(String),

    // -- Persistence errors --
    /// Reading a persisted record failed.
    #[error("storage read error ({key}): {message}")]
    StorageRead {
        /// Record key.
        key: String,
        /// Underlying failure.
        message: String,
    },

    /// Writing a persisted record failed; the mutation was not committed.
    #[error("storage write error ({key}): {message}")]
    StorageWrite {
        /// Record key.
        key: String,
        /// Underlying failure.
        message: String,
    },

    /// SQLite database error.
    #[error("database error: {0}")]
    Database(String),

    /// Database migration failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// Database connection pool error.
    #[error("connection pool error: {0}")]
    Pool(String),

    // -- Domain errors --
    /// No contact with the given identifier.
    #[error("contact not found: {0}")]
    ContactNotFound(String),

    // -- Notification errors --
    /// The platform refused to schedule a reminder for a contact.
    #[error("failed to schedule reminder for {contact_id}: {message}")]
    Scheduling {
        /// Contact the reminder belongs to.
        contact_id: String,
        /// Underlying failure.
        message: String,
    },

    /// Desktop notification failed.
    #[error("notification error: {0}")]
    Notification(String),

    // -- File/IO errors --
    /// File system operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    // -- Service errors --
    /// A service failed to initialize.
    #[error("service init error: {0}")]
    ServiceInit(String),

    // -- Generic --
    /// An unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),

    /// Wrapping anyhow errors for interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RoError {
    /// Field-level errors if this is a validation failure, otherwise empty.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            RoError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }

    /// Whether this error came from a failed persistence write.
    pub fn is_write_failure(&self) -> bool {
        matches!(self, RoError::StorageWrite { .. })
    }
}

fn join_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for RoError {
    fn from(e: serde_json::Error) -> Self {
        RoError::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for RoError {
    fn from(e: toml::de::Error) -> Self {
        RoError::Config(e.to_string())
    }
}
