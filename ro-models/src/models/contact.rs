//! Contact entity model.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use ro_core::error::{FieldError, RoError};

use crate::models::reminder::RepeatInterval;

/// Desired contact cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    /// All accepted frequencies, in cadence order.
    pub const ALL: [Frequency; 3] = [Frequency::Daily, Frequency::Weekly, Frequency::Monthly];

    /// The persisted string form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// Native repeat interval for the platform scheduler. Month lengths vary,
    /// so monthly reminders are re-armed explicitly each cycle instead.
    pub fn repeat_interval(&self) -> Option<RepeatInterval> {
        match self {
            Frequency::Daily => Some(RepeatInterval::Day),
            Frequency::Weekly => Some(RepeatInterval::Week),
            Frequency::Monthly => None,
        }
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = RoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(RoError::Validation {
                message: "Invalid frequency".into(),
                errors: vec![FieldError::new(
                    "frequency",
                    format!("Invalid frequency value: {other}"),
                )],
            }),
        }
    }
}

/// A labelled phone number copied from the device address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber {
    pub label: String,
    pub number: String,
}

/// A person the user wants to keep in touch with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub frequency: Frequency,
    pub last_reached_out: DateTime<Utc>,
    pub reminder_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<PhoneNumber>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Local path or URI of the contact photo.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    /// Record identifier of the device contact this was imported from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_contact_id: Option<String>,
}

impl Contact {
    /// Build a contact from submitted fields with a freshly generated identifier.
    pub fn from_new(new: NewContact) -> Self {
        Self::with_id(generate_id(), new)
    }

    /// Build a contact from submitted fields with a given identifier.
    pub fn with_id(id: String, new: NewContact) -> Self {
        Self {
            id,
            name: new.name,
            frequency: new.frequency,
            last_reached_out: new.last_reached_out,
            reminder_enabled: new.reminder_enabled,
            phone_numbers: new.phone_numbers,
            email: new.email,
            photo: new.photo,
            device_contact_id: new.device_contact_id,
        }
    }

    /// Primary phone number, if any.
    pub fn primary_phone(&self) -> Option<&str> {
        self.phone_numbers
            .as_ref()
            .and_then(|phones| phones.first())
            .map(|p| p.number.as_str())
    }

    /// Up to two initials for avatar placeholders.
    pub fn initials(&self) -> String {
        self.name
            .split_whitespace()
            .filter_map(|part| part.chars().next())
            .take(2)
            .flat_map(|c| c.to_uppercase())
            .collect()
    }
}

/// Fresh contact identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Contact fields as submitted by the user, before an identifier is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewContact {
    pub name: String,
    pub frequency: Frequency,
    pub last_reached_out: DateTime<Utc>,
    pub reminder_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_numbers: Option<Vec<PhoneNumber>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_contact_id: Option<String>,
}

impl NewContact {
    /// A contact last reached now, with reminders enabled.
    pub fn new(name: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            name: name.into(),
            frequency,
            last_reached_out: Utc::now(),
            reminder_enabled: true,
            phone_numbers: None,
            email: None,
            photo: None,
            device_contact_id: None,
        }
    }
}

/// A contact as exported from the device address book.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceContact {
    #[serde(rename = "recordID")]
    pub record_id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub phone_numbers: Vec<PhoneNumber>,
    #[serde(default)]
    pub email_addresses: Vec<DeviceEmail>,
    #[serde(default)]
    pub thumbnail_path: Option<String>,
}

/// A labelled email address from the device address book.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceEmail {
    #[serde(default)]
    pub label: String,
    pub email: String,
}

impl DeviceContact {
    /// Name shown for the contact: the display name, or given + family name.
    /// `None` when the device record has no usable name.
    pub fn resolved_name(&self) -> Option<String> {
        if let Some(name) = self.display_name.as_deref().map(str::trim) {
            if !name.is_empty() {
                return Some(name.to_string());
            }
        }
        let given = self.given_name.as_deref().unwrap_or("").trim();
        if given.is_empty() {
            return None;
        }
        let family = self.family_name.as_deref().unwrap_or("").trim();
        Some(format!("{given} {family}").trim_end().to_string())
    }

    /// Convert into submitted contact fields, or `None` if the record has no name.
    pub fn into_new_contact(
        self,
        frequency: Frequency,
        reminder_enabled: bool,
        now: DateTime<Utc>,
    ) -> Option<NewContact> {
        let name = self.resolved_name()?;
        Some(NewContact {
            name,
            frequency,
            last_reached_out: now,
            reminder_enabled,
            phone_numbers: if self.phone_numbers.is_empty() {
                None
            } else {
                Some(self.phone_numbers)
            },
            email: self.email_addresses.into_iter().next().map(|e| e.email),
            photo: self.thumbnail_path.filter(|p| !p.is_empty()),
            device_contact_id: Some(self.record_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Contact {
        Contact {
            id: "c1".into(),
            name: "Ada Lovelace".into(),
            frequency: Frequency::Weekly,
            last_reached_out: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            reminder_enabled: true,
            phone_numbers: Some(vec![PhoneNumber {
                label: "mobile".into(),
                number: "+44 20 7946 0000".into(),
            }]),
            email: None,
            photo: None,
            device_contact_id: Some("dev-9".into()),
        }
    }

    #[test]
    fn test_contact_json_field_names() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["id"], "c1");
        assert_eq!(json["frequency"], "weekly");
        assert_eq!(json["reminderEnabled"], true);
        assert_eq!(json["lastReachedOut"], "2024-03-01T12:00:00Z");
        assert_eq!(json["deviceContactId"], "dev-9");
        assert!(json.get("email").is_none());
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("monthly".parse::<Frequency>().unwrap(), Frequency::Monthly);
        let err = "yearly".parse::<Frequency>().unwrap_err();
        assert_eq!(err.field_errors()[0].field, "frequency");
    }

    #[test]
    fn test_repeat_interval() {
        assert_eq!(Frequency::Daily.repeat_interval(), Some(RepeatInterval::Day));
        assert_eq!(Frequency::Weekly.repeat_interval(), Some(RepeatInterval::Week));
        assert_eq!(Frequency::Monthly.repeat_interval(), None);
    }

    #[test]
    fn test_initials_and_phone() {
        let c = sample();
        assert_eq!(c.initials(), "AL");
        assert_eq!(c.primary_phone(), Some("+44 20 7946 0000"));
    }

    #[test]
    fn test_from_new_assigns_unique_ids() {
        let a = Contact::from_new(NewContact::new("A", Frequency::Daily));
        let b = Contact::from_new(NewContact::new("B", Frequency::Daily));
        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
    }

    #[test]
    fn test_device_contact_name_resolution() {
        let named = DeviceContact {
            record_id: "1".into(),
            display_name: Some("Grace Hopper".into()),
            ..Default::default()
        };
        assert_eq!(named.resolved_name().as_deref(), Some("Grace Hopper"));

        let split = DeviceContact {
            record_id: "2".into(),
            display_name: Some("  ".into()),
            given_name: Some("Alan".into()),
            family_name: Some("Turing".into()),
            ..Default::default()
        };
        assert_eq!(split.resolved_name().as_deref(), Some("Alan Turing"));

        let nameless = DeviceContact {
            record_id: "3".into(),
            ..Default::default()
        };
        assert!(nameless.resolved_name().is_none());
    }

    #[test]
    fn test_device_contact_parses_export_format() {
        let raw = r#"{
            "recordID": "77",
            "givenName": "Katherine",
            "familyName": "Johnson",
            "phoneNumbers": [{"label": "home", "number": "555-0100"}],
            "emailAddresses": [{"label": "work", "email": "kj@example.com"}]
        }"#;
        let device: DeviceContact = serde_json::from_str(raw).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let new = device.into_new_contact(Frequency::Monthly, true, now).unwrap();

        assert_eq!(new.name, "Katherine Johnson");
        assert_eq!(new.email.as_deref(), Some("kj@example.com"));
        assert_eq!(new.device_contact_id.as_deref(), Some("77"));
        assert_eq!(new.phone_numbers.unwrap()[0].number, "555-0100");
        assert_eq!(new.last_reached_out, now);
    }
}
