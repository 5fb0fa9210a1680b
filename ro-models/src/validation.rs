//! Schema validation of untrusted contact JSON.
//!
//! Records read back from storage (or handed in by an import) are checked
//! field by field before they are typed. Every violated field is collected so
//! a single failure reports the whole picture.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};

use ro_core::error::{FieldError, RoError, RoResult};

use crate::models::contact::{Contact, Frequency, NewContact, PhoneNumber};
use crate::models::settings::NotificationTime;

const CONTACT_VALIDATION_FAILED: &str = "Contact validation failed";

/// Validate an arbitrary JSON value as a stored contact.
pub fn validate_contact(value: &Value) -> RoResult<Contact> {
    let Some(obj) = value.as_object() else {
        return Err(RoError::Validation {
            message: CONTACT_VALIDATION_FAILED.into(),
            errors: vec![FieldError::new("contact", "Contact must be an object")],
        });
    };

    let mut errors = Vec::new();
    let id = check_id(obj, &mut errors);
    let fields = check_fields(obj, &mut errors);

    match (id, fields, errors.is_empty()) {
        (Some(id), Some(new), true) => Ok(Contact::with_id(id, new)),
        _ => Err(RoError::Validation {
            message: CONTACT_VALIDATION_FAILED.into(),
            errors,
        }),
    }
}

/// Validate a contact that has not been assigned an identifier yet.
/// An `id` field, if present, is ignored.
pub fn validate_new_contact(value: &Value) -> RoResult<NewContact> {
    let Some(obj) = value.as_object() else {
        return Err(RoError::Validation {
            message: CONTACT_VALIDATION_FAILED.into(),
            errors: vec![FieldError::new("contact", "Contact must be an object")],
        });
    };

    let mut errors = Vec::new();
    match check_fields(obj, &mut errors) {
        Some(new) if errors.is_empty() => Ok(new),
        _ => Err(RoError::Validation {
            message: CONTACT_VALIDATION_FAILED.into(),
            errors,
        }),
    }
}

/// Validate a 24-hour `HH:mm` notification time.
pub fn validate_notification_time(raw: &str) -> RoResult<NotificationTime> {
    raw.parse()
}

/// Date-time forms without an offset, read as UTC.
const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse the date forms accepted for `lastReachedOut`. Seconds may be
/// omitted, with or without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    let local = raw.strip_suffix('Z').unwrap_or(raw);
    if let Some(naive) = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
    {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn check_id(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<String> {
    match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() => Some(id.to_string()),
        _ => {
            errors.push(FieldError::new("id", "Invalid or missing ID"));
            None
        }
    }
}

fn check_fields(obj: &Map<String, Value>, errors: &mut Vec<FieldError>) -> Option<NewContact> {
    let name = match obj.get("name").and_then(Value::as_str) {
        Some(name) if !name.trim().is_empty() => Some(name.to_string()),
        _ => {
            errors.push(FieldError::new("name", "Invalid or missing name"));
            None
        }
    };

    let frequency = match obj.get("frequency").and_then(Value::as_str) {
        Some(raw) => raw.parse::<Frequency>().ok(),
        None => None,
    };
    if frequency.is_none() {
        errors.push(FieldError::new("frequency", "Invalid frequency value"));
    }

    let last_reached_out = obj
        .get("lastReachedOut")
        .and_then(Value::as_str)
        .and_then(parse_timestamp);
    if last_reached_out.is_none() {
        errors.push(FieldError::new("lastReachedOut", "Invalid last reached out date"));
    }

    let reminder_enabled = obj.get("reminderEnabled").and_then(Value::as_bool);
    if reminder_enabled.is_none() {
        errors.push(FieldError::new("reminderEnabled", "Invalid reminder enabled value"));
    }

    let phone_numbers = check_phone_numbers(obj.get("phoneNumbers"), errors);
    let email = check_optional_string(obj, "email", "Invalid email value", errors);
    let photo = check_optional_string(obj, "photo", "Invalid photo value", errors);
    let device_contact_id =
        check_optional_string(obj, "deviceContactId", "Invalid device contact ID", errors);

    Some(NewContact {
        name: name?,
        frequency: frequency?,
        last_reached_out: last_reached_out?,
        reminder_enabled: reminder_enabled?,
        phone_numbers: phone_numbers.ok()?,
        email: email.ok()?,
        photo: photo.ok()?,
        device_contact_id: device_contact_id.ok()?,
    })
}

// Optional fields: absent or null is fine, a wrong type is an error.

fn check_optional_string(
    obj: &Map<String, Value>,
    field: &str,
    message: &str,
    errors: &mut Vec<FieldError>,
) -> Result<Option<String>, ()> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => {
            errors.push(FieldError::new(field, message));
            Err(())
        }
    }
}

fn check_phone_numbers(
    value: Option<&Value>,
    errors: &mut Vec<FieldError>,
) -> Result<Option<Vec<PhoneNumber>>, ()> {
    let items = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Array(items)) => items,
        Some(_) => {
            errors.push(FieldError::new("phoneNumbers", "Invalid phone numbers value"));
            return Err(());
        }
    };

    let mut phones = Vec::with_capacity(items.len());
    for item in items {
        let label = item.get("label").and_then(Value::as_str);
        let number = item.get("number").and_then(Value::as_str);
        match (label, number) {
            (Some(label), Some(number)) => phones.push(PhoneNumber {
                label: label.to_string(),
                number: number.to_string(),
            }),
            _ => {
                errors.push(FieldError::new("phoneNumbers", "Invalid phone numbers value"));
                return Err(());
            }
        }
    }
    Ok(Some(phones))
}
