//! Global reminder settings record.

use std::str::FromStr;

use chrono::NaiveTime;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use ro_core::constants::DEFAULT_NOTIFICATION_TIME;
use ro_core::error::RoError;

lazy_static! {
    /// 24-hour `HH:mm`, zero-padded.
    static ref HH_MM: Regex = Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap();
}

/// Time of day reminders fire at, 24-hour clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationTime {
    hour: u32,
    minute: u32,
}

impl NotificationTime {
    /// Build from components; `None` if out of range.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    /// As a wall-clock time with zero seconds.
    pub fn as_naive_time(&self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for NotificationTime {
    fn default() -> Self {
        DEFAULT_NOTIFICATION_TIME
            .parse()
            .unwrap_or(Self { hour: 9, minute: 0 })
    }
}

impl FromStr for NotificationTime {
    type Err = RoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = HH_MM
            .captures(s)
            .ok_or_else(|| RoError::InvalidTime(format!("{s:?} is not HH:mm (24-hour)")))?;
        let hour = caps[1].parse().map_err(|_| RoError::InvalidTime(s.to_string()))?;
        let minute = caps[2].parse().map_err(|_| RoError::InvalidTime(s.to_string()))?;
        Ok(Self { hour, minute })
    }
}

impl std::fmt::Display for NotificationTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

impl Serialize for NotificationTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for NotificationTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The persisted `settings` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default = "default_true")]
    pub global_notifications: bool,
    #[serde(default)]
    pub notification_time: NotificationTime,
}

fn default_true() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            global_notifications: true,
            notification_time: NotificationTime::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_times() {
        assert_eq!("00:00".parse::<NotificationTime>().unwrap(), NotificationTime::new(0, 0).unwrap());
        assert_eq!("23:59".parse::<NotificationTime>().unwrap().to_string(), "23:59");
        assert_eq!("09:05".parse::<NotificationTime>().unwrap().minute(), 5);
    }

    #[test]
    fn test_parse_invalid_times() {
        for bad in ["24:00", "9:00", "12:60", "12-30", "", "12:30:00", " 12:30"] {
            assert!(bad.parse::<NotificationTime>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.global_notifications);
        assert_eq!(settings.notification_time.to_string(), "09:00");
    }

    #[test]
    fn test_settings_json_shape() {
        let json = serde_json::to_string(&Settings::default()).unwrap();
        assert_eq!(json, r#"{"globalNotifications":true,"notificationTime":"09:00"}"#);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let settings: Settings = serde_json::from_str(r#"{"globalNotifications":false}"#).unwrap();
        assert!(!settings.global_notifications);
        assert_eq!(settings.notification_time, NotificationTime::default());
    }

    #[test]
    fn test_invalid_time_rejected_on_deserialize() {
        assert!(serde_json::from_str::<Settings>(r#"{"notificationTime":"25:00"}"#).is_err());
    }
}
