use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotKey {
    Breakfast,
    #[serde(rename = "SNACK_1")]
    Snack1,
    Lunch,
    #[serde(rename = "SNACK_2")]
    Snack2,
    Dinner,
    Dessert,
    Supper,
}

impl SlotKey {
    pub const ALL: [SlotKey; 7] = [
        SlotKey::Breakfast,
        SlotKey::Snack1,
        SlotKey::Lunch,
        SlotKey::Snack2,
        SlotKey::Dinner,
        SlotKey::Dessert,
        SlotKey::Supper,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SlotKey::Breakfast => "BREAKFAST",
            SlotKey::Snack1 => "SNACK_1",
            SlotKey::Lunch => "LUNCH",
            SlotKey::Snack2 => "SNACK_2",
            SlotKey::Dinner => "DINNER",
            SlotKey::Dessert => "DESSERT",
            SlotKey::Supper => "SUPPER",
        }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown meal slot '{0}'")]
pub struct UnknownSlotKey(pub String);

impl FromStr for SlotKey {
    type Err = UnknownSlotKey;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        SlotKey::ALL
            .into_iter()
            .find(|key| key.as_str() == value)
            .ok_or_else(|| UnknownSlotKey(value.to_string()))
    }
}

/// A browser push endpoint together with the keys needed to encrypt for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    /// IANA zone name reported by the browser, e.g. `Europe/Stockholm`.
    pub tz: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealSlot {
    pub slot_key: SlotKey,
    pub order_index: i64,
    /// Raw `HH:MM` value as stored; validated when a reminder is armed.
    pub time_24h: String,
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12")]
    Twelve,
    #[serde(rename = "24")]
    TwentyFour,
}

impl TimeFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeFormat::Twelve => "12",
            TimeFormat::TwentyFour => "24",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "12" => Some(TimeFormat::Twelve),
            "24" => Some(TimeFormat::TwentyFour),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub reminders_enabled: bool,
    pub time_format: TimeFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            reminders_enabled: false,
            time_format: TimeFormat::Twelve,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
}

/// Icon paths embedded in every reminder payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAssets {
    pub icon: String,
    pub badge: String,
}

impl Default for NotificationAssets {
    fn default() -> Self {
        Self {
            icon: "/icon-192.png".to_string(),
            badge: "/badge-72.png".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}
