use std::path::PathBuf;
use std::time::Duration;

use crate::types::reminders::NotificationAssets;

pub const DEFAULT_DATABASE_PATH: &str = "./data/nourish.sqlite";
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub notification_icon: String,
    pub notification_badge: String,
    pub push_timeout: Duration,
}

impl AppConfig {
    pub fn notification_assets(&self) -> NotificationAssets {
        NotificationAssets {
            icon: self.notification_icon.clone(),
            badge: self.notification_badge.clone(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        let assets = NotificationAssets::default();
        Self {
            database_path: DEFAULT_DATABASE_PATH.into(),
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            notification_icon: assets.icon,
            notification_badge: assets.badge,
            push_timeout: DEFAULT_PUSH_TIMEOUT,
        }
    }
}
