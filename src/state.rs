use crate::config::AppConfig;
use crate::reminders::{RebuildTrigger, ScheduleTable};
use crate::store::SqliteStore;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<SqliteStore>,
    pub reminders: RebuildTrigger,
    pub schedule: Arc<ScheduleTable>,
}
