use crate::error::StoreError;
use crate::types::reminders::{MealSlot, Subscription};

/// The reads and the single write the reminder scheduler needs from storage.
pub trait ReminderStore: Send + Sync + 'static {
    fn reminders_enabled(&self) -> Result<bool, StoreError>;
    fn list_enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError>;
    fn list_meal_slots(&self) -> Result<Vec<MealSlot>, StoreError>;
    /// Returns `false` when no row matched; deleting twice is not an error.
    fn delete_subscription(&self, endpoint: &str) -> Result<bool, StoreError>;
}
