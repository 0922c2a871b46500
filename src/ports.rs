pub mod push;
pub mod store;
pub mod time;

pub use push::{DeliveryResult, PushSender};
pub use store::ReminderStore;
pub use time::TimeProvider;
