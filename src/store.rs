//! SQLite-backed storage for settings, meal slots and push subscriptions.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};

use crate::error::StoreError;
use crate::ports;
use crate::types::reminders::{MealSlot, Settings, SlotKey, Subscription, TimeFormat};

mod schema;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Single-connection store; every access goes through the mutex, so writes are serialized.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file, applying the schema and first-run seed.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        schema::apply_schema(&conn)?;
        schema::seed_defaults(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|e| StoreError::Lock(e.to_string()))
    }

    pub fn settings(&self) -> Result<Settings, StoreError> {
        let conn = self.lock()?;
        let row: Option<(bool, String)> = conn
            .query_row(
                "SELECT reminders_enabled, time_format FROM settings ORDER BY id LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((reminders_enabled, time_format)) = row else {
            return Ok(Settings::default());
        };
        let time_format =
            TimeFormat::parse(&time_format).ok_or_else(|| StoreError::InvalidValue {
                column: "settings.time_format",
                value: time_format.clone(),
            })?;
        Ok(Settings {
            reminders_enabled,
            time_format,
        })
    }

    pub fn update_settings(&self, settings: Settings) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO settings (id, reminders_enabled, time_format) VALUES (1, ?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET reminders_enabled = excluded.reminders_enabled, \
             time_format = excluded.time_format, updated_at = datetime('now')",
            params![settings.reminders_enabled, settings.time_format.as_str()],
        )?;
        Ok(())
    }

    /// Creates the subscription, or refreshes keys and timezone and re-enables it.
    pub fn upsert_subscription(
        &self,
        subscription: &Subscription,
        user_agent: Option<&str>,
    ) -> Result<UpsertOutcome, StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE push_subscriptions SET p256dh = ?2, auth = ?3, tz = ?4, user_agent = ?5, \
             enabled = 1, last_seen_at = datetime('now') WHERE endpoint = ?1",
            params![
                subscription.endpoint,
                subscription.p256dh,
                subscription.auth,
                subscription.tz,
                user_agent
            ],
        )?;
        if updated > 0 {
            return Ok(UpsertOutcome::Updated);
        }
        conn.execute(
            "INSERT INTO push_subscriptions (endpoint, p256dh, auth, tz, user_agent, enabled) \
             VALUES (?1, ?2, ?3, ?4, ?5, 1)",
            params![
                subscription.endpoint,
                subscription.p256dh,
                subscription.auth,
                subscription.tz,
                user_agent
            ],
        )?;
        Ok(UpsertOutcome::Created)
    }

    /// Touches `last_seen_at`; returns whether the endpoint is known.
    pub fn record_heartbeat(&self, endpoint: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE push_subscriptions SET last_seen_at = datetime('now') WHERE endpoint = ?1",
            params![endpoint],
        )?;
        Ok(updated > 0)
    }

    /// Rewrites order, time, name and notes of the given slots in one transaction.
    pub fn update_meal_slots(&self, slots: &[MealSlot]) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for slot in slots {
            tx.execute(
                "UPDATE meal_plan_slots SET order_index = ?2, time_24h = ?3, name = ?4, \
                 notes = ?5, updated_at = datetime('now') WHERE slot_key = ?1",
                params![
                    slot.slot_key.as_str(),
                    slot.order_index,
                    slot.time_24h,
                    slot.name,
                    slot.notes
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl ports::ReminderStore for SqliteStore {
    fn reminders_enabled(&self) -> Result<bool, StoreError> {
        Ok(self.settings()?.reminders_enabled)
    }

    fn list_enabled_subscriptions(&self) -> Result<Vec<Subscription>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT endpoint, p256dh, auth, tz FROM push_subscriptions \
             WHERE enabled = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Subscription {
                endpoint: row.get(0)?,
                p256dh: row.get(1)?,
                auth: row.get(2)?,
                tz: row.get(3)?,
            })
        })?;
        let subscriptions = rows.collect::<Result<Vec<_>, _>>()?;
        Ok(subscriptions)
    }

    fn list_meal_slots(&self) -> Result<Vec<MealSlot>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT slot_key, order_index, time_24h, name, notes FROM meal_plan_slots \
             ORDER BY order_index, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, Option<String>>(4)?,
            ))
        })?;

        let mut slots = Vec::new();
        for row in rows {
            let (slot_key, order_index, time_24h, name, notes) = row?;
            let slot_key: SlotKey = slot_key.parse().map_err(|_| StoreError::InvalidValue {
                column: "meal_plan_slots.slot_key",
                value: slot_key.clone(),
            })?;
            slots.push(MealSlot {
                slot_key,
                order_index,
                time_24h,
                name,
                notes,
            });
        }
        Ok(slots)
    }

    fn delete_subscription(&self, endpoint: &str) -> Result<bool, StoreError> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM push_subscriptions WHERE endpoint = ?1",
            params![endpoint],
        )?;
        Ok(deleted > 0)
    }
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use crate::ports::ReminderStore;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().expect("open store")
    }

    fn subscription(endpoint: &str, tz: &str) -> Subscription {
        Subscription {
            endpoint: endpoint.to_string(),
            p256dh: "p256".to_string(),
            auth: "auth".to_string(),
            tz: tz.to_string(),
        }
    }

    #[test]
    fn open_in_memory__should_seed_defaults() {
        // When
        let store = store();

        // Then
        let settings = store.settings().expect("settings");
        assert!(!settings.reminders_enabled);
        assert_eq!(settings.time_format, TimeFormat::Twelve);

        let slots = store.list_meal_slots().expect("slots");
        let keys: Vec<SlotKey> = slots.iter().map(|slot| slot.slot_key).collect();
        assert_eq!(keys, SlotKey::ALL.to_vec());
        assert_eq!(slots[0].time_24h, "08:00");
        assert_eq!(slots[5].name, "Dessert");
        assert_eq!(slots[5].time_24h, "19:30");
    }

    #[test]
    fn open__should_create_parent_directory_and_reopen() {
        // Given
        let root = std::env::temp_dir().join(format!("nourish-store-{}", std::process::id()));
        let path = root.join("nested").join("nourish.sqlite");

        // When
        {
            let store = SqliteStore::open(&path).expect("open store");
            store
                .update_settings(Settings {
                    reminders_enabled: true,
                    time_format: TimeFormat::TwentyFour,
                })
                .expect("update settings");
        }
        let reopened = SqliteStore::open(&path).expect("reopen store");

        // Then
        assert!(reopened.reminders_enabled().expect("enabled"));
        assert_eq!(reopened.list_meal_slots().expect("slots").len(), 7);

        std::fs::remove_dir_all(&root).expect("cleanup");
    }

    #[test]
    fn update_settings__should_round_trip() {
        let store = store();

        store
            .update_settings(Settings {
                reminders_enabled: true,
                time_format: TimeFormat::TwentyFour,
            })
            .expect("update settings");

        let settings = store.settings().expect("settings");
        assert!(settings.reminders_enabled);
        assert_eq!(settings.time_format, TimeFormat::TwentyFour);
        assert!(store.reminders_enabled().expect("enabled"));
    }

    #[test]
    fn upsert_subscription__should_create_then_update() {
        // Given
        let store = store();
        let first = subscription("https://push.example/1", "Europe/Stockholm");

        // When
        let created = store.upsert_subscription(&first, Some("Firefox")).expect("create");
        let moved = subscription("https://push.example/1", "America/New_York");
        let updated = store.upsert_subscription(&moved, None).expect("update");

        // Then
        assert_eq!(created, UpsertOutcome::Created);
        assert_eq!(updated, UpsertOutcome::Updated);
        let subscriptions = store.list_enabled_subscriptions().expect("list");
        assert_eq!(subscriptions, vec![moved]);
    }

    #[test]
    fn upsert_subscription__should_re_enable_disabled_subscription() {
        // Given
        let store = store();
        let sub = subscription("https://push.example/1", "UTC");
        store.upsert_subscription(&sub, None).expect("create");
        store
            .lock()
            .expect("lock")
            .execute("UPDATE push_subscriptions SET enabled = 0", [])
            .expect("disable");
        assert!(store.list_enabled_subscriptions().expect("list").is_empty());

        // When
        store.upsert_subscription(&sub, None).expect("resubscribe");

        // Then
        assert_eq!(store.list_enabled_subscriptions().expect("list").len(), 1);
    }

    #[test]
    fn delete_subscription__should_be_idempotent() {
        // Given
        let store = store();
        store
            .upsert_subscription(&subscription("https://push.example/1", "UTC"), None)
            .expect("create");
        store
            .upsert_subscription(&subscription("https://push.example/2", "UTC"), None)
            .expect("create");

        // When
        let first = store
            .delete_subscription("https://push.example/1")
            .expect("delete");
        let second = store
            .delete_subscription("https://push.example/1")
            .expect("delete again");

        // Then
        assert!(first);
        assert!(!second);
        let remaining = store.list_enabled_subscriptions().expect("list");
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].endpoint, "https://push.example/2");
    }

    #[test]
    fn record_heartbeat__should_report_unknown_endpoints() {
        let store = store();
        store
            .upsert_subscription(&subscription("https://push.example/1", "UTC"), None)
            .expect("create");

        assert!(store.record_heartbeat("https://push.example/1").expect("heartbeat"));
        assert!(!store.record_heartbeat("https://push.example/404").expect("heartbeat"));

        let last_seen: Option<String> = store
            .lock()
            .expect("lock")
            .query_row(
                "SELECT last_seen_at FROM push_subscriptions WHERE endpoint = ?1",
                params!["https://push.example/1"],
                |row| row.get(0),
            )
            .expect("last seen");
        assert!(last_seen.is_some());
    }

    #[test]
    fn update_meal_slots__should_rewrite_slots_and_keep_order() {
        // Given
        let store = store();
        let mut slots = store.list_meal_slots().expect("slots");
        slots[0].time_24h = "07:15".to_string();
        slots[0].name = "Early Breakfast".to_string();
        slots[6].notes = Some("light".to_string());

        // When
        store.update_meal_slots(&slots).expect("update slots");

        // Then
        let stored = store.list_meal_slots().expect("slots");
        assert_eq!(stored, slots);
    }
}
