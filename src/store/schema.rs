//! SQLite DDL and first-run seed data for the tracker database.

use rusqlite::{Connection, params};

/// Uses `IF NOT EXISTS` throughout so `apply_schema` is idempotent.
pub(crate) const SCHEMA_SQL: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS settings (
    id                INTEGER PRIMARY KEY,
    reminders_enabled INTEGER NOT NULL DEFAULT 0,
    time_format       TEXT NOT NULL DEFAULT '12' CHECK(time_format IN ('12','24')),
    created_at        TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at        TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS meal_plan_slots (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    slot_key    TEXT NOT NULL UNIQUE CHECK(slot_key IN
                    ('BREAKFAST','SNACK_1','LUNCH','SNACK_2','DINNER','DESSERT','SUPPER')),
    order_index INTEGER NOT NULL,
    time_24h    TEXT NOT NULL,
    name        TEXT NOT NULL,
    notes       TEXT,
    created_at  TEXT NOT NULL DEFAULT (datetime('now')),
    updated_at  TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS push_subscriptions (
    id           INTEGER PRIMARY KEY AUTOINCREMENT,
    endpoint     TEXT NOT NULL UNIQUE,
    p256dh       TEXT NOT NULL,
    auth         TEXT NOT NULL,
    tz           TEXT NOT NULL,
    user_agent   TEXT,
    enabled      INTEGER NOT NULL DEFAULT 1,
    created_at   TEXT NOT NULL DEFAULT (datetime('now')),
    last_seen_at TEXT
);
"#;

/// (slot key, order index, time, display name) inserted when the slot table is empty.
pub(crate) const DEFAULT_MEAL_SLOTS: [(&str, i64, &str, &str); 7] = [
    ("BREAKFAST", 0, "08:00", "Breakfast"),
    ("SNACK_1", 1, "10:00", "Morning Snack"),
    ("LUNCH", 2, "12:00", "Lunch"),
    ("SNACK_2", 3, "15:00", "Afternoon Snack"),
    ("DINNER", 4, "18:00", "Dinner"),
    ("DESSERT", 5, "19:30", "Dessert"),
    ("SUPPER", 6, "21:00", "Supper"),
];

pub(crate) fn apply_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}

/// Inserts the settings row and the seven default slots on a fresh database.
pub(crate) fn seed_defaults(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO settings (id, reminders_enabled, time_format) VALUES (1, 0, '12')",
        [],
    )?;

    let slot_count: i64 = conn.query_row("SELECT COUNT(*) FROM meal_plan_slots", [], |row| {
        row.get(0)
    })?;
    if slot_count == 0 {
        for (slot_key, order_index, time_24h, name) in DEFAULT_MEAL_SLOTS {
            conn.execute(
                "INSERT INTO meal_plan_slots (slot_key, order_index, time_24h, name) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![slot_key, order_index, time_24h, name],
            )?;
        }
        tracing::info!("seeded default meal slots");
    }
    Ok(())
}
