//! Database schema management.

use rusqlite::Connection;
use tokio_rusqlite::Error;

/// Enable WAL and create the three collections.
pub fn init_schema(conn: &Connection) -> Result<(), Error> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "busy_timeout", 5000)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS services (
    service_key TEXT PRIMARY KEY,
    service_type TEXT,
    display_name TEXT,
    service_group TEXT NOT NULL DEFAULT 'default',
    expected_period INTEGER,
    dead_after INTEGER,
    status TEXT NOT NULL,
    alerts_enabled INTEGER NOT NULL DEFAULT 1,
    updated_at TEXT,
    last_seen TEXT,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS heartbeats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    service_key TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    metadata TEXT NOT NULL DEFAULT '{}'
);

CREATE TABLE IF NOT EXISTS state_transitions (
    id TEXT PRIMARY KEY,
    service_key TEXT NOT NULL,
    from_state TEXT NOT NULL,
    to_state TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    alerted INTEGER NOT NULL DEFAULT 0,
    alert_message TEXT
);

CREATE INDEX IF NOT EXISTS idx_heartbeats_key_ts ON heartbeats(service_key, timestamp);
CREATE INDEX IF NOT EXISTS idx_heartbeats_ts ON heartbeats(timestamp);
CREATE INDEX IF NOT EXISTS idx_transitions_ts ON state_transitions(timestamp);
CREATE INDEX IF NOT EXISTS idx_transitions_key_alerted ON state_transitions(service_key, alerted);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_creation() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();

        for table in ["services", "heartbeats", "state_transitions"] {
            let mut stmt = conn
                .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name=?1")
                .unwrap();
            assert!(stmt.exists([table]).unwrap(), "missing table {}", table);
        }
    }

    #[test]
    fn test_schema_is_reentrant() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
    }
}
