//! SQLite store backend.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;
use tracing::debug;

use svcwatch_protocols::{
    Heartbeat, HeartbeatLog, Metadata, Service, ServicePatch, ServiceStatus, ServiceStore,
    ServiceType, StateTransition, StatusChange, StoreError, TransitionFilter, TransitionLog,
};

use crate::schema::init_schema;

#[cfg(test)]
#[path = "sqlite_tests.rs"]
mod tests;

const SERVICE_COLUMNS: &str = "service_key, service_type, display_name, service_group, \
     expected_period, dead_after, status, alerts_enabled, updated_at, last_seen, metadata";

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open an in-memory database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::init(conn).await
    }

    /// Open (or create) a database file.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", parent.display(), e)))?;
        }
        let conn = Connection::open(&path)
            .await
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        debug!("SQLite store opened at {:?}", path);
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.call(|conn| init_schema(conn))
            .await
            .map_err(call_error)?;
        Ok(Self { conn })
    }
}

fn call_error(err: tokio_rusqlite::Error) -> StoreError {
    match err {
        tokio_rusqlite::Error::ConnectionClosed => {
            StoreError::Unavailable("connection closed".to_string())
        }
        tokio_rusqlite::Error::Other(inner) => match inner.downcast::<StoreError>() {
            Ok(store_err) => *store_err,
            Err(other) => StoreError::Query(other.to_string()),
        },
        other => StoreError::Query(other.to_string()),
    }
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad timestamp '{}': {}", value, e)))
}

fn parse_status(value: &str) -> Result<ServiceStatus, StoreError> {
    ServiceStatus::parse(value)
        .ok_or_else(|| StoreError::Serialization(format!("unknown status '{}'", value)))
}

fn to_sql_secs(secs: u64) -> i64 {
    i64::try_from(secs).unwrap_or(i64::MAX)
}

/// Raw service columns, decoded outside the connection thread.
struct ServiceRow {
    service_key: String,
    service_type: Option<String>,
    display_name: Option<String>,
    service_group: String,
    expected_period: Option<i64>,
    dead_after: Option<i64>,
    status: String,
    alerts_enabled: bool,
    updated_at: Option<String>,
    last_seen: Option<String>,
    metadata: String,
}

impl ServiceRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_key: row.get(0)?,
            service_type: row.get(1)?,
            display_name: row.get(2)?,
            service_group: row.get(3)?,
            expected_period: row.get(4)?,
            dead_after: row.get(5)?,
            status: row.get(6)?,
            alerts_enabled: row.get(7)?,
            updated_at: row.get(8)?,
            last_seen: row.get(9)?,
            metadata: row.get(10)?,
        })
    }

    fn decode(self) -> Result<Service, StoreError> {
        let service_type = match self.service_type.as_deref() {
            Some(raw) => Some(ServiceType::parse(raw).ok_or_else(|| {
                StoreError::Serialization(format!("unknown service type '{}'", raw))
            })?),
            None => None,
        };
        Ok(Service {
            service_key: self.service_key,
            service_type,
            display_name: self.display_name,
            service_group: self.service_group,
            expected_period: self.expected_period.map(|v| v.max(0) as u64),
            dead_after: self.dead_after.map(|v| v.max(0) as u64),
            status: parse_status(&self.status)?,
            alerts_enabled: self.alerts_enabled,
            updated_at: self.updated_at.as_deref().map(parse_ts).transpose()?,
            last_seen: self.last_seen.as_deref().map(parse_ts).transpose()?,
            metadata: serde_json::from_str(&self.metadata)?,
        })
    }
}

struct HeartbeatRow {
    service_key: String,
    timestamp: String,
    metadata: String,
}

impl HeartbeatRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            service_key: row.get(0)?,
            timestamp: row.get(1)?,
            metadata: row.get(2)?,
        })
    }

    fn decode(self) -> Result<Heartbeat, StoreError> {
        let metadata: Metadata = serde_json::from_str(&self.metadata)?;
        Ok(Heartbeat::new(self.service_key, parse_ts(&self.timestamp)?).with_metadata(metadata))
    }
}

struct TransitionRow {
    id: String,
    service_key: String,
    from_state: String,
    to_state: String,
    timestamp: String,
    alerted: bool,
    alert_message: Option<String>,
}

impl TransitionRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            service_key: row.get(1)?,
            from_state: row.get(2)?,
            to_state: row.get(3)?,
            timestamp: row.get(4)?,
            alerted: row.get(5)?,
            alert_message: row.get(6)?,
        })
    }

    fn decode(self) -> Result<StateTransition, StoreError> {
        Ok(StateTransition {
            id: self.id,
            service_key: self.service_key,
            from_state: parse_status(&self.from_state)?,
            to_state: parse_status(&self.to_state)?,
            timestamp: parse_ts(&self.timestamp)?,
            alerted: self.alerted,
            alert_message: self.alert_message,
        })
    }
}

#[async_trait]
impl HeartbeatLog for SqliteStore {
    async fn append_heartbeat(&self, heartbeat: Heartbeat) -> Result<(), StoreError> {
        let timestamp = format_ts(&heartbeat.timestamp);
        let metadata = serde_json::to_string(&heartbeat.metadata)?;
        self.conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO heartbeats (service_key, timestamp, metadata) VALUES (?1, ?2, ?3)",
                    params![heartbeat.service_key, timestamp, metadata],
                )?;
                Ok(())
            })
            .await
            .map_err(call_error)
    }

    async fn recent_heartbeats(
        &self,
        service_key: &str,
        limit: usize,
    ) -> Result<Vec<Heartbeat>, StoreError> {
        let service_key = service_key.to_string();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT service_key, timestamp, metadata FROM heartbeats
                     WHERE service_key = ?1 ORDER BY timestamp DESC, id DESC LIMIT ?2",
                )?;
                let rows = stmt
                    .query_map(params![service_key, limit], HeartbeatRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(call_error)?;
        rows.into_iter().map(HeartbeatRow::decode).collect()
    }

    async fn heartbeats_since(&self, since: DateTime<Utc>) -> Result<Vec<Heartbeat>, StoreError> {
        let since = format_ts(&since);
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT service_key, timestamp, metadata FROM heartbeats
                     WHERE timestamp >= ?1 ORDER BY timestamp DESC, id DESC",
                )?;
                let rows = stmt
                    .query_map([since], HeartbeatRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(call_error)?;
        rows.into_iter().map(HeartbeatRow::decode).collect()
    }
}

#[async_trait]
impl ServiceStore for SqliteStore {
    async fn insert_service(&self, service: Service) -> Result<bool, StoreError> {
        let metadata = serde_json::to_string(&service.metadata)?;
        let updated_at = service.updated_at.as_ref().map(format_ts);
        let last_seen = service.last_seen.as_ref().map(format_ts);
        self.conn
            .call(move |conn| {
                let inserted = conn.execute(
                    &format!(
                        "INSERT OR IGNORE INTO services ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                        SERVICE_COLUMNS
                    ),
                    params![
                        service.service_key,
                        service.service_type.map(|t| t.as_str()),
                        service.display_name,
                        service.service_group,
                        service.expected_period.map(to_sql_secs),
                        service.dead_after.map(to_sql_secs),
                        service.status.as_str(),
                        service.alerts_enabled,
                        updated_at,
                        last_seen,
                        metadata,
                    ],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(call_error)
    }

    async fn get_service(&self, service_key: &str) -> Result<Option<Service>, StoreError> {
        let service_key = service_key.to_string();
        let row = self
            .conn
            .call(move |conn| {
                let row = conn
                    .query_row(
                        &format!("SELECT {} FROM services WHERE service_key = ?1", SERVICE_COLUMNS),
                        [service_key],
                        ServiceRow::read,
                    )
                    .optional()?;
                Ok(row)
            })
            .await
            .map_err(call_error)?;
        row.map(ServiceRow::decode).transpose()
    }

    async fn list_services(&self) -> Result<Vec<Service>, StoreError> {
        let rows = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM services ORDER BY service_key",
                    SERVICE_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], ServiceRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(call_error)?;
        rows.into_iter().map(ServiceRow::decode).collect()
    }

    async fn patch_service(
        &self,
        service_key: &str,
        patch: &ServicePatch,
    ) -> Result<bool, StoreError> {
        let service_key = service_key.to_string();
        let metadata = patch.metadata.as_ref().map(serde_json::to_string).transpose()?;
        let patch = patch.clone();
        self.conn
            .call(move |conn| {
                let matched = conn.execute(
                    "UPDATE services SET
                        service_type = COALESCE(?2, service_type),
                        expected_period = COALESCE(?3, expected_period),
                        dead_after = COALESCE(?4, dead_after),
                        alerts_enabled = COALESCE(?5, alerts_enabled),
                        display_name = COALESCE(?6, display_name),
                        service_group = COALESCE(?7, service_group),
                        metadata = COALESCE(?8, metadata)
                     WHERE service_key = ?1",
                    params![
                        service_key,
                        patch.service_type.map(|t| t.as_str()),
                        patch.expected_period.map(to_sql_secs),
                        patch.dead_after.map(to_sql_secs),
                        patch.alerts_enabled,
                        patch.display_name,
                        patch.service_group,
                        metadata,
                    ],
                )?;
                Ok(matched > 0)
            })
            .await
            .map_err(call_error)
    }

    async fn touch_service(
        &self,
        service_key: &str,
        seen_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let service_key = service_key.to_string();
        let seen_at = format_ts(&seen_at);
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE services SET last_seen = ?2
                     WHERE service_key = ?1 AND (last_seen IS NULL OR last_seen < ?2)",
                    params![service_key, seen_at],
                )?;
                Ok(())
            })
            .await
            .map_err(call_error)
    }

    async fn commit_status(&self, change: StatusChange) -> Result<bool, StoreError> {
        let updated_at = format_ts(&change.updated_at);
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                let matched = tx.execute(
                    "UPDATE services SET status = ?2, updated_at = ?3 WHERE service_key = ?1",
                    params![change.service_key, change.status.as_str(), updated_at],
                )?;
                if matched == 0 {
                    return Ok(false);
                }

                if let Some(t) = change.transition {
                    tx.execute(
                        "INSERT INTO state_transitions
                            (id, service_key, from_state, to_state, timestamp, alerted, alert_message)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                        params![
                            t.id,
                            t.service_key,
                            t.from_state.as_str(),
                            t.to_state.as_str(),
                            format_ts(&t.timestamp),
                            t.alerted,
                            t.alert_message,
                        ],
                    )?;
                }

                tx.commit()?;
                Ok(true)
            })
            .await
            .map_err(call_error)
    }
}

#[async_trait]
impl TransitionLog for SqliteStore {
    async fn query_transitions(
        &self,
        filter: &TransitionFilter,
    ) -> Result<Vec<StateTransition>, StoreError> {
        let service_key = filter.service_key.clone();
        let only_not_alerted = filter.only_not_alerted;
        let limit = i64::try_from(filter.limit).unwrap_or(i64::MAX);
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, service_key, from_state, to_state, timestamp, alerted, alert_message
                     FROM state_transitions
                     WHERE (?1 IS NULL OR service_key = ?1) AND (?2 = 0 OR alerted = 0)
                     ORDER BY timestamp DESC, rowid DESC
                     LIMIT ?3",
                )?;
                let rows = stmt
                    .query_map(params![service_key, only_not_alerted, limit], TransitionRow::read)?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .map_err(call_error)?;
        rows.into_iter().map(TransitionRow::decode).collect()
    }

    async fn mark_alerted(&self, service_key: &str) -> Result<u64, StoreError> {
        let service_key = service_key.to_string();
        self.conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE state_transitions SET alerted = 1 WHERE service_key = ?1 AND alerted = 0",
                    [service_key],
                )?;
                Ok(changed as u64)
            })
            .await
            .map_err(call_error)
    }
}
