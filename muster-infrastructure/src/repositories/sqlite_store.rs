use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use muster_domain::{
    AttendanceRecord, AttendanceStatus, Coordinate, Event, InsertOutcome, LocalStore, Penalty,
    Watermark, WindowOffsets,
};

use crate::utils::{format_timestamp, parse_timestamp};

const WATERMARK_KEY: &str = "pull_watermark";

const RECORD_COLUMNS: &str = "id, member_id, event_id, arrived_at, status, penalty, fix_lat, \
     fix_lon, synced, note, departed_at, departure_status, departure_penalty, updated_at";

const EVENT_COLUMNS: &str = "id, name, starts_at, ends_at, center_lat, center_lon, radius_m, \
     sign_in_start, sign_in_end, sign_out_start, sign_out_end, active";

/// Local store backed by a single SQLite file.
///
/// The connection sits behind a blocking mutex and every call runs on the blocking pool.
pub struct SqliteLocalStore {
    conn: Arc<Mutex<Option<Connection>>>,
}

impl SqliteLocalStore {
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path, "opened local store");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    async fn with_conn<F, T>(&self, func: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| anyhow!("local store connection poisoned"))?;
            let conn = guard
                .as_mut()
                .ok_or_else(|| anyhow!("local store is closed"))?;
            func(conn)
        })
        .await?
    }
}

fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS events (
            id             TEXT PRIMARY KEY,
            name           TEXT NOT NULL,
            starts_at      TEXT NOT NULL,
            ends_at        TEXT NOT NULL,
            center_lat     REAL NOT NULL,
            center_lon     REAL NOT NULL,
            radius_m       REAL NOT NULL,
            sign_in_start  INTEGER NOT NULL,
            sign_in_end    INTEGER NOT NULL,
            sign_out_start INTEGER NOT NULL,
            sign_out_end   INTEGER NOT NULL,
            active         INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS attendance_records (
            id                TEXT PRIMARY KEY,
            member_id         TEXT NOT NULL,
            event_id          TEXT NOT NULL,
            arrived_at        TEXT NOT NULL,
            status            TEXT NOT NULL,
            penalty           TEXT,
            fix_lat           REAL,
            fix_lon           REAL,
            synced            INTEGER NOT NULL DEFAULT 0,
            note              TEXT,
            departed_at       TEXT,
            departure_status  TEXT,
            departure_penalty TEXT,
            updated_at        TEXT NOT NULL,
            UNIQUE (member_id, event_id)
        );

        CREATE TABLE IF NOT EXISTS sync_state (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_records_member ON attendance_records(member_id);
        CREATE INDEX IF NOT EXISTS idx_records_synced ON attendance_records(synced);",
    )
}

struct EventRow {
    id: String,
    name: String,
    starts_at: String,
    ends_at: String,
    center_lat: f64,
    center_lon: f64,
    radius_m: f64,
    offsets: [i64; 4],
    active: bool,
}

impl EventRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            starts_at: row.get(2)?,
            ends_at: row.get(3)?,
            center_lat: row.get(4)?,
            center_lon: row.get(5)?,
            radius_m: row.get(6)?,
            offsets: [row.get(7)?, row.get(8)?, row.get(9)?, row.get(10)?],
            active: row.get(11)?,
        })
    }

    fn into_event(self) -> Result<Event> {
        let [sign_in_start, sign_in_end, sign_out_start, sign_out_end] = self.offsets;
        Ok(Event {
            id: self.id,
            name: self.name,
            starts_at: parse_timestamp(&self.starts_at)?,
            ends_at: parse_timestamp(&self.ends_at)?,
            center: Coordinate {
                latitude: self.center_lat,
                longitude: self.center_lon,
            },
            radius_m: self.radius_m,
            offsets: WindowOffsets {
                sign_in_start,
                sign_in_end,
                sign_out_start,
                sign_out_end,
            },
            active: self.active,
        })
    }
}

struct RecordRow {
    id: String,
    member_id: String,
    event_id: String,
    arrived_at: String,
    status: String,
    penalty: Option<String>,
    fix_lat: Option<f64>,
    fix_lon: Option<f64>,
    synced: bool,
    note: Option<String>,
    departed_at: Option<String>,
    departure_status: Option<String>,
    departure_penalty: Option<String>,
    updated_at: String,
}

impl RecordRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            member_id: row.get(1)?,
            event_id: row.get(2)?,
            arrived_at: row.get(3)?,
            status: row.get(4)?,
            penalty: row.get(5)?,
            fix_lat: row.get(6)?,
            fix_lon: row.get(7)?,
            synced: row.get(8)?,
            note: row.get(9)?,
            departed_at: row.get(10)?,
            departure_status: row.get(11)?,
            departure_penalty: row.get(12)?,
            updated_at: row.get(13)?,
        })
    }

    fn into_record(self) -> Result<AttendanceRecord> {
        let fix = match (self.fix_lat, self.fix_lon) {
            (Some(latitude), Some(longitude)) => Some(Coordinate {
                latitude,
                longitude,
            }),
            _ => None,
        };
        Ok(AttendanceRecord {
            id: self.id,
            member_id: self.member_id,
            event_id: self.event_id,
            arrived_at: parse_timestamp(&self.arrived_at)?,
            status: self.status.parse::<AttendanceStatus>()?,
            penalty: self.penalty.as_deref().map(str::parse::<Penalty>).transpose()?,
            fix,
            synced: self.synced,
            note: self.note,
            departed_at: self.departed_at.as_deref().map(parse_timestamp).transpose()?,
            departure_status: self
                .departure_status
                .as_deref()
                .map(str::parse::<AttendanceStatus>)
                .transpose()?,
            departure_penalty: self
                .departure_penalty
                .as_deref()
                .map(str::parse::<Penalty>)
                .transpose()?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn query_records(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<AttendanceRecord>> {
    let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance_records {filter}");
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params, RecordRow::read)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    rows.into_iter().map(RecordRow::into_record).collect()
}

fn record_by_key(
    conn: &Connection,
    member_id: &str,
    event_id: &str,
) -> Result<Option<AttendanceRecord>> {
    Ok(query_records(
        conn,
        "WHERE member_id = ?1 AND event_id = ?2",
        params![member_id, event_id],
    )?
    .into_iter()
    .next())
}

fn record_by_id(conn: &Connection, id: &str) -> Result<Option<AttendanceRecord>> {
    Ok(query_records(conn, "WHERE id = ?1", params![id])?
        .into_iter()
        .next())
}

fn execute_record(conn: &Connection, sql: &str, record: &AttendanceRecord) -> Result<usize> {
    Ok(conn.execute(
        sql,
        params![
            record.id,
            record.member_id,
            record.event_id,
            format_timestamp(record.arrived_at),
            record.status.as_str(),
            record.penalty.map(|p| p.as_str()),
            record.fix.map(|c| c.latitude),
            record.fix.map(|c| c.longitude),
            record.synced,
            record.note,
            record.departed_at.map(format_timestamp),
            record.departure_status.map(|s| s.as_str()),
            record.departure_penalty.map(|p| p.as_str()),
            format_timestamp(record.updated_at),
        ],
    )?)
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1");
            conn.query_row(&sql, params![id], EventRow::read)
                .optional()?
                .map(EventRow::into_event)
                .transpose()
        })
        .await
    }

    async fn save_event(&self, event: &Event) -> Result<()> {
        let event = event.clone();
        self.with_conn(move |conn| {
            conn.execute(
                &format!(
                    "INSERT INTO events ({EVENT_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(id) DO UPDATE SET
                        name = excluded.name,
                        starts_at = excluded.starts_at,
                        ends_at = excluded.ends_at,
                        center_lat = excluded.center_lat,
                        center_lon = excluded.center_lon,
                        radius_m = excluded.radius_m,
                        sign_in_start = excluded.sign_in_start,
                        sign_in_end = excluded.sign_in_end,
                        sign_out_start = excluded.sign_out_start,
                        sign_out_end = excluded.sign_out_end,
                        active = excluded.active"
                ),
                params![
                    event.id,
                    event.name,
                    format_timestamp(event.starts_at),
                    format_timestamp(event.ends_at),
                    event.center.latitude,
                    event.center.longitude,
                    event.radius_m,
                    event.offsets.sign_in_start,
                    event.offsets.sign_in_end,
                    event.offsets.sign_out_start,
                    event.offsets.sign_out_end,
                    event.active,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> Result<Option<AttendanceRecord>> {
        let (member_id, event_id) = (member_id.to_string(), event_id.to_string());
        self.with_conn(move |conn| record_by_key(conn, &member_id, &event_id))
            .await
    }

    async fn get_record_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| record_by_id(conn, &id)).await
    }

    async fn insert_record_if_absent(&self, record: &AttendanceRecord) -> Result<InsertOutcome> {
        let record = record.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            let inserted = execute_record(
                &tx,
                &format!(
                    "INSERT OR IGNORE INTO attendance_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                &record,
            )?;
            let outcome = if inserted > 0 {
                InsertOutcome::Inserted
            } else {
                let existing = match record_by_key(&tx, &record.member_id, &record.event_id)? {
                    Some(existing) => existing,
                    None => record_by_id(&tx, &record.id)?
                        .ok_or_else(|| anyhow!("insert of record {} ignored", record.id))?,
                };
                debug!(record_id = %record.id, existing_id = %existing.id, "insert skipped");
                InsertOutcome::Conflict(existing)
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            execute_record(
                conn,
                &format!(
                    "INSERT INTO attendance_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                     ON CONFLICT(id) DO UPDATE SET
                        member_id = excluded.member_id,
                        event_id = excluded.event_id,
                        arrived_at = excluded.arrived_at,
                        status = excluded.status,
                        penalty = excluded.penalty,
                        fix_lat = excluded.fix_lat,
                        fix_lon = excluded.fix_lon,
                        synced = excluded.synced,
                        note = excluded.note,
                        departed_at = excluded.departed_at,
                        departure_status = excluded.departure_status,
                        departure_penalty = excluded.departure_penalty,
                        updated_at = excluded.updated_at"
                ),
                &record,
            )?;
            Ok(())
        })
        .await
    }

    async fn replace_record(&self, previous_id: &str, record: &AttendanceRecord) -> Result<()> {
        let previous_id = previous_id.to_string();
        let record = record.clone();
        self.with_conn(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM attendance_records WHERE id = ?1",
                params![previous_id],
            )?;
            execute_record(
                &tx,
                &format!(
                    "INSERT INTO attendance_records ({RECORD_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                &record,
            )?;
            tx.commit()?;
            debug!(previous_id = %previous_id, record_id = %record.id, "record replaced");
            Ok(())
        })
        .await
    }

    async fn list_member_records(&self, member_id: &str) -> Result<Vec<AttendanceRecord>> {
        let member_id = member_id.to_string();
        self.with_conn(move |conn| {
            query_records(
                conn,
                "WHERE member_id = ?1 ORDER BY arrived_at",
                params![member_id],
            )
        })
        .await
    }

    async fn list_unsynced(&self) -> Result<Vec<AttendanceRecord>> {
        self.with_conn(|conn| query_records(conn, "WHERE synced = 0 ORDER BY updated_at", []))
            .await
    }

    async fn mark_synced(&self, id: &str, version: DateTime<Utc>) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let changed = conn.execute(
                "UPDATE attendance_records SET synced = 1 WHERE id = ?1 AND updated_at = ?2",
                params![id, format_timestamp(version)],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn load_watermark(&self) -> Result<Watermark> {
        self.with_conn(|conn| {
            let value: Option<String> = conn
                .query_row(
                    "SELECT value FROM sync_state WHERE key = ?1",
                    params![WATERMARK_KEY],
                    |row| row.get(0),
                )
                .optional()?;
            match value {
                Some(raw) => Ok(Watermark(raw.parse().map_err(|err| {
                    anyhow!("corrupt watermark '{}': {}", raw, err)
                })?)),
                None => Ok(Watermark::ORIGIN),
            }
        })
        .await
    }

    async fn save_watermark(&self, watermark: Watermark) -> Result<()> {
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO sync_state (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![WATERMARK_KEY, watermark.0.to_string()],
            )?;
            Ok(())
        })
        .await
    }

    async fn ping(&self) -> Result<()> {
        self.with_conn(|conn| {
            conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
            Ok(())
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let taken = conn
                .lock()
                .map_err(|_| anyhow!("local store connection poisoned"))?
                .take();
            if let Some(conn) = taken {
                conn.close().map_err(|(_, err)| anyhow!(err))?;
                info!("local store closed");
            }
            Ok(())
        })
        .await?
    }
}
