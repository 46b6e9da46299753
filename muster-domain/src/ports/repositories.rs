use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{AttendanceRecord, Event};
use crate::value_objects::Watermark;

/// Result of a conditional insert keyed by (member, event).
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// A record for the same (member, event) already exists; it is returned untouched.
    Conflict(AttendanceRecord),
}

/// Result of pushing a record to the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    Applied,
    /// Another record id already holds this (member, event) and prevails under
    /// [`crate::prevailing_record`]; the holder is returned and nothing was written.
    Superseded(AttendanceRecord),
}

/// Remote changes after a watermark, plus the watermark to resume from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub records: Vec<AttendanceRecord>,
    pub next_watermark: Watermark,
}

/// Device-local durable store. Authoritative for reads during normal operation.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get_event(&self, id: &str) -> anyhow::Result<Option<Event>>;
    async fn save_event(&self, event: &Event) -> anyhow::Result<()>;

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> anyhow::Result<Option<AttendanceRecord>>;
    async fn get_record_by_id(&self, id: &str) -> anyhow::Result<Option<AttendanceRecord>>;
    async fn insert_record_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> anyhow::Result<InsertOutcome>;
    async fn upsert_record(&self, record: &AttendanceRecord) -> anyhow::Result<()>;
    /// Swaps the record stored under `previous_id` for `record`, which holds the same
    /// (member, event) under another id.
    async fn replace_record(
        &self,
        previous_id: &str,
        record: &AttendanceRecord,
    ) -> anyhow::Result<()>;
    async fn list_member_records(&self, member_id: &str) -> anyhow::Result<Vec<AttendanceRecord>>;

    async fn list_unsynced(&self) -> anyhow::Result<Vec<AttendanceRecord>>;
    /// Flags the record synced only while its `updated_at` still equals `version`.
    /// Returns false when the record changed in the meantime (or vanished).
    async fn mark_synced(&self, id: &str, version: DateTime<Utc>) -> anyhow::Result<bool>;

    async fn load_watermark(&self) -> anyhow::Result<Watermark>;
    async fn save_watermark(&self, watermark: Watermark) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()>;
    async fn close(&self) -> anyhow::Result<()>;
}

/// Shared authoritative store. Upserts are keyed by record id and safe to repeat.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn get_event(&self, id: &str) -> anyhow::Result<Option<Event>>;
    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> anyhow::Result<Option<AttendanceRecord>>;
    /// Holds at most one record per (member, event). A different id for a held key
    /// either replaces the holder or is refused with [`UpsertOutcome::Superseded`],
    /// whichever [`crate::prevailing_record`] picks.
    async fn upsert_record(&self, record: &AttendanceRecord) -> anyhow::Result<UpsertOutcome>;
    async fn list_changed_since(&self, watermark: Watermark) -> anyhow::Result<ChangeBatch>;
    async fn ping(&self) -> anyhow::Result<()>;
}
