use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use muster_domain::{
    prevailing_record, AttendanceRecord, ChangeBatch, Event, InsertOutcome, LocalStore,
    RemoteStore, UpsertOutcome, Watermark,
};

#[derive(Default)]
struct LocalTables {
    events: HashMap<String, Event>,
    records: HashMap<String, AttendanceRecord>,
    watermark: Watermark,
}

/// Process-local store for `--memory` runs; nothing survives exit.
#[derive(Default)]
pub struct InMemoryLocalStore {
    tables: RwLock<LocalTables>,
}

impl InMemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn find_by_key<'a>(
    records: &'a HashMap<String, AttendanceRecord>,
    member_id: &str,
    event_id: &str,
) -> Option<&'a AttendanceRecord> {
    records
        .values()
        .find(|record| record.key() == (member_id, event_id))
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn save_event(&self, event: &Event) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> Result<Option<AttendanceRecord>> {
        let tables = self.tables.read().await;
        Ok(find_by_key(&tables.records, member_id, event_id).cloned())
    }

    async fn get_record_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>> {
        Ok(self.tables.read().await.records.get(id).cloned())
    }

    async fn insert_record_if_absent(&self, record: &AttendanceRecord) -> Result<InsertOutcome> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = find_by_key(&tables.records, &record.member_id, &record.event_id)
            .or_else(|| tables.records.get(&record.id))
        {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        tables.records.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        if let Some(other) = find_by_key(&tables.records, &record.member_id, &record.event_id) {
            if other.id != record.id {
                anyhow::bail!(
                    "record {} already holds member '{}' at event '{}'",
                    other.id,
                    record.member_id,
                    record.event_id
                );
            }
        }
        tables.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn replace_record(&self, previous_id: &str, record: &AttendanceRecord) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.records.remove(previous_id);
        if let Some(other) = find_by_key(&tables.records, &record.member_id, &record.event_id) {
            if other.id != record.id {
                anyhow::bail!("record {} still holds member '{}'", other.id, record.member_id);
            }
        }
        tables.records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_member_records(&self, member_id: &str) -> Result<Vec<AttendanceRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<AttendanceRecord> = tables
            .records
            .values()
            .filter(|record| record.member_id == member_id)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.arrived_at);
        Ok(records)
    }

    async fn list_unsynced(&self) -> Result<Vec<AttendanceRecord>> {
        let tables = self.tables.read().await;
        let mut records: Vec<AttendanceRecord> = tables
            .records
            .values()
            .filter(|record| !record.synced)
            .cloned()
            .collect();
        records.sort_by_key(|record| record.updated_at);
        Ok(records)
    }

    async fn mark_synced(&self, id: &str, version: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.records.get_mut(id) {
            Some(record) if record.updated_at == version => {
                record.synced = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load_watermark(&self) -> Result<Watermark> {
        Ok(self.tables.read().await.watermark)
    }

    async fn save_watermark(&self, watermark: Watermark) -> Result<()> {
        self.tables.write().await.watermark = watermark;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct RemoteTables {
    events: HashMap<String, Event>,
    /// Record plus the revision at which it last changed.
    records: HashMap<String, (u64, AttendanceRecord)>,
    revision: u64,
}

/// Shared remote stand-in; every accepted write bumps a global revision.
#[derive(Default)]
pub struct InMemoryRemoteStore {
    tables: RwLock<RemoteTables>,
}

impl InMemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn put_event(&self, event: Event) {
        let mut tables = self.tables.write().await;
        tables.events.insert(event.id.clone(), event);
    }

    pub async fn revision(&self) -> u64 {
        self.tables.read().await.revision
    }
}

#[async_trait]
impl RemoteStore for InMemoryRemoteStore {
    async fn get_event(&self, id: &str) -> Result<Option<Event>> {
        Ok(self.tables.read().await.events.get(id).cloned())
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> Result<Option<AttendanceRecord>> {
        let tables = self.tables.read().await;
        Ok(tables
            .records
            .values()
            .map(|(_, record)| record)
            .find(|record| record.key() == (member_id, event_id))
            .cloned())
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> Result<UpsertOutcome> {
        let mut tables = self.tables.write().await;
        if let Some((_, current)) = tables.records.get(&record.id) {
            if current.updated_at >= record.updated_at {
                return Ok(UpsertOutcome::Applied);
            }
        }
        let holder = tables
            .records
            .values()
            .map(|(_, held)| held)
            .find(|held| held.id != record.id && held.key() == record.key())
            .cloned();
        if let Some(holder) = holder {
            if prevailing_record(&holder, record).id == holder.id {
                return Ok(UpsertOutcome::Superseded(holder));
            }
            tables.records.remove(&holder.id);
        }
        tables.revision += 1;
        let revision = tables.revision;
        tables
            .records
            .insert(record.id.clone(), (revision, record.clone()));
        Ok(UpsertOutcome::Applied)
    }

    async fn list_changed_since(&self, watermark: Watermark) -> Result<ChangeBatch> {
        let tables = self.tables.read().await;
        let mut changed: Vec<&(u64, AttendanceRecord)> = tables
            .records
            .values()
            .filter(|(revision, _)| *revision > watermark.0)
            .collect();
        changed.sort_by_key(|(revision, _)| *revision);
        let next = changed
            .last()
            .map(|(revision, _)| Watermark(*revision))
            .unwrap_or(watermark);
        Ok(ChangeBatch {
            records: changed.into_iter().map(|(_, record)| record.clone()).collect(),
            next_watermark: next,
        })
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
