//! In-process fakes for exercising commands and queries.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use muster_domain::{
    prevailing_record, AttendanceRecord, ChangeBatch, Clock, Coordinate, CredentialVerifier,
    Event, Fix, InsertOutcome, LocalStore, LocationSource, NewEvent, RemoteStore, RuntimeConfig,
    UpsertOutcome, Verification, Watermark, WindowOffsets,
};

use crate::AppState;

pub const CENTER: Coordinate = Coordinate {
    latitude: 51.5007,
    longitude: -0.1246,
};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 15, 9, 0, 0).unwrap()
}

pub fn sample_event(id: &str) -> Event {
    Event::create(NewEvent {
        id: id.to_string(),
        name: format!("Event {id}"),
        starts_at: start_time(),
        ends_at: start_time() + Duration::hours(2),
        center: CENTER,
        radius_m: 100.0,
        offsets: WindowOffsets {
            sign_in_start: 15,
            sign_in_end: 30,
            sign_out_start: 15,
            sign_out_end: 30,
        },
    })
    .unwrap()
}

#[derive(Default)]
pub struct FakeLocal {
    events: Mutex<HashMap<String, Event>>,
    records: Mutex<HashMap<String, AttendanceRecord>>,
    watermark: Mutex<Watermark>,
    pub fail_writes: AtomicBool,
}

impl FakeLocal {
    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn watermark(&self) -> Watermark {
        *self.watermark.lock().unwrap()
    }

    fn check_writable(&self) -> anyhow::Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("disk full"));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalStore for FakeLocal {
    async fn get_event(&self, id: &str) -> anyhow::Result<Option<Event>> {
        Ok(self.events.lock().unwrap().get(id).cloned())
    }

    async fn save_event(&self, event: &Event) -> anyhow::Result<()> {
        self.check_writable()?;
        self.events
            .lock()
            .unwrap()
            .insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .find(|r| r.member_id == member_id && r.event_id == event_id)
            .cloned())
    }

    async fn get_record_by_id(&self, id: &str) -> anyhow::Result<Option<AttendanceRecord>> {
        Ok(self.records.lock().unwrap().get(id).cloned())
    }

    async fn insert_record_if_absent(
        &self,
        record: &AttendanceRecord,
    ) -> anyhow::Result<InsertOutcome> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        if let Some(existing) = records
            .values()
            .find(|r| r.member_id == record.member_id && r.event_id == record.event_id)
        {
            return Ok(InsertOutcome::Conflict(existing.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> anyhow::Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn replace_record(
        &self,
        previous_id: &str,
        record: &AttendanceRecord,
    ) -> anyhow::Result<()> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        records.remove(previous_id);
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn list_member_records(&self, member_id: &str) -> anyhow::Result<Vec<AttendanceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.member_id == member_id)
            .cloned()
            .collect())
    }

    async fn list_unsynced(&self) -> anyhow::Result<Vec<AttendanceRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| !r.synced)
            .cloned()
            .collect())
    }

    async fn mark_synced(&self, id: &str, version: DateTime<Utc>) -> anyhow::Result<bool> {
        self.check_writable()?;
        let mut records = self.records.lock().unwrap();
        match records.get_mut(id) {
            Some(record) if record.updated_at == version => {
                record.synced = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load_watermark(&self) -> anyhow::Result<Watermark> {
        Ok(*self.watermark.lock().unwrap())
    }

    async fn save_watermark(&self, watermark: Watermark) -> anyhow::Result<()> {
        *self.watermark.lock().unwrap() = watermark;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn close(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeRemote {
    events: Mutex<HashMap<String, Event>>,
    records: Mutex<HashMap<String, (u64, AttendanceRecord)>>,
    revision: Mutex<u64>,
    pub offline: AtomicBool,
    /// Upserts for these record ids fail.
    pub reject_ids: Mutex<Vec<String>>,
}

impl FakeRemote {
    pub fn put_event(&self, event: Event) {
        self.events.lock().unwrap().insert(event.id.clone(), event);
    }

    pub fn records(&self) -> Vec<AttendanceRecord> {
        self.records
            .lock()
            .unwrap()
            .values()
            .map(|(_, r)| r.clone())
            .collect()
    }

    fn check_online(&self) -> anyhow::Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(anyhow!("network unreachable"));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn get_event(&self, id: &str) -> anyhow::Result<Option<Event>> {
        self.check_online()?;
        Ok(self.events.lock().unwrap().get(id).cloned())
    }

    async fn get_record(
        &self,
        member_id: &str,
        event_id: &str,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        self.check_online()?;
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .map(|(_, r)| r)
            .find(|r| r.member_id == member_id && r.event_id == event_id)
            .cloned())
    }

    async fn upsert_record(&self, record: &AttendanceRecord) -> anyhow::Result<UpsertOutcome> {
        self.check_online()?;
        if self.reject_ids.lock().unwrap().contains(&record.id) {
            return Err(anyhow!("remote rejected {}", record.id));
        }
        let mut revision = self.revision.lock().unwrap();
        let mut records = self.records.lock().unwrap();
        if let Some((_, existing)) = records.get(&record.id) {
            if existing.updated_at >= record.updated_at {
                return Ok(UpsertOutcome::Applied);
            }
        }
        let holder = records
            .values()
            .map(|(_, r)| r)
            .find(|r| r.id != record.id && r.key() == record.key())
            .cloned();
        if let Some(holder) = holder {
            if prevailing_record(&holder, record).id == holder.id {
                return Ok(UpsertOutcome::Superseded(holder));
            }
            records.remove(&holder.id);
        }
        *revision += 1;
        records.insert(record.id.clone(), (*revision, record.clone()));
        Ok(UpsertOutcome::Applied)
    }

    async fn list_changed_since(&self, watermark: Watermark) -> anyhow::Result<ChangeBatch> {
        self.check_online()?;
        let records = self.records.lock().unwrap();
        let mut changed: Vec<(u64, AttendanceRecord)> = records
            .values()
            .filter(|(rev, _)| *rev > watermark.0)
            .cloned()
            .collect();
        changed.sort_by_key(|(rev, _)| *rev);
        let next = changed.last().map(|(rev, _)| *rev).unwrap_or(watermark.0);
        Ok(ChangeBatch {
            records: changed.into_iter().map(|(_, r)| r).collect(),
            next_watermark: Watermark(next),
        })
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.check_online()
    }
}

pub enum FakeLocation {
    At(Coordinate),
    Nothing,
    Hangs,
    Broken,
}

#[async_trait]
impl LocationSource for FakeLocation {
    async fn current_fix(&self) -> anyhow::Result<Option<Fix>> {
        match self {
            FakeLocation::At(coordinate) => Ok(Some(Fix {
                coordinate: *coordinate,
                accuracy_m: Some(5.0),
                taken_at: start_time(),
            })),
            FakeLocation::Nothing => Ok(None),
            FakeLocation::Hangs => std::future::pending().await,
            FakeLocation::Broken => Err(anyhow!("gps driver crashed")),
        }
    }
}

pub struct FakeVerifier(pub Verification);

#[async_trait]
impl CredentialVerifier for FakeVerifier {
    async fn verify(&self, _member_id: &str) -> anyhow::Result<Verification> {
        Ok(self.0.clone())
    }
}

pub struct ManualClock(pub Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub struct Harness {
    pub state: AppState,
    pub local: Arc<FakeLocal>,
    pub remote: Arc<FakeRemote>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(location: FakeLocation) -> Harness {
    harness_with(location, Verification::Pass)
}

pub fn harness_with(location: FakeLocation, verification: Verification) -> Harness {
    let local = Arc::new(FakeLocal::default());
    let remote = Arc::new(FakeRemote::default());
    let clock = Arc::new(ManualClock::at(start_time()));
    let state = AppState::new(
        RuntimeConfig {
            location_timeout_seconds: 2,
            credential_timeout_seconds: 2,
            ..RuntimeConfig::default()
        },
        local.clone(),
        Some(remote.clone()),
        Arc::new(location),
        Arc::new(FakeVerifier(verification)),
        clock.clone(),
    );
    Harness {
        state,
        local,
        remote,
        clock,
    }
}
