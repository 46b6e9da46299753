// Attendance record entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{AttendanceStatus, Coordinate, Penalty};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: String,
    pub member_id: String,
    pub event_id: String,
    pub arrived_at: DateTime<Utc>,
    pub status: AttendanceStatus,
    #[serde(default)]
    pub penalty: Option<Penalty>,
    #[serde(default)]
    pub fix: Option<Coordinate>,
    #[serde(default)]
    pub synced: bool,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub departed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub departure_status: Option<AttendanceStatus>,
    #[serde(default)]
    pub departure_penalty: Option<Penalty>,
    /// Last business change; drives last-writer-wins during sync.
    pub updated_at: DateTime<Utc>,
}

impl AttendanceRecord {
    /// Every penalty the record carries, arrival first.
    pub fn penalties(&self) -> impl Iterator<Item = Penalty> {
        self.penalty.into_iter().chain(self.departure_penalty)
    }

    pub fn has_departed(&self) -> bool {
        self.departed_at.is_some()
    }

    pub fn key(&self) -> (&str, &str) {
        (&self.member_id, &self.event_id)
    }

    pub fn with_synced(mut self, synced: bool) -> Self {
        self.synced = synced;
        self
    }
}
