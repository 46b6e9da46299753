//! Last-writer-wins decision for a record arriving from the remote store.

use crate::entities::AttendanceRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    /// No local copy with this id.
    Insert,
    /// Remote copy is strictly newer than the local one.
    UseRemote,
    /// Local copy is as new or newer; keep it (and push it later if unsynced).
    KeepLocal,
}

/// Decides per record id. Ties keep the local copy, so an unsynced local edit is never
/// overwritten by an equal or older remote write.
pub fn decide_merge(local: Option<&AttendanceRecord>, remote: &AttendanceRecord) -> MergeDecision {
    match local {
        None => MergeDecision::Insert,
        Some(local) if remote.updated_at > local.updated_at => MergeDecision::UseRemote,
        Some(_) => MergeDecision::KeepLocal,
    }
}

/// Settles two records with different ids claiming the same (member, event).
/// The earlier arrival prevails; equal arrivals fall back to the lower id.
pub fn prevailing_record<'a>(
    a: &'a AttendanceRecord,
    b: &'a AttendanceRecord,
) -> &'a AttendanceRecord {
    if (b.arrived_at, b.id.as_str()) < (a.arrived_at, a.id.as_str()) {
        b
    } else {
        a
    }
}
