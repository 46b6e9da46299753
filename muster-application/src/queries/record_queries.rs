use muster_domain::AttendanceRecord;
use tracing::{debug, warn};

use crate::{AppState, AttendanceError};

/// Finds the record for a (member, event) pair, consulting the remote on a local miss.
///
/// A remote failure is treated as a miss so marking keeps working offline. A remote hit is
/// stored locally as already synced.
pub async fn find_record(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<Option<AttendanceRecord>, AttendanceError> {
    if let Some(record) = state.local_store.get_record(member_id, event_id).await? {
        return Ok(Some(record));
    }
    let Some(remote) = state.remote_store.as_ref() else {
        return Ok(None);
    };
    let loaded = match remote.get_record(member_id, event_id).await {
        Ok(loaded) => loaded,
        Err(err) => {
            warn!(member_id, event_id, error = %err, "remote record lookup failed; treating as miss");
            return Ok(None);
        }
    };
    let Some(record) = loaded else {
        return Ok(None);
    };
    debug!(member_id, event_id, record_id = %record.id, "record fetched from remote");
    let record = record.with_synced(true);
    state.local_store.insert_record_if_absent(&record).await?;
    Ok(Some(record))
}

pub async fn list_member_records(
    state: &AppState,
    member_id: &str,
) -> Result<Vec<AttendanceRecord>, AttendanceError> {
    Ok(state.local_store.list_member_records(member_id).await?)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use chrono::Utc;
    use muster_domain::{AttendanceStatus, LocalStore, RemoteStore};

    use super::*;
    use crate::test_support::{harness, FakeLocation, CENTER};

    fn record(id: &str, member: &str, event: &str) -> AttendanceRecord {
        AttendanceRecord {
            id: id.to_string(),
            member_id: member.to_string(),
            event_id: event.to_string(),
            arrived_at: Utc::now(),
            status: AttendanceStatus::Present,
            penalty: None,
            fix: None,
            synced: false,
            note: None,
            departed_at: None,
            departure_status: None,
            departure_penalty: None,
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn remote_hit_is_backfilled_as_synced() {
        let h = harness(FakeLocation::At(CENTER));
        h.remote.upsert_record(&record("r1", "m1", "e1")).await.unwrap();

        let found = find_record(&h.state, "m1", "e1").await.unwrap().unwrap();
        assert!(found.synced);
        let local = h.local.get_record("m1", "e1").await.unwrap().unwrap();
        assert_eq!(local.id, "r1");
        assert!(local.synced);
    }

    #[tokio::test]
    async fn remote_outage_reads_as_miss() {
        let h = harness(FakeLocation::At(CENTER));
        h.remote.offline.store(true, Ordering::SeqCst);
        assert!(find_record(&h.state, "m1", "e1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn local_record_wins() {
        let h = harness(FakeLocation::At(CENTER));
        h.local.upsert_record(&record("local", "m1", "e1")).await.unwrap();
        h.remote.upsert_record(&record("remote", "m1", "e1")).await.unwrap();

        let found = find_record(&h.state, "m1", "e1").await.unwrap().unwrap();
        assert_eq!(found.id, "local");
    }
}
