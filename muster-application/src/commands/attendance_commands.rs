use std::time::Duration;

use muster_domain::{
    classify_arrival, classify_departure, evaluate, new_record_id, AttendanceRecord,
    AttendanceStatus, Coordinate, Event, EventId, InsertOutcome, MemberId,
};
use tracing::{error, info, warn};

use crate::queries::{event_queries, record_queries};
use crate::{AppState, AttendanceError};

/// Marks a member's arrival at an event.
///
/// The (member, event) lock is held from the duplicate check to the insert, and the store's
/// conditional insert rejects anything that slipped past it from another process.
pub async fn mark_attendance(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    state.metrics.record_mark_attempt();
    let result = mark_attendance_inner(state, member_id, event_id).await;
    match &result {
        Ok(record) => {
            state.metrics.record_mark();
            info!(
                member_id = %record.member_id,
                event_id = %record.event_id,
                status = %record.status,
                penalty = record.penalty.map(|p| p.as_str()).unwrap_or("none"),
                "attendance marked"
            );
        }
        Err(err) => log_rejection(state, "mark", member_id, event_id, err),
    }
    result
}

async fn mark_attendance_inner(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    let event_key = EventId::parse(event_id)?;
    let event = event_queries::get_active_event(state, event_key.as_str()).await?;

    let _guard = state
        .record_locks
        .lock(member.as_str(), event_key.as_str())
        .await;
    if record_queries::find_record(state, member.as_str(), event_key.as_str())
        .await?
        .is_some()
    {
        return Err(already_marked(&member, &event_key));
    }

    let position = locate_inside(state, &event).await?;
    let now = state.clock.now();
    let classification = classify_arrival(&event, now);
    let record = AttendanceRecord {
        id: new_record_id(),
        member_id: member.as_str().to_string(),
        event_id: event_key.as_str().to_string(),
        arrived_at: now,
        status: classification.status,
        penalty: classification.penalty,
        fix: Some(position),
        synced: false,
        note: None,
        departed_at: None,
        departure_status: None,
        departure_penalty: None,
        updated_at: now,
    };
    match state.local_store.insert_record_if_absent(&record).await? {
        InsertOutcome::Inserted => Ok(record),
        InsertOutcome::Conflict(_) => Err(already_marked(&member, &event_key)),
    }
}

/// Records the departure half of an existing attendance record.
pub async fn mark_departure(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let result = mark_departure_inner(state, member_id, event_id).await;
    match &result {
        Ok(record) => {
            state.metrics.record_departure();
            info!(
                member_id = %record.member_id,
                event_id = %record.event_id,
                departure_status = record.departure_status.map(|s| s.as_str()).unwrap_or("none"),
                "departure marked"
            );
        }
        Err(err) => log_rejection(state, "depart", member_id, event_id, err),
    }
    result
}

async fn mark_departure_inner(
    state: &AppState,
    member_id: &str,
    event_id: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    let event_key = EventId::parse(event_id)?;
    let event = event_queries::get_active_event(state, event_key.as_str()).await?;

    let _guard = state
        .record_locks
        .lock(member.as_str(), event_key.as_str())
        .await;
    let Some(mut record) =
        record_queries::find_record(state, member.as_str(), event_key.as_str()).await?
    else {
        return Err(AttendanceError::NotMarked {
            member_id: member.as_str().to_string(),
            event_id: event_key.as_str().to_string(),
        });
    };
    if record.has_departed() {
        return Err(AttendanceError::AlreadyDeparted {
            member_id: member.as_str().to_string(),
            event_id: event_key.as_str().to_string(),
        });
    }

    locate_inside(state, &event).await?;
    let now = state.clock.now();
    let classification = classify_departure(&event, now);
    record.departed_at = Some(now);
    record.departure_status = Some(classification.status);
    record.departure_penalty = classification.penalty;
    record.updated_at = now;
    record.synced = false;
    state.local_store.upsert_record(&record).await?;
    Ok(record)
}

/// Administrative override: the member is excused from the event.
///
/// Creates the record when the member never marked, otherwise rewrites its status and clears
/// both penalties.
pub async fn excuse(
    state: &AppState,
    member_id: &str,
    event_id: &str,
    note: &str,
) -> Result<AttendanceRecord, AttendanceError> {
    let member = MemberId::parse(member_id)?;
    let event_key = EventId::parse(event_id)?;
    event_queries::get_event(state, event_key.as_str())
        .await?
        .ok_or_else(|| AttendanceError::EventNotFound(event_key.as_str().to_string()))?;
    let note = Some(note.trim().to_string()).filter(|n| !n.is_empty());

    let _guard = state
        .record_locks
        .lock(member.as_str(), event_key.as_str())
        .await;
    let now = state.clock.now();
    let record = match record_queries::find_record(state, member.as_str(), event_key.as_str())
        .await?
    {
        Some(mut record) => {
            record.status = AttendanceStatus::Excused;
            record.penalty = None;
            record.departure_penalty = None;
            if record.departure_status.is_some() {
                record.departure_status = Some(AttendanceStatus::Excused);
            }
            record.note = note;
            record.updated_at = now;
            record.synced = false;
            state.local_store.upsert_record(&record).await?;
            record
        }
        None => {
            let record = AttendanceRecord {
                id: new_record_id(),
                member_id: member.as_str().to_string(),
                event_id: event_key.as_str().to_string(),
                arrived_at: now,
                status: AttendanceStatus::Excused,
                penalty: None,
                fix: None,
                synced: false,
                note,
                departed_at: None,
                departure_status: None,
                departure_penalty: None,
                updated_at: now,
            };
            if let InsertOutcome::Conflict(_) =
                state.local_store.insert_record_if_absent(&record).await?
            {
                return Err(already_marked(&member, &event_key));
            }
            record
        }
    };
    info!(member_id = %record.member_id, event_id = %record.event_id, "member excused");
    Ok(record)
}

async fn locate_inside(state: &AppState, event: &Event) -> Result<Coordinate, AttendanceError> {
    let limit = Duration::from_secs(state.config.location_timeout_seconds.max(1));
    let fix = match tokio::time::timeout(limit, state.location.current_fix()).await {
        Ok(result) => result?,
        Err(_) => {
            warn!(event_id = %event.id, timeout_secs = limit.as_secs(), "location fix timed out");
            None
        }
    };
    let fix = fix.ok_or(AttendanceError::LocationUnavailable)?;
    let check = evaluate(event, &fix.coordinate)?;
    if !check.inside {
        return Err(AttendanceError::OutsideGeofence {
            distance_m: check.distance_m,
            radius_m: check.radius_m,
        });
    }
    Ok(fix.coordinate)
}

fn already_marked(member: &MemberId, event: &EventId) -> AttendanceError {
    AttendanceError::AlreadyMarked {
        member_id: member.as_str().to_string(),
        event_id: event.as_str().to_string(),
    }
}

fn log_rejection(
    state: &AppState,
    action: &str,
    member_id: &str,
    event_id: &str,
    err: &AttendanceError,
) {
    state.metrics.record_rejection(err.is_fault());
    match err {
        AttendanceError::AlreadyMarked { .. } => {
            info!(action, member_id, event_id, "already marked")
        }
        AttendanceError::OperationFailed(cause) => {
            error!(action, member_id, event_id, error = %cause, "attendance operation failed")
        }
        other => warn!(action, member_id, event_id, reason = other.kind(), "attendance rejected"),
    }
}
