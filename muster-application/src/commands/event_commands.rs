use muster_domain::{Event, EventUpdate, NewEvent, ValidationError};
use tracing::info;

use crate::queries::event_queries;
use crate::{AppState, AttendanceError};

/// Saves the event on this device only. Sync moves attendance records, not events;
/// publishing an event to the remote store for other devices is an admin-side concern.
pub async fn create_event(state: &AppState, payload: NewEvent) -> Result<Event, AttendanceError> {
    let event = Event::create(payload)?;
    if state.local_store.get_event(&event.id).await?.is_some() {
        return Err(ValidationError::DuplicateEvent(event.id).into());
    }
    state.local_store.save_event(&event).await?;
    info!(event_id = %event.id, name = %event.name, "event created");
    Ok(event)
}

pub async fn update_event(
    state: &AppState,
    event_id: &str,
    update: EventUpdate,
) -> Result<Event, AttendanceError> {
    let current = event_queries::get_event(state, event_id.trim())
        .await?
        .ok_or_else(|| AttendanceError::EventNotFound(event_id.trim().to_string()))?;
    let updated = current.apply_update(&update)?;
    state.local_store.save_event(&updated).await?;
    info!(event_id = %updated.id, active = updated.active, "event updated");
    Ok(updated)
}

pub async fn set_event_active(
    state: &AppState,
    event_id: &str,
    active: bool,
) -> Result<Event, AttendanceError> {
    update_event(
        state,
        event_id,
        EventUpdate {
            active: Some(active),
            ..EventUpdate::default()
        },
    )
    .await
}
