use muster_domain::Event;
use tracing::{debug, warn};

use crate::{AppState, AttendanceError};

/// Looks an event up locally first, then on the remote; a remote hit is cached locally.
pub async fn get_event(state: &AppState, event_id: &str) -> Result<Option<Event>, AttendanceError> {
    if let Some(event) = state.local_store.get_event(event_id).await? {
        return Ok(Some(event));
    }
    let Some(remote) = state.remote_store.as_ref() else {
        return Ok(None);
    };
    let loaded = remote.get_event(event_id).await?;
    if let Some(ref event) = loaded {
        debug!(event_id, "event fetched from remote");
        if let Err(err) = state.local_store.save_event(event).await {
            warn!(event_id, error = %err, "failed to cache remote event locally");
        }
    }
    Ok(loaded)
}

/// Like [`get_event`], but an absent or inactive event is an error.
pub async fn get_active_event(state: &AppState, event_id: &str) -> Result<Event, AttendanceError> {
    match get_event(state, event_id).await? {
        Some(event) if event.active => Ok(event),
        _ => Err(AttendanceError::EventNotFound(event_id.to_string())),
    }
}
