use std::time::Duration;

use tokio::sync::watch;
use tracing::{info, warn};

use muster_application::commands::sync_commands;
use muster_application::AppState;

/// Runs a sync cycle every `interval` until `shutdown` flips to true or its sender is dropped.
pub async fn schedule_sync(
    state: AppState,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(interval_secs = interval.as_secs(), "sync scheduler started");
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
        }

        let summary = sync_commands::sync_all(&state).await;
        if !summary.pull.is_success() || !summary.push.is_success() {
            warn!(
                pull = ?summary.pull,
                push = ?summary.push,
                "sync cycle incomplete; retrying next interval"
            );
        }
    }
    info!("sync scheduler stopped");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration as ChronoDuration, Utc};
    use muster_application::commands::{attendance_commands, event_commands};
    use muster_domain::{
        Coordinate, NewEvent, RemoteStore, RuntimeConfig, Watermark, WindowOffsets,
    };

    use super::*;
    use crate::{
        FixedLocationSource, InMemoryLocalStore, InMemoryRemoteStore, PassTokenVerifier,
        SystemClock,
    };

    #[tokio::test(start_paused = true)]
    async fn pushes_on_interval_and_stops() {
        let here = Coordinate::new(40.4168, -3.7038).unwrap();
        let remote = Arc::new(InMemoryRemoteStore::new());
        let state = AppState::new(
            RuntimeConfig::default(),
            Arc::new(InMemoryLocalStore::new()),
            Some(remote.clone()),
            Arc::new(FixedLocationSource::new(here, None)),
            Arc::new(PassTokenVerifier::new(None, None, Arc::new(SystemClock))),
            Arc::new(SystemClock),
        );
        let now = Utc::now();
        event_commands::create_event(
            &state,
            NewEvent {
                id: "plaza".to_string(),
                name: "Plaza meetup".to_string(),
                starts_at: now,
                ends_at: now + ChronoDuration::hours(1),
                center: here,
                radius_m: 30.0,
                offsets: WindowOffsets::default(),
            },
        )
        .await
        .unwrap();
        attendance_commands::mark_attendance(&state, "m1", "plaza")
            .await
            .unwrap();

        let (tx, rx) = watch::channel(false);
        let worker = tokio::spawn(schedule_sync(state.clone(), Duration::from_secs(60), rx));

        tokio::time::sleep(Duration::from_secs(61)).await;
        let batch = remote.list_changed_since(Watermark::ORIGIN).await.unwrap();
        assert_eq!(batch.records.len(), 1);

        tx.send(true).unwrap();
        worker.await.unwrap();
    }
}
