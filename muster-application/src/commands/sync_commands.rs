use std::sync::Arc;

use muster_domain::{
    decide_merge, prevailing_record, AttendanceRecord, InsertOutcome, MergeDecision, RemoteStore,
    UpsertOutcome,
};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::AppState;

const NO_REMOTE: &str = "remote store not configured";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    Success {
        succeeded: usize,
        skipped: usize,
    },
    PartialSuccess {
        succeeded: usize,
        failed: usize,
        skipped: usize,
    },
    Failed {
        failed: usize,
        reason: String,
    },
}

impl SyncOutcome {
    pub fn from_counts(succeeded: usize, failed: usize, skipped: usize) -> Self {
        if failed == 0 {
            SyncOutcome::Success { succeeded, skipped }
        } else if succeeded > 0 {
            SyncOutcome::PartialSuccess {
                succeeded,
                failed,
                skipped,
            }
        } else {
            SyncOutcome::Failed {
                failed,
                reason: format!("{failed} record(s) failed"),
            }
        }
    }

    fn failed(reason: impl Into<String>) -> Self {
        SyncOutcome::Failed {
            failed: 0,
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Success { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub pull: SyncOutcome,
    pub push: SyncOutcome,
}

/// Uploads every unsynced local record.
pub async fn push(state: &AppState) -> SyncOutcome {
    let _cycle = state.sync_guard.lock().await;
    push_unguarded(state).await
}

/// Applies remote changes newer than the stored watermark.
pub async fn pull(state: &AppState) -> SyncOutcome {
    let _cycle = state.sync_guard.lock().await;
    pull_unguarded(state).await
}

/// Pull, then push. Push still runs when the pull failed.
pub async fn sync_all(state: &AppState) -> SyncSummary {
    let _cycle = state.sync_guard.lock().await;
    let pull = pull_unguarded(state).await;
    let push = push_unguarded(state).await;
    info!(?pull, ?push, "sync cycle finished");
    SyncSummary { pull, push }
}

fn remote(state: &AppState) -> Option<&Arc<dyn RemoteStore>> {
    state.remote_store.as_ref()
}

async fn push_unguarded(state: &AppState) -> SyncOutcome {
    let Some(remote) = remote(state) else {
        return SyncOutcome::failed(NO_REMOTE);
    };
    let pending = match state.local_store.list_unsynced().await {
        Ok(pending) => pending,
        Err(err) => {
            error!(error = %err, "failed to list unsynced records");
            return SyncOutcome::failed(format!("local store unavailable: {err}"));
        }
    };
    if pending.is_empty() {
        debug!("nothing to push");
        return SyncOutcome::Success {
            succeeded: 0,
            skipped: 0,
        };
    }

    let mut succeeded = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for record in pending {
        match push_one(state, remote.as_ref(), record).await {
            Ok(Pushed::Uploaded) => succeeded += 1,
            Ok(Pushed::Superseded) => skipped += 1,
            Err(err) => {
                warn!(error = %err, "record push failed; will retry next cycle");
                failed += 1;
            }
        }
    }
    state.metrics.record_push(succeeded, failed);
    info!(succeeded, failed, skipped, "push finished");
    SyncOutcome::from_counts(succeeded, failed, skipped)
}

enum Pushed {
    Uploaded,
    /// The remote already holds a prevailing record for the key; it replaced ours.
    Superseded,
}

async fn push_one(
    state: &AppState,
    remote: &dyn RemoteStore,
    record: AttendanceRecord,
) -> anyhow::Result<Pushed> {
    let version = record.updated_at;
    let id = record.id.clone();
    match remote.upsert_record(&record.with_synced(true)).await? {
        UpsertOutcome::Applied => {
            let flipped = state.local_store.mark_synced(&id, version).await?;
            if !flipped {
                debug!(record_id = %id, "record changed during push; left unsynced");
            }
            Ok(Pushed::Uploaded)
        }
        UpsertOutcome::Superseded(holder) => {
            let _guard = state
                .record_locks
                .lock(&holder.member_id, &holder.event_id)
                .await;
            adopt(state, &id, holder).await?;
            Ok(Pushed::Superseded)
        }
    }
}

/// Swaps a local record that lost its (member, event) key for the prevailing one.
/// Callers hold the key lock.
async fn adopt(
    state: &AppState,
    local_id: &str,
    prevailing: AttendanceRecord,
) -> anyhow::Result<()> {
    warn!(
        member_id = %prevailing.member_id,
        event_id = %prevailing.event_id,
        local_id,
        remote_id = %prevailing.id,
        "local record superseded by an earlier remote record"
    );
    state
        .local_store
        .replace_record(local_id, &prevailing.with_synced(true))
        .await
}

async fn pull_unguarded(state: &AppState) -> SyncOutcome {
    let Some(remote) = remote(state) else {
        return SyncOutcome::failed(NO_REMOTE);
    };
    let current = match state.local_store.load_watermark().await {
        Ok(watermark) => watermark,
        Err(err) => {
            error!(error = %err, "failed to load watermark");
            return SyncOutcome::failed(format!("local store unavailable: {err}"));
        }
    };
    let batch = match remote.list_changed_since(current).await {
        Ok(batch) => batch,
        Err(err) => {
            warn!(watermark = %current, error = %err, "failed to fetch remote changes");
            return SyncOutcome::failed(format!("remote unavailable: {err}"));
        }
    };

    let mut succeeded = 0;
    let mut failed = 0;
    let mut skipped = 0;
    for record in batch.records {
        match apply_remote(state, record).await {
            Ok(true) => succeeded += 1,
            Ok(false) => skipped += 1,
            Err(err) => {
                warn!(error = %err, "failed to apply remote record");
                failed += 1;
            }
        }
    }
    state.metrics.record_pull(succeeded, failed);

    if failed == 0 && batch.next_watermark > current {
        if let Err(err) = state.local_store.save_watermark(batch.next_watermark).await {
            error!(error = %err, "failed to save watermark");
            return SyncOutcome::Failed {
                failed: 0,
                reason: format!("watermark not saved: {err}"),
            };
        }
        debug!(from = %current, to = %batch.next_watermark, "watermark advanced");
    }
    info!(succeeded, failed, skipped, "pull finished");
    SyncOutcome::from_counts(succeeded, failed, skipped)
}

/// Returns whether the record changed local state.
async fn apply_remote(state: &AppState, remote: AttendanceRecord) -> anyhow::Result<bool> {
    let _guard = state
        .record_locks
        .lock(&remote.member_id, &remote.event_id)
        .await;
    let local = state.local_store.get_record_by_id(&remote.id).await?;
    let incoming = remote.with_synced(true);
    match decide_merge(local.as_ref(), &incoming) {
        MergeDecision::Insert => match state.local_store.insert_record_if_absent(&incoming).await? {
            InsertOutcome::Inserted => Ok(true),
            InsertOutcome::Conflict(existing) => {
                if prevailing_record(&existing, &incoming).id == incoming.id {
                    adopt(state, &existing.id, incoming).await?;
                    return Ok(true);
                }
                // ours prevails; the next push replaces the remote copy
                debug!(
                    local_id = %existing.id,
                    remote_id = %incoming.id,
                    "local record prevails over remote record"
                );
                if existing.synced {
                    state
                        .local_store
                        .upsert_record(&existing.with_synced(false))
                        .await?;
                }
                Ok(false)
            }
        },
        MergeDecision::UseRemote => {
            state.local_store.upsert_record(&incoming).await?;
            Ok(true)
        }
        MergeDecision::KeepLocal => Ok(false),
    }
}
