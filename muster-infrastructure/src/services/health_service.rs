use serde::Serialize;

use muster_application::AppState;
use muster_domain::Watermark;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail", rename_all = "snake_case")]
pub enum ComponentHealth {
    Ok,
    Down(String),
    NotConfigured,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub local_store: ComponentHealth,
    pub remote_store: ComponentHealth,
    pub unsynced_records: Option<usize>,
    pub watermark: Option<Watermark>,
}

impl HealthReport {
    /// The engine can mark attendance; an unreachable remote only delays sync.
    pub fn is_healthy(&self) -> bool {
        self.local_store == ComponentHealth::Ok
    }
}

pub async fn check_health(state: &AppState) -> HealthReport {
    let local_store = match state.local_store.ping().await {
        Ok(()) => ComponentHealth::Ok,
        Err(err) => ComponentHealth::Down(err.to_string()),
    };
    let remote_store = match &state.remote_store {
        Some(remote) => match remote.ping().await {
            Ok(()) => ComponentHealth::Ok,
            Err(err) => ComponentHealth::Down(err.to_string()),
        },
        None => ComponentHealth::NotConfigured,
    };
    let unsynced_records = state
        .local_store
        .list_unsynced()
        .await
        .ok()
        .map(|records| records.len());
    let watermark = state.local_store.load_watermark().await.ok();
    HealthReport {
        local_store,
        remote_store,
        unsynced_records,
        watermark,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use muster_domain::{LocalStore, RuntimeConfig};

    use super::*;
    use crate::{
        FixedLocationSource, InMemoryLocalStore, PassTokenVerifier, SqliteLocalStore, SystemClock,
    };

    fn state(local: Arc<dyn LocalStore>) -> AppState {
        AppState::new(
            RuntimeConfig::default(),
            local,
            None,
            Arc::new(FixedLocationSource::unavailable()),
            Arc::new(PassTokenVerifier::new(None, None, Arc::new(SystemClock))),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn offline_engine_is_healthy() {
        let report = check_health(&state(Arc::new(InMemoryLocalStore::new()))).await;
        assert!(report.is_healthy());
        assert_eq!(report.remote_store, ComponentHealth::NotConfigured);
        assert_eq!(report.unsynced_records, Some(0));
        assert_eq!(report.watermark, Some(Watermark::ORIGIN));
    }

    #[tokio::test]
    async fn closed_store_is_down() {
        let store = Arc::new(SqliteLocalStore::open_in_memory().unwrap());
        store.close().await.unwrap();
        let report = check_health(&state(store)).await;
        assert!(!report.is_healthy());
        assert!(matches!(report.local_store, ComponentHealth::Down(_)));
        assert_eq!(report.unsynced_records, None);
    }
}
