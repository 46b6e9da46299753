use std::sync::Arc;

use muster_domain::ports::{Clock, CredentialVerifier, LocalStore, LocationSource, RemoteStore};
use muster_domain::RuntimeConfig;
use tokio::sync::Mutex;

use crate::ops::KeyedLocks;
use crate::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub config: RuntimeConfig,
    pub local_store: Arc<dyn LocalStore>,
    /// `None` runs the engine fully offline; sync then reports a failure.
    pub remote_store: Option<Arc<dyn RemoteStore>>,
    pub location: Arc<dyn LocationSource>,
    pub credentials: Arc<dyn CredentialVerifier>,
    pub clock: Arc<dyn Clock>,
    pub record_locks: Arc<KeyedLocks>,
    /// Held for a whole push/pull cycle so cycles never overlap.
    pub sync_guard: Arc<Mutex<()>>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    pub fn new(
        config: RuntimeConfig,
        local_store: Arc<dyn LocalStore>,
        remote_store: Option<Arc<dyn RemoteStore>>,
        location: Arc<dyn LocationSource>,
        credentials: Arc<dyn CredentialVerifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config,
            local_store,
            remote_store,
            location,
            credentials,
            clock,
            record_locks: Arc::new(KeyedLocks::default()),
            sync_guard: Arc::new(Mutex::new(())),
            metrics: Arc::new(Metrics::default()),
        }
    }
}
