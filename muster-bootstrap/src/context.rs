use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use muster_application::AppState;
use muster_domain::{Coordinate, LocalStore, RemoteStore};
use muster_infrastructure::{
    AppConfig, FixedLocationSource, HttpRemoteStore, InMemoryLocalStore, PassTokenVerifier,
    SqliteLocalStore, SystemClock,
};

/// Per-invocation inputs that do not belong in the config file.
#[derive(Debug, Clone, Default)]
pub struct ContextOptions {
    /// Keep all local state in memory instead of the SQLite file.
    pub memory: bool,
    pub position: Option<Coordinate>,
    pub accuracy_m: Option<f64>,
    /// Day pass presented for check-in.
    pub pass: Option<String>,
}

pub struct AppContext {
    pub config: AppConfig,
    pub state: AppState,
}

impl AppContext {
    pub async fn new(options: ContextOptions) -> Result<Self> {
        let config = AppConfig::load().await?;
        Self::from_config(config, options)
    }

    pub fn from_config(config: AppConfig, options: ContextOptions) -> Result<Self> {
        let store_config = config.to_store_config();
        let local: Arc<dyn LocalStore> = if options.memory {
            info!("using in-memory local store");
            Arc::new(InMemoryLocalStore::new())
        } else {
            Arc::new(SqliteLocalStore::open(&store_config.database_path)?)
        };
        let remote = HttpRemoteStore::from_config(&store_config)?
            .map(|store| Arc::new(store) as Arc<dyn RemoteStore>);
        if remote.is_none() {
            info!("no remote configured; running offline");
        }
        Ok(Self::with_stores(config, local, remote, options))
    }

    /// Wires the engine around already constructed stores.
    pub fn with_stores(
        config: AppConfig,
        local: Arc<dyn LocalStore>,
        remote: Option<Arc<dyn RemoteStore>>,
        options: ContextOptions,
    ) -> Self {
        let clock = Arc::new(SystemClock);
        let location = match options.position {
            Some(position) => FixedLocationSource::new(position, options.accuracy_m),
            None => FixedLocationSource::unavailable(),
        };
        let credentials =
            PassTokenVerifier::new(config.pass_secret.clone(), options.pass, clock.clone());
        let state = AppState::new(
            config.to_runtime_config(),
            local,
            remote,
            Arc::new(location),
            Arc::new(credentials),
            clock,
        );
        Self { config, state }
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.state.local_store.close().await
    }
}
