use std::env;
use std::path::Path;

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tokio::fs;
use tracing::warn;

use muster_domain::{RuntimeConfig, StoreConfig};

use crate::config::validation::{require_positive, validate_base_url};
use crate::utils::non_blank;

const MIN_PASS_SECRET_LEN: usize = 16;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: String,
    pub remote_base_url: Option<String>,
    pub remote_api_token: Option<String>,
    pub remote_timeout_seconds: u64,
    pub location_timeout_seconds: u64,
    pub credential_timeout_seconds: u64,
    pub sync_interval_seconds: u64,
    pub sync_enabled: bool,
    pub pass_secret: Option<String>,
    pub log_dir: Option<String>,
    pub log_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: "./muster.db".to_string(),
            remote_base_url: None,
            remote_api_token: None,
            remote_timeout_seconds: 15,
            location_timeout_seconds: 10,
            credential_timeout_seconds: 30,
            sync_interval_seconds: 300,
            sync_enabled: true,
            pass_secret: None,
            log_dir: None,
            log_json: false,
        }
    }
}

impl AppConfig {
    pub async fn load() -> Result<Self> {
        let path = env::var("MUSTER_CONFIG").unwrap_or_else(|_| "./config.toml".to_string());
        Self::load_from(&path).await
    }

    pub async fn load_from(path: &str) -> Result<Self> {
        let file_path = Path::new(path);
        let mut config = if file_path.exists() {
            let content = fs::read_to_string(file_path).await?;
            toml::from_str(&content).map_err(|err| anyhow!("invalid {}: {}", path, err))?
        } else {
            warn!(path, "config file not found, using defaults");
            AppConfig::default()
        };
        config.apply_env_overrides();
        config.resolve_paths(file_path.parent());
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    pub fn normalize(&mut self) {
        self.remote_base_url = non_blank(self.remote_base_url.take())
            .map(|url| url.trim_end_matches('/').to_string());
        self.remote_api_token = non_blank(self.remote_api_token.take());
        self.pass_secret = non_blank(self.pass_secret.take());
        self.log_dir = non_blank(self.log_dir.take());
        self.database_path = self.database_path.trim().to_string();
    }

    fn resolve_paths(&mut self, base_dir: Option<&Path>) {
        let Some(base) = base_dir else {
            return;
        };
        self.database_path = resolve_path(base, &self.database_path);
        if let Some(dir) = &self.log_dir {
            self.log_dir = Some(resolve_path(base, dir));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.database_path.is_empty() {
            return Err(anyhow!("database_path must not be empty"));
        }
        if let Some(url) = &self.remote_base_url {
            validate_base_url(url)?;
        }
        if self.remote_api_token.is_some() && self.remote_base_url.is_none() {
            return Err(anyhow!("remote_api_token set without remote_base_url"));
        }
        require_positive("remote_timeout_seconds", self.remote_timeout_seconds)?;
        require_positive("location_timeout_seconds", self.location_timeout_seconds)?;
        require_positive("credential_timeout_seconds", self.credential_timeout_seconds)?;
        require_positive("sync_interval_seconds", self.sync_interval_seconds)?;
        if let Some(secret) = &self.pass_secret {
            if secret.len() < MIN_PASS_SECRET_LEN {
                return Err(anyhow!(
                    "pass_secret must be at least {} characters",
                    MIN_PASS_SECRET_LEN
                ));
            }
        }
        Ok(())
    }

    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig {
            location_timeout_seconds: self.location_timeout_seconds,
            credential_timeout_seconds: self.credential_timeout_seconds,
            sync_enabled: self.sync_enabled && self.remote_base_url.is_some(),
            sync_interval_seconds: self.sync_interval_seconds,
        }
    }

    pub fn to_store_config(&self) -> StoreConfig {
        StoreConfig {
            database_path: self.database_path.clone(),
            remote_base_url: self.remote_base_url.clone(),
            remote_api_token: self.remote_api_token.clone(),
            remote_timeout_seconds: self.remote_timeout_seconds,
        }
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = env::var("MUSTER_DATABASE_PATH") {
            self.database_path = value;
        }
        if let Ok(value) = env::var("MUSTER_REMOTE_BASE_URL") {
            self.remote_base_url = Some(value);
        }
        if let Ok(value) = env::var("MUSTER_REMOTE_API_TOKEN") {
            self.remote_api_token = Some(value);
        }
        if let Ok(value) = env::var("MUSTER_REMOTE_TIMEOUT_SECONDS") {
            self.remote_timeout_seconds = value.parse().unwrap_or(self.remote_timeout_seconds);
        }
        if let Ok(value) = env::var("MUSTER_LOCATION_TIMEOUT_SECONDS") {
            self.location_timeout_seconds = value.parse().unwrap_or(self.location_timeout_seconds);
        }
        if let Ok(value) = env::var("MUSTER_CREDENTIAL_TIMEOUT_SECONDS") {
            self.credential_timeout_seconds =
                value.parse().unwrap_or(self.credential_timeout_seconds);
        }
        if let Ok(value) = env::var("MUSTER_SYNC_INTERVAL_SECONDS") {
            self.sync_interval_seconds = value.parse().unwrap_or(self.sync_interval_seconds);
        }
        if let Ok(value) = env::var("MUSTER_SYNC_ENABLED") {
            self.sync_enabled = value.parse().unwrap_or(self.sync_enabled);
        }
        if let Ok(value) = env::var("MUSTER_PASS_SECRET") {
            self.pass_secret = Some(value);
        }
        if let Ok(value) = env::var("MUSTER_LOG_DIR") {
            self.log_dir = Some(value);
        }
        if let Ok(value) = env::var("MUSTER_LOG_JSON") {
            self.log_json = value.parse().unwrap_or(self.log_json);
        }
    }
}

fn resolve_path(base: &Path, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == ":memory:" {
        return trimmed.to_string();
    }
    let path = Path::new(trimmed);
    if path.is_absolute() {
        trimmed.to_string()
    } else {
        base.join(path).to_string_lossy().to_string()
    }
}
