// Runtime settings handed to the application layer

#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub location_timeout_seconds: u64,
    pub credential_timeout_seconds: u64,
    pub sync_enabled: bool,
    pub sync_interval_seconds: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            location_timeout_seconds: 10,
            credential_timeout_seconds: 30,
            sync_enabled: true,
            sync_interval_seconds: 300,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_path: String,
    pub remote_base_url: Option<String>,
    pub remote_api_token: Option<String>,
    pub remote_timeout_seconds: u64,
}
