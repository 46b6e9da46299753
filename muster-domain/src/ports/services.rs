use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Fix;

#[async_trait]
pub trait LocationSource: Send + Sync {
    /// `None` when no fix can be obtained right now.
    async fn current_fix(&self) -> anyhow::Result<Option<Fix>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verification {
    Pass,
    Fail(String),
}

#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    async fn verify(&self, member_id: &str) -> anyhow::Result<Verification>;
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
