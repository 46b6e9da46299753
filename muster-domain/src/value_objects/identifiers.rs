// Identifier value objects

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberId(String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(String);

impl MemberId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        normalize_id(raw, "member_id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl EventId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        normalize_id(raw, "event_id").map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize_id(raw: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(trimmed.to_string())
}

/// Fresh record identifier; also the idempotency key for remote upserts.
pub fn new_record_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
