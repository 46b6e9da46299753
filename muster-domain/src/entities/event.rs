// Event entity
// A scheduled, geofenced session members check in to

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::value_objects::Coordinate;

/// Minute offsets of the sign-in window around the start and the sign-out window around the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOffsets {
    /// Minutes before start at which sign-in opens.
    pub sign_in_start: i64,
    /// Minutes after start at which sign-in closes.
    pub sign_in_end: i64,
    /// Minutes before end at which sign-out opens.
    pub sign_out_start: i64,
    /// Minutes after end at which sign-out closes.
    pub sign_out_end: i64,
}

impl Default for WindowOffsets {
    fn default() -> Self {
        Self {
            sign_in_start: 15,
            sign_in_end: 30,
            sign_out_start: 15,
            sign_out_end: 30,
        }
    }
}

impl WindowOffsets {
    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("sign_in_start", self.sign_in_start),
            ("sign_in_end", self.sign_in_end),
            ("sign_out_start", self.sign_out_start),
            ("sign_out_end", self.sign_out_end),
        ] {
            if value < 0 {
                return Err(ValidationError::NegativeOffset { field, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub center: Coordinate,
    pub radius_m: f64,
    pub offsets: WindowOffsets,
    pub active: bool,
}

/// Administrative creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEvent {
    pub id: String,
    pub name: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub center: Coordinate,
    pub radius_m: f64,
    #[serde(default)]
    pub offsets: WindowOffsets,
}

/// Administrative update; only time, location and activity may change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventUpdate {
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub center: Option<Coordinate>,
    pub radius_m: Option<f64>,
    pub active: Option<bool>,
}

impl Event {
    pub fn create(new: NewEvent) -> Result<Self, ValidationError> {
        let event = Self {
            id: new.id.trim().to_string(),
            name: new.name.trim().to_string(),
            starts_at: new.starts_at,
            ends_at: new.ends_at,
            center: new.center,
            radius_m: new.radius_m,
            offsets: new.offsets,
            active: true,
        };
        event.validate()?;
        Ok(event)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::BlankField("event id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::BlankField("event name"));
        }
        if self.starts_at >= self.ends_at {
            return Err(ValidationError::StartNotBeforeEnd);
        }
        // NaN fails this comparison too
        if !(self.radius_m > 0.0) || !self.radius_m.is_finite() {
            return Err(ValidationError::NonPositiveRadius(self.radius_m));
        }
        self.center.validate()?;
        self.offsets.validate()
    }

    pub fn apply_update(&self, update: &EventUpdate) -> Result<Self, ValidationError> {
        let mut next = self.clone();
        if let Some(starts_at) = update.starts_at {
            next.starts_at = starts_at;
        }
        if let Some(ends_at) = update.ends_at {
            next.ends_at = ends_at;
        }
        if let Some(center) = update.center {
            next.center = center;
        }
        if let Some(radius_m) = update.radius_m {
            next.radius_m = radius_m;
        }
        if let Some(active) = update.active {
            next.active = active;
        }
        next.validate()?;
        Ok(next)
    }

    pub fn sign_in_opens_at(&self) -> DateTime<Utc> {
        self.starts_at - Duration::minutes(self.offsets.sign_in_start)
    }

    pub fn sign_in_closes_at(&self) -> DateTime<Utc> {
        self.starts_at + Duration::minutes(self.offsets.sign_in_end)
    }

    pub fn sign_out_opens_at(&self) -> DateTime<Utc> {
        self.ends_at - Duration::minutes(self.offsets.sign_out_start)
    }

    pub fn sign_out_closes_at(&self) -> DateTime<Utc> {
        self.ends_at + Duration::minutes(self.offsets.sign_out_end)
    }
}
