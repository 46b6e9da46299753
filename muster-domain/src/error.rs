use thiserror::Error;

/// Input rejected before any storage or collaborator is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{0} must not be blank")]
    BlankField(&'static str),
    #[error("coordinate is not a finite number: lat={lat}, lon={lon}")]
    NonFiniteCoordinate { lat: f64, lon: f64 },
    #[error("coordinate out of range: lat={lat}, lon={lon}")]
    CoordinateOutOfRange { lat: f64, lon: f64 },
    #[error("geofence radius must be a positive number of meters, got {0}")]
    NonPositiveRadius(f64),
    #[error("event start must be before end")]
    StartNotBeforeEnd,
    #[error("window offset {field} must not be negative, got {value}")]
    NegativeOffset { field: &'static str, value: i64 },
    #[error("event '{0}' already exists")]
    DuplicateEvent(String),
    #[error("unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}
