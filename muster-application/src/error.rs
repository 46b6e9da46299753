use thiserror::Error;

use muster_domain::ValidationError;

/// Closed set of outcomes a caller can see from the attendance operations.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),
    #[error("event '{0}' not found or inactive")]
    EventNotFound(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("attendance already marked for member '{member_id}' at event '{event_id}'")]
    AlreadyMarked { member_id: String, event_id: String },
    #[error("location unavailable")]
    LocationUnavailable,
    #[error("outside geofence: {distance_m:.1} m from center, radius {radius_m:.1} m")]
    OutsideGeofence { distance_m: f64, radius_m: f64 },
    #[error("no attendance marked for member '{member_id}' at event '{event_id}'")]
    NotMarked { member_id: String, event_id: String },
    #[error("departure already recorded for member '{member_id}' at event '{event_id}'")]
    AlreadyDeparted { member_id: String, event_id: String },
    #[error("credential rejected: {0}")]
    CredentialRejected(String),
    #[error("operation failed: {0}")]
    OperationFailed(#[from] anyhow::Error),
}

impl AttendanceError {
    /// Stable short name, used for metrics labels and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            AttendanceError::Validation(_) => "validation",
            AttendanceError::EventNotFound(_) => "event_not_found",
            AttendanceError::NotFound(_) => "not_found",
            AttendanceError::AlreadyMarked { .. } => "already_marked",
            AttendanceError::LocationUnavailable => "location_unavailable",
            AttendanceError::OutsideGeofence { .. } => "outside_geofence",
            AttendanceError::NotMarked { .. } => "not_marked",
            AttendanceError::AlreadyDeparted { .. } => "already_departed",
            AttendanceError::CredentialRejected(_) => "credential_rejected",
            AttendanceError::OperationFailed(_) => "operation_failed",
        }
    }

    /// Business outcomes are expected; only collaborator faults are failures.
    pub fn is_fault(&self) -> bool {
        matches!(self, AttendanceError::OperationFailed(_))
    }
}
