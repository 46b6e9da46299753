// Geographic value objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        let coordinate = Self {
            latitude,
            longitude,
        };
        coordinate.validate()?;
        Ok(coordinate)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let (lat, lon) = (self.latitude, self.longitude);
        if !lat.is_finite() || !lon.is_finite() {
            return Err(ValidationError::NonFiniteCoordinate { lat, lon });
        }
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ValidationError::CoordinateOutOfRange { lat, lon });
        }
        Ok(())
    }
}

/// A position reported by the location collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    pub coordinate: Coordinate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy_m: Option<f64>,
    pub taken_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_nan_and_out_of_range() {
        assert!(matches!(
            Coordinate::new(f64::NAN, 0.0),
            Err(ValidationError::NonFiniteCoordinate { .. })
        ));
        assert!(matches!(
            Coordinate::new(0.0, f64::INFINITY),
            Err(ValidationError::NonFiniteCoordinate { .. })
        ));
        assert!(matches!(
            Coordinate::new(91.0, 0.0),
            Err(ValidationError::CoordinateOutOfRange { .. })
        ));
        assert!(Coordinate::new(-33.8688, 151.2093).is_ok());
    }
}
