use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use muster_domain::{Coordinate, Fix, LocationSource};

/// Reports a position supplied up front, e.g. from the command line.
#[derive(Debug, Clone, Default)]
pub struct FixedLocationSource {
    coordinate: Option<Coordinate>,
    accuracy_m: Option<f64>,
}

impl FixedLocationSource {
    pub fn new(coordinate: Coordinate, accuracy_m: Option<f64>) -> Self {
        Self {
            coordinate: Some(coordinate),
            accuracy_m,
        }
    }

    /// A source that never has a fix.
    pub fn unavailable() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocationSource for FixedLocationSource {
    async fn current_fix(&self) -> Result<Option<Fix>> {
        Ok(self.coordinate.map(|coordinate| Fix {
            coordinate,
            accuracy_m: self.accuracy_m,
            taken_at: Utc::now(),
        }))
    }
}
