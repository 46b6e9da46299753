use serde::Serialize;

use crate::entities::Event;
use crate::error::ValidationError;
use crate::value_objects::Coordinate;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeofenceCheck {
    pub distance_m: f64,
    pub radius_m: f64,
    pub inside: bool,
}

/// Great-circle distance in meters. Both points are validated first.
pub fn distance_m(a: &Coordinate, b: &Coordinate) -> Result<f64, ValidationError> {
    a.validate()?;
    b.validate()?;
    Ok(haversine_m(a, b))
}

pub fn is_within(event: &Event, fix: &Coordinate) -> Result<bool, ValidationError> {
    evaluate(event, fix).map(|check| check.inside)
}

/// Containment test that also reports how far the fix was from the center.
pub fn evaluate(event: &Event, fix: &Coordinate) -> Result<GeofenceCheck, ValidationError> {
    let distance_m = distance_m(&event.center, fix)?;
    Ok(GeofenceCheck {
        distance_m,
        radius_m: event.radius_m,
        inside: distance_m <= event.radius_m,
    })
}

fn haversine_m(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = lat_b - lat_a;
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push h a hair above 1 for antipodal points
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}
