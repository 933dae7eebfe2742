//! Radius-bounded tolerance check between a reported device position and a
//! fixed anchor point.

use crate::error::WalkError;
use crate::geo_math;
use crate::types::LatLng;

/// True when `reported` lies within `radius_meters` of `anchor`.
pub fn within_radius(reported: LatLng, anchor: LatLng, radius_meters: f64) -> bool {
    geo_math::haversine_meters(reported, anchor) <= radius_meters
}

/// Geofence check that carries the measured distance on failure, so callers
/// can surface how far off the reporting device was.
pub fn ensure_within(reported: LatLng, anchor: LatLng, radius_meters: f64) -> Result<(), WalkError> {
    let distance_meters = geo_math::haversine_meters(reported, anchor);
    if distance_meters > radius_meters {
        return Err(WalkError::GeofenceViolation {
            distance_meters,
            radius_meters,
        });
    }
    Ok(())
}
