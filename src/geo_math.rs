//! Geodesic primitives shared by the route engine, the geofence and the
//! track summarizer. Pure functions, no I/O.

use geo::{Bearing, Coord, Destination, Distance, Haversine, Point};

use crate::error::WalkError;
use crate::types::LatLng;

/// Polyline precision used across the system (Google encoded polylines).
const POLYLINE_PRECISION: u32 = 5;

fn to_point(p: LatLng) -> Point<f64> {
    Point::new(p.lng, p.lat)
}

/// Great-circle distance between two positions in meters.
pub fn haversine_meters(a: LatLng, b: LatLng) -> f64 {
    Haversine.distance(to_point(a), to_point(b))
}

/// Great-circle distance between two positions in kilometers.
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    haversine_meters(a, b) / 1000.0
}

/// Forward geodesic: the position reached by travelling `distance_km` from
/// `origin` along `bearing_deg` (degrees clockwise from north).
pub fn destination_from_bearing(origin: LatLng, distance_km: f64, bearing_deg: f64) -> LatLng {
    let dest = Haversine.destination(to_point(origin), bearing_deg, distance_km * 1000.0);
    LatLng::new(dest.y(), dest.x())
}

/// Initial bearing from `a` to `b`, normalized to [0, 360).
pub fn bearing_degrees(a: LatLng, b: LatLng) -> f64 {
    Haversine.bearing(to_point(a), to_point(b)).rem_euclid(360.0)
}

/// Encode a coordinate sequence as a Google polyline at 1e-5 precision.
pub fn encode_polyline(points: &[LatLng]) -> Result<String, WalkError> {
    let coords = points.iter().map(|p| Coord { x: p.lng, y: p.lat });
    polyline::encode_coordinates(coords, POLYLINE_PRECISION)
        .map_err(|e| WalkError::Validation(format!("polyline encode failed: {e}")))
}

/// Decode a Google polyline back into coordinates.
pub fn decode_polyline(encoded: &str) -> Result<Vec<LatLng>, WalkError> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| WalkError::Validation(format!("polyline decode failed: {e}")))?;
    Ok(line.0.into_iter().map(|c| LatLng::new(c.y, c.x)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn haversine_matches_known_city_pair() {
        // Mexico City Zocalo to Angel de la Independencia, roughly 4.2 km.
        let zocalo = LatLng::new(19.4326, -99.1332);
        let angel = LatLng::new(19.4270, -99.1677);
        let km = haversine_km(zocalo, angel);
        assert!((3.5..5.0).contains(&km), "got {km} km");
    }

    #[test]
    fn haversine_is_zero_for_same_point() {
        let p = LatLng::new(19.4326, -99.1332);
        assert!(haversine_meters(p, p).abs() < 1e-9);
    }

    #[test]
    fn destination_and_bearing_are_consistent() {
        let origin = LatLng::new(19.4326, -99.1332);
        for bearing in [0.0, 30.0, 90.0, 185.0, 270.0, 330.0] {
            let dest = destination_from_bearing(origin, 1.5, bearing);
            let observed = bearing_degrees(origin, dest);
            let diff = (observed - bearing).abs();
            let diff = diff.min(360.0 - diff);
            assert!(diff < 0.5, "bearing {bearing} came back as {observed}");

            let km = haversine_km(origin, dest);
            assert!((km - 1.5).abs() < 0.01, "distance came back as {km} km");
        }
    }

    #[test]
    fn bearing_is_normalized() {
        let a = LatLng::new(10.0, 10.0);
        let b = LatLng::new(9.0, 9.0); // south-west, raw bearing negative
        let deg = bearing_degrees(a, b);
        assert!((0.0..360.0).contains(&deg), "got {deg}");
        assert!(deg > 180.0);
    }

    #[test]
    fn polyline_round_trips_losslessly() {
        let points = vec![
            LatLng::new(19.4326, -99.1332),
            LatLng::new(19.43571, -99.13004),
            LatLng::new(19.44102, -99.12475),
            LatLng::new(-33.86882, 151.20929),
        ];
        let encoded = encode_polyline(&points).unwrap();
        let decoded = decode_polyline(&encoded).unwrap();
        assert_eq!(decoded.len(), points.len());
        for (orig, got) in points.iter().zip(decoded.iter()) {
            assert!((orig.lat - got.lat).abs() < 1e-5);
            assert!((orig.lng - got.lng).abs() < 1e-5);
        }
    }

    #[test]
    fn polyline_decode_of_empty_string_is_empty() {
        assert!(decode_polyline("").unwrap().is_empty());
    }
}
