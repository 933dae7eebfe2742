//! Deterministic route generation with no network access.
//!
//! Default provider when no directions backend is configured, and the one
//! tests run against: distances come from the great-circle baseline (or the
//! requested target), durations from a fixed walking speed, and each request
//! yields three variants scaled by 0.9/1.0/1.1 with a synthetic three-point
//! polyline.

use async_trait::async_trait;

use crate::error::WalkError;
use crate::geo_math;
use crate::route_provider::RouteProvider;
use crate::types::{LatLng, RouteQuote, RouteRequest};

const VARIANT_FACTORS: [f64; 3] = [0.9, 1.0, 1.1];
const MIN_DISTANCE_KM: f64 = 0.1;
const MIN_DURATION_MIN: i32 = 5;

pub struct OfflineRouteProvider {
    pub walking_speed_kmh: f64,
}

impl Default for OfflineRouteProvider {
    fn default() -> Self {
        Self {
            walking_speed_kmh: 4.0,
        }
    }
}

#[async_trait]
impl RouteProvider for OfflineRouteProvider {
    async fn calculate_routes(&self, request: &RouteRequest) -> Result<Vec<RouteQuote>, WalkError> {
        request.validate()?;

        let origin = request.origin();
        let destination = request.destination();

        let base_distance_km = match request {
            RouteRequest::AToB { destination, .. }
            | RouteRequest::Predefined { destination, .. } => {
                geo_math::haversine_km(origin, *destination)
            }
            RouteRequest::Distance { km, .. } => *km,
            RouteRequest::Time { minutes, .. } => {
                self.walking_speed_kmh * (f64::from(*minutes) / 60.0)
            }
        }
        .max(MIN_DISTANCE_KM);

        let base_duration_min = match request {
            RouteRequest::Time { minutes, .. } => *minutes,
            _ => (((base_distance_km / self.walking_speed_kmh) * 60.0).round() as i32)
                .max(MIN_DURATION_MIN),
        };

        let mut routes = Vec::with_capacity(VARIANT_FACTORS.len());
        for factor in VARIANT_FACTORS {
            let waypoint = LatLng::new(origin.lat + 0.001 * factor, origin.lng + 0.001 * factor);
            let last = destination
                .unwrap_or_else(|| LatLng::new(origin.lat + 0.002 * factor, origin.lng + 0.002 * factor));
            let polyline = geo_math::encode_polyline(&[origin, waypoint, last])?;

            routes.push(RouteQuote {
                polyline_encoded: polyline,
                distance_km: base_distance_km * factor,
                duration_min: ((f64::from(base_duration_min) * factor).round() as i32)
                    .max(MIN_DURATION_MIN),
                price_amount: 0.0,
                price_currency: "MXN".to_string(),
            });
        }

        Ok(routes)
    }
}
