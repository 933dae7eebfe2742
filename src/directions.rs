//! Client for the Google Directions and Places Nearby APIs.
//!
//! The backend sits behind the [`MapsBackend`] trait so the route search can
//! be exercised against scripted fakes. A non-"OK" status is always treated
//! as zero results, never as a different route; transport failures surface
//! as `BackendUnavailable` and are absorbed per-candidate by the caller.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::WalkError;
use crate::types::{LatLng, RouteQuote};

const DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";
const PLACES_NEARBY_URL: &str = "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

#[async_trait]
pub trait MapsBackend: Send + Sync {
    /// Walking directions from `origin` to `destination`, optionally routed
    /// through a single `waypoint` (the loop probe). Returns all alternatives
    /// the backend produced, unpriced.
    async fn directions(
        &self,
        origin: LatLng,
        destination: LatLng,
        waypoint: Option<LatLng>,
        alternatives: bool,
    ) -> Result<Vec<RouteQuote>, WalkError>;

    /// Points of interest near `center`, up to `limit` results.
    async fn nearby_places(
        &self,
        center: LatLng,
        radius_meters: u32,
        place_type: Option<&str>,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LatLng>, WalkError>;
}

pub struct GoogleMapsClient {
    client: reqwest::Client,
    api_key: String,
}

impl GoogleMapsClient {
    /// Build a client with a hard per-call timeout; no call through this
    /// backend may block past it.
    pub fn new(api_key: String, timeout: std::time::Duration) -> Result<Self, WalkError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalkError::BackendUnavailable(e.to_string()))?;
        Ok(Self { client, api_key })
    }
}

fn latlng_param(p: LatLng) -> String {
    format!("{},{}", p.lat, p.lng)
}

#[async_trait]
impl MapsBackend for GoogleMapsClient {
    async fn directions(
        &self,
        origin: LatLng,
        destination: LatLng,
        waypoint: Option<LatLng>,
        alternatives: bool,
    ) -> Result<Vec<RouteQuote>, WalkError> {
        let mut params = vec![
            ("origin".to_string(), latlng_param(origin)),
            ("destination".to_string(), latlng_param(destination)),
            ("mode".to_string(), "walking".to_string()),
            ("alternatives".to_string(), alternatives.to_string()),
        ];
        if let Some(w) = waypoint {
            params.push(("waypoints".to_string(), latlng_param(w)));
        }
        params.push(("key".to_string(), self.api_key.clone()));

        let response: DirectionsResponse = self
            .client
            .get(DIRECTIONS_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| WalkError::BackendUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalkError::BackendUnavailable(e.to_string()))?;

        if response.status != "OK" {
            return Ok(Vec::new());
        }

        Ok(response
            .routes
            .into_iter()
            .filter_map(route_to_quote)
            .collect())
    }

    async fn nearby_places(
        &self,
        center: LatLng,
        radius_meters: u32,
        place_type: Option<&str>,
        keyword: Option<&str>,
        limit: usize,
    ) -> Result<Vec<LatLng>, WalkError> {
        let mut params = vec![
            ("location".to_string(), latlng_param(center)),
            ("radius".to_string(), radius_meters.to_string()),
        ];
        if let Some(t) = place_type {
            params.push(("type".to_string(), t.to_string()));
        }
        if let Some(k) = keyword {
            params.push(("keyword".to_string(), k.to_string()));
        }
        params.push(("key".to_string(), self.api_key.clone()));

        let response: PlacesResponse = self
            .client
            .get(PLACES_NEARBY_URL)
            .query(&params)
            .send()
            .await
            .map_err(|e| WalkError::BackendUnavailable(e.to_string()))?
            .json()
            .await
            .map_err(|e| WalkError::BackendUnavailable(e.to_string()))?;

        if response.status != "OK" && response.status != "ZERO_RESULTS" {
            return Ok(Vec::new());
        }

        Ok(response
            .results
            .into_iter()
            .take(limit)
            .map(|r| LatLng::new(r.geometry.location.lat, r.geometry.location.lng))
            .collect())
    }
}

/// Sum the legs of a directions route into a single quote. Routes with no
/// legs are dropped.
fn route_to_quote(route: DirectionsRoute) -> Option<RouteQuote> {
    if route.legs.is_empty() {
        return None;
    }
    let distance_meters: i64 = route.legs.iter().map(|l| l.distance.value).sum();
    let duration_seconds: i64 = route.legs.iter().map(|l| l.duration.value).sum();

    let duration_min = ((duration_seconds as f64 / 60.0).round() as i32).max(1);

    Some(RouteQuote {
        polyline_encoded: route.overview_polyline.points,
        distance_km: distance_meters as f64 / 1000.0,
        duration_min,
        price_amount: 0.0,
        price_currency: "MXN".to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: OverviewPolyline,
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct OverviewPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    distance: LegValue,
    duration: LegValue,
}

#[derive(Debug, Deserialize)]
struct LegValue {
    value: i64,
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    status: String,
    #[serde(default)]
    results: Vec<PlaceResult>,
}

#[derive(Debug, Deserialize)]
struct PlaceResult {
    geometry: PlaceGeometry,
}

#[derive(Debug, Deserialize)]
struct PlaceGeometry {
    location: PlaceLocation,
}

#[derive(Debug, Deserialize)]
struct PlaceLocation {
    lat: f64,
    lng: f64,
}
