//! Domain and wire-level types shared across the services.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::{WalkSource, WalkStatus, WalkType};
use crate::error::WalkError;

/// An immutable geographic position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Check that the coordinates are finite and within valid ranges.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Identity context of the caller, resolved from the session token before the
/// engine is invoked. Engine calls never read ambient authentication state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActingUser {
    pub id: Uuid,
    pub is_client: bool,
    pub is_walker: bool,
    pub is_admin: bool,
}

impl ActingUser {
    pub fn client(id: Uuid) -> Self {
        Self {
            id,
            is_client: true,
            is_walker: false,
            is_admin: false,
        }
    }

    pub fn walker(id: Uuid) -> Self {
        Self {
            id,
            is_client: false,
            is_walker: true,
            is_admin: false,
        }
    }
}

/// The shape of a route calculation request. Exactly one variant per request;
/// a missing field is a deserialization error, not a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE", rename_all_fields = "camelCase")]
pub enum RouteRequest {
    AToB {
        origin: LatLng,
        destination: LatLng,
    },
    Time {
        origin: LatLng,
        minutes: i32,
    },
    Distance {
        origin: LatLng,
        km: f64,
    },
    Predefined {
        origin: LatLng,
        destination: LatLng,
        route_id: Uuid,
    },
}

impl RouteRequest {
    pub fn origin(&self) -> LatLng {
        match self {
            Self::AToB { origin, .. }
            | Self::Time { origin, .. }
            | Self::Distance { origin, .. }
            | Self::Predefined { origin, .. } => *origin,
        }
    }

    pub fn destination(&self) -> Option<LatLng> {
        match self {
            Self::AToB { destination, .. } | Self::Predefined { destination, .. } => {
                Some(*destination)
            }
            _ => None,
        }
    }

    pub fn walk_type(&self) -> WalkType {
        match self {
            Self::AToB { .. } => WalkType::AToB,
            Self::Time { .. } => WalkType::Time,
            Self::Distance { .. } => WalkType::Distance,
            Self::Predefined { .. } => WalkType::Predefined,
        }
    }

    /// Field-level validation, run before any external call is made.
    pub fn validate(&self) -> Result<(), WalkError> {
        if !self.origin().is_valid() {
            return Err(WalkError::Validation(
                "origin coordinates are out of range".into(),
            ));
        }
        if let Some(dest) = self.destination() {
            if !dest.is_valid() {
                return Err(WalkError::Validation(
                    "destination coordinates are out of range".into(),
                ));
            }
        }
        match self {
            Self::Time { minutes, .. } if *minutes <= 0 => Err(WalkError::Validation(
                "a positive duration in minutes is required for TIME walks".into(),
            )),
            Self::Distance { km, .. } if *km <= 0.0 => Err(WalkError::Validation(
                "a positive distance in km is required for DISTANCE walks".into(),
            )),
            _ => Ok(()),
        }
    }
}

/// A priced, ranked route alternative returned to the client. Immutable and
/// owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteQuote {
    pub polyline_encoded: String,
    pub distance_km: f64,
    pub duration_min: i32,
    pub price_amount: f64,
    pub price_currency: String,
}

/// Read-only snapshot of a walker's service constraints, taken at match time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WalkerZone {
    pub center: LatLng,
    pub radius_km: f64,
    pub max_dogs: i32,
}

/// Request payload for creating a walk from a previously calculated route.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalkRequest {
    #[serde(rename = "type")]
    pub walk_type: WalkType,
    pub origin: Option<LatLng>,
    pub destination: Option<LatLng>,
    pub pickup: Option<LatLng>,
    pub dropoff: Option<LatLng>,
    pub estimated_distance_meters: Option<i32>,
    pub estimated_duration_seconds: Option<i32>,
    pub selected_route_polyline: String,
    pub requested_start_time: DateTime<FixedOffset>,
    pub predefined_route_id: Option<Uuid>,
    pub pet_ids: Vec<Uuid>,
    pub payment_method_ids: Vec<Uuid>,
}

/// Full view of a walk, including its pet and payment-method associations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkDetail {
    pub id: Uuid,
    pub client_id: Uuid,
    pub walker_id: Option<Uuid>,
    pub predefined_route_id: Option<Uuid>,
    #[serde(rename = "type")]
    pub walk_type: WalkType,
    pub source: WalkSource,
    pub status: WalkStatus,
    pub origin: Option<LatLng>,
    pub destination: Option<LatLng>,
    pub pickup: Option<LatLng>,
    pub dropoff: Option<LatLng>,
    pub estimated_distance_meters: Option<i32>,
    pub estimated_duration_seconds: Option<i32>,
    pub selected_route_polyline: Option<String>,
    pub requested_start_time: DateTime<FixedOffset>,
    pub actual_start_time: Option<DateTime<FixedOffset>>,
    pub actual_end_time: Option<DateTime<FixedOffset>>,
    pub price_amount: f64,
    pub price_currency: String,
    pub agreed_payment_method_id: Option<Uuid>,
    pub pet_ids: Vec<Uuid>,
    pub payment_method_ids: Vec<Uuid>,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl WalkDetail {
    /// Anchor the walker must be near to start: pickup, else origin.
    pub fn start_anchor(&self) -> Option<LatLng> {
        self.pickup.or(self.origin)
    }

    /// Anchor the walker must be near to finish: dropoff, else destination,
    /// else origin.
    pub fn end_anchor(&self) -> Option<LatLng> {
        self.dropoff.or(self.destination).or(self.origin)
    }
}

/// Compact listing view of a walk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WalkSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub walk_type: WalkType,
    pub status: WalkStatus,
    pub requested_start_time: DateTime<FixedOffset>,
    pub estimated_distance_meters: Option<i32>,
    pub estimated_duration_seconds: Option<i32>,
    pub price_amount: f64,
    pub price_currency: String,
}

/// A raw device position report for an in-progress walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackPointRequest {
    pub lat: f64,
    pub lng: f64,
    pub timestamp_millis: Option<i64>,
    pub accuracy_meters: Option<f64>,
    pub speed_mps: Option<f64>,
    pub battery_level: Option<i32>,
    #[serde(default)]
    pub is_manual: bool,
}

/// Derived distance/duration view of a walk's point stream. Append-only;
/// readers take the latest row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub walk_id: Uuid,
    pub total_distance_meters: Option<i32>,
    pub total_duration_seconds: Option<i32>,
    pub start: Option<LatLng>,
    pub end: Option<LatLng>,
    pub created_at: DateTime<FixedOffset>,
}

/// Geofenced action payload: the reporting position plus the photo the
/// walker took at the start of the walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartWalkRequest {
    pub start_photo_url: String,
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: Option<f64>,
}

/// Geofenced action payload for finishing a walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndWalkRequest {
    pub end_photo_url: String,
    pub lat: f64,
    pub lng: f64,
    pub accuracy_meters: Option<f64>,
}
