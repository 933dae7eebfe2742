//! Walk creation, matching and client/walker queries.
//!
//! The walk row is the only shared mutable state in the system. Every
//! transition here is a single conditional update keyed on the expected
//! current status (plus a null walker for acceptance); zero affected rows
//! means the caller lost a race and gets a `StateConflict`, never a crash.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use log::info;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder,
};
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::{WalkSource, WalkStatus, WalkType};
use crate::entity::{walk_payment_methods, walk_pets, walker_profiles, walks};
use crate::error::WalkError;
use crate::geo_math;
use crate::notifications::{NotificationService, notify_client};
use crate::route_provider::RouteProvider;
use crate::types::{
    ActingUser, CreateWalkRequest, LatLng, RouteQuote, RouteRequest, WalkDetail, WalkSummary,
    WalkerZone,
};

const BASE_FARE_MXN: f64 = 25.0;
const PER_KM_MXN: f64 = 12.0;
const QUOTE_PREMIUM: f64 = 1.5;
const CURRENCY: &str = "MXN";

pub struct WalkService {
    db: DatabaseConnection,
    route_provider: Arc<dyn RouteProvider>,
    notifications: Arc<NotificationService>,
}

impl WalkService {
    pub fn new(
        db: DatabaseConnection,
        route_provider: Arc<dyn RouteProvider>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            route_provider,
            notifications,
        }
    }

    /// Calculate priced route alternatives for a client request.
    pub async fn calculate_routes(
        &self,
        request: &RouteRequest,
    ) -> Result<Vec<RouteQuote>, WalkError> {
        request.validate()?;
        let routes = self.route_provider.calculate_routes(request).await?;
        Ok(routes
            .into_iter()
            .map(|r| {
                let price_amount = round2(price_for_distance_km(r.distance_km) * QUOTE_PREMIUM);
                RouteQuote {
                    price_amount,
                    price_currency: CURRENCY.to_string(),
                    ..r
                }
            })
            .collect())
    }

    /// Create a walk from a previously calculated route. Pets and payment
    /// methods are fixed here and never mutated afterwards.
    pub async fn create_walk(
        &self,
        acting: &ActingUser,
        request: CreateWalkRequest,
    ) -> Result<WalkDetail, WalkError> {
        if !acting.is_client {
            return Err(WalkError::Validation("only clients can create walks".into()));
        }
        validate_create_request(&request)?;

        let pet_ids = dedupe_ids(&request.pet_ids);
        let payment_method_ids = dedupe_ids(&request.payment_method_ids);

        let estimated_distance_meters = request.estimated_distance_meters.unwrap_or(0);
        let price_amount = price_for_distance_km(f64::from(estimated_distance_meters) / 1000.0);

        let now = Utc::now().fixed_offset();
        let walk_id = Uuid::new_v4();
        let source = if request.predefined_route_id.is_some() {
            WalkSource::Predefined
        } else {
            WalkSource::Custom
        };

        let model = walks::Model {
            id: walk_id,
            client_id: acting.id,
            walker_id: None,
            predefined_route_id: request.predefined_route_id,
            r#type: request.walk_type.clone(),
            source,
            status: WalkStatus::Pending,
            origin_lat: request.origin.map(|p| p.lat),
            origin_lng: request.origin.map(|p| p.lng),
            destination_lat: request.destination.map(|p| p.lat),
            destination_lng: request.destination.map(|p| p.lng),
            pickup_lat: request.pickup.map(|p| p.lat),
            pickup_lng: request.pickup.map(|p| p.lng),
            dropoff_lat: request.dropoff.map(|p| p.lat),
            dropoff_lng: request.dropoff.map(|p| p.lng),
            selected_route_polyline: Some(request.selected_route_polyline.clone()),
            estimated_distance_meters: request.estimated_distance_meters,
            estimated_duration_seconds: request.estimated_duration_seconds,
            requested_start_time: request.requested_start_time,
            actual_start_time: None,
            actual_end_time: None,
            price_amount,
            price_currency: CURRENCY.to_string(),
            agreed_payment_method_id: None,
            created_at: now,
            updated_at: now,
        };

        walks::Entity::insert(model.clone().into_active_model())
            .exec_without_returning(&self.db)
            .await?;

        let pet_rows: Vec<walk_pets::ActiveModel> = pet_ids
            .iter()
            .map(|&pet_id| {
                walk_pets::Model {
                    id: Uuid::new_v4(),
                    walk_id,
                    pet_id,
                }
                .into_active_model()
            })
            .collect();
        walk_pets::Entity::insert_many(pet_rows)
            .exec_without_returning(&self.db)
            .await?;

        let payment_rows: Vec<walk_payment_methods::ActiveModel> = payment_method_ids
            .iter()
            .map(|&payment_method_id| {
                walk_payment_methods::Model {
                    id: Uuid::new_v4(),
                    walk_id,
                    payment_method_id,
                }
                .into_active_model()
            })
            .collect();
        walk_payment_methods::Entity::insert_many(payment_rows)
            .exec_without_returning(&self.db)
            .await?;

        info!("created walk {walk_id} for client {}", acting.id);
        Ok(detail_from_parts(model, pet_ids, payment_method_ids))
    }

    /// Pending walks belonging to the acting client.
    pub async fn pending_walks_for_client(
        &self,
        acting: &ActingUser,
    ) -> Result<Vec<WalkSummary>, WalkError> {
        let rows = walks::Entity::find()
            .filter(walks::Column::ClientId.eq(acting.id))
            .filter(walks::Column::Status.eq(WalkStatus::Pending))
            .order_by_asc(walks::Column::RequestedStartTime)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(summary_from_model).collect())
    }

    /// Full detail of one of the acting client's walks.
    pub async fn walk_detail_for_client(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
    ) -> Result<WalkDetail, WalkError> {
        let walk = walks::Entity::find()
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::ClientId.eq(acting.id))
            .one(&self.db)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found".into()))?;
        let (pet_ids, payment_method_ids) = load_associations(&self.db, walk_id).await?;
        Ok(detail_from_parts(walk, pet_ids, payment_method_ids))
    }

    /// Cancel one of the acting client's walks. Legal only from PENDING,
    /// enforced by the conditional update itself.
    pub async fn cancel_pending_walk(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
    ) -> Result<WalkDetail, WalkError> {
        if !acting.is_client {
            return Err(WalkError::Validation("only clients can cancel walks".into()));
        }
        let now = Utc::now().fixed_offset();
        let result = walks::Entity::update_many()
            .set(walks::ActiveModel {
                status: Set(WalkStatus::Cancelled),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::ClientId.eq(acting.id))
            .filter(walks::Column::Status.eq(WalkStatus::Pending))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(WalkError::StateConflict(
                "only pending walks can be cancelled".into(),
            ));
        }
        load_detail(&self.db, walk_id)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found".into()))
    }

    /// Pending, walker-less walks the acting walker could take: capacity and
    /// zone checked against a fresh profile snapshot.
    pub async fn available_walks_for_walker(
        &self,
        acting: &ActingUser,
    ) -> Result<Vec<WalkSummary>, WalkError> {
        let Some(zone) = load_walker_zone(&self.db, acting.id).await? else {
            return Ok(Vec::new());
        };

        let rows = walks::Entity::find()
            .filter(walks::Column::Status.eq(WalkStatus::Pending))
            .filter(walks::Column::WalkerId.is_null())
            .order_by_asc(walks::Column::RequestedStartTime)
            .all(&self.db)
            .await?;

        let mut out = Vec::new();
        for walk in rows {
            let Some(start) = walk_start_anchor(&walk) else {
                continue;
            };
            let pets = walk_pets::Entity::find()
                .filter(walk_pets::Column::WalkId.eq(walk.id))
                .all(&self.db)
                .await?;
            if zone_accepts(&zone, start, pets.len()) {
                out.push(summary_from_model(&walk));
            }
        }
        Ok(out)
    }

    /// Accept a pending walk. The guards (capacity, zone, payment method)
    /// run on read snapshots; the race itself is decided by the conditional
    /// update keyed on `(id, status = PENDING, walker_id IS NULL)`.
    pub async fn accept_walk(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
        agreed_payment_method_id: Uuid,
    ) -> Result<WalkDetail, WalkError> {
        if !acting.is_walker {
            return Err(WalkError::Validation("only walkers can accept walks".into()));
        }
        let zone = load_walker_zone(&self.db, acting.id)
            .await?
            .ok_or_else(|| WalkError::NotFound("walker profile not found".into()))?;

        let walk = walks::Entity::find_by_id(walk_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found".into()))?;
        if walk.status != WalkStatus::Pending || walk.walker_id.is_some() {
            return Err(WalkError::StateConflict("walk is no longer available".into()));
        }
        let start = walk_start_anchor(&walk).ok_or_else(|| {
            WalkError::Validation("walk has no start anchor (pickup or origin)".into())
        })?;

        let pets = walk_pets::Entity::find()
            .filter(walk_pets::Column::WalkId.eq(walk_id))
            .all(&self.db)
            .await?;
        if !zone_accepts(&zone, start, pets.len()) {
            return Err(WalkError::StateConflict(
                "walk is outside the walker's zone or over capacity".into(),
            ));
        }

        let allowed = walk_payment_methods::Entity::find()
            .filter(walk_payment_methods::Column::WalkId.eq(walk_id))
            .all(&self.db)
            .await?;
        if !allowed
            .iter()
            .any(|m| m.payment_method_id == agreed_payment_method_id)
        {
            return Err(WalkError::StateConflict(
                "payment method is not offered on this walk".into(),
            ));
        }

        let now = Utc::now().fixed_offset();
        let result = walks::Entity::update_many()
            .set(walks::ActiveModel {
                walker_id: Set(Some(acting.id)),
                status: Set(WalkStatus::Accepted),
                agreed_payment_method_id: Set(Some(agreed_payment_method_id)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::Status.eq(WalkStatus::Pending))
            .filter(walks::Column::WalkerId.is_null())
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(WalkError::StateConflict(
                "another walker accepted this walk first".into(),
            ));
        }

        let detail = load_detail(&self.db, walk_id)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found after acceptance".into()))?;

        info!("walker {} accepted walk {walk_id}", acting.id);
        notify_client(
            &self.db,
            &self.notifications,
            detail.client_id,
            walk_id,
            "Walk accepted",
            "A walker accepted your walk.",
            "WALK_ACCEPTED",
        )
        .await;

        Ok(detail)
    }

    /// Walks currently in flight for the acting client.
    pub async fn active_walks_for_client(
        &self,
        acting: &ActingUser,
    ) -> Result<Vec<WalkSummary>, WalkError> {
        let rows = walks::Entity::find()
            .filter(walks::Column::ClientId.eq(acting.id))
            .filter(walks::Column::Status.is_in(active_statuses()))
            .order_by_asc(walks::Column::RequestedStartTime)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(summary_from_model).collect())
    }

    /// Walks currently in flight for the acting walker.
    pub async fn active_walks_for_walker(
        &self,
        acting: &ActingUser,
    ) -> Result<Vec<WalkSummary>, WalkError> {
        let rows = walks::Entity::find()
            .filter(walks::Column::WalkerId.eq(acting.id))
            .filter(walks::Column::Status.is_in(active_statuses()))
            .order_by_asc(walks::Column::RequestedStartTime)
            .all(&self.db)
            .await?;
        Ok(rows.iter().map(summary_from_model).collect())
    }
}

fn active_statuses() -> [WalkStatus; 3] {
    [
        WalkStatus::Accepted,
        WalkStatus::Started,
        WalkStatus::WalkerFinished,
    ]
}

fn validate_create_request(request: &CreateWalkRequest) -> Result<(), WalkError> {
    if request.pet_ids.is_empty() {
        return Err(WalkError::Validation("at least one pet is required".into()));
    }
    if request.payment_method_ids.is_empty() {
        return Err(WalkError::Validation(
            "at least one payment method is required".into(),
        ));
    }
    if request.selected_route_polyline.trim().is_empty() {
        return Err(WalkError::Validation(
            "a selected route polyline is required".into(),
        ));
    }
    match request.estimated_distance_meters {
        Some(d) if d > 0 => {}
        _ => {
            return Err(WalkError::Validation(
                "a positive estimated distance is required".into(),
            ));
        }
    }
    match request.estimated_duration_seconds {
        Some(d) if d > 0 => {}
        _ => {
            return Err(WalkError::Validation(
                "a positive estimated duration is required".into(),
            ));
        }
    }

    for point in [
        request.origin,
        request.destination,
        request.pickup,
        request.dropoff,
    ]
    .into_iter()
    .flatten()
    {
        if !point.is_valid() {
            return Err(WalkError::Validation("coordinates are out of range".into()));
        }
    }

    match request.walk_type {
        WalkType::AToB => {
            if request.origin.is_none() || request.destination.is_none() {
                return Err(WalkError::Validation(
                    "A_TO_B walks require an origin and a destination".into(),
                ));
            }
        }
        WalkType::Time | WalkType::Distance => {
            if request.origin.is_none() {
                return Err(WalkError::Validation(
                    "TIME and DISTANCE walks require an origin".into(),
                ));
            }
        }
        WalkType::Predefined => {
            if request.predefined_route_id.is_none() {
                return Err(WalkError::Validation(
                    "PREDEFINED walks require a predefined route id".into(),
                ));
            }
        }
    }
    Ok(())
}

/// Capacity and zone check against a walker's profile snapshot.
pub(crate) fn zone_accepts(zone: &WalkerZone, start: LatLng, pet_count: usize) -> bool {
    if pet_count > zone.max_dogs.max(0) as usize {
        return false;
    }
    geo_math::haversine_km(zone.center, start) <= zone.radius_km
}

pub(crate) fn price_for_distance_km(distance_km: f64) -> f64 {
    round2(BASE_FARE_MXN + distance_km * PER_KM_MXN)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

fn dedupe_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub(crate) fn latlng_pair(lat: Option<f64>, lng: Option<f64>) -> Option<LatLng> {
    match (lat, lng) {
        (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
        _ => None,
    }
}

/// Start anchor of a stored walk: pickup, else origin.
pub(crate) fn walk_start_anchor(walk: &walks::Model) -> Option<LatLng> {
    latlng_pair(walk.pickup_lat, walk.pickup_lng).or(latlng_pair(walk.origin_lat, walk.origin_lng))
}

/// End anchor of a stored walk: dropoff, else destination, else origin.
pub(crate) fn walk_end_anchor(walk: &walks::Model) -> Option<LatLng> {
    latlng_pair(walk.dropoff_lat, walk.dropoff_lng)
        .or(latlng_pair(walk.destination_lat, walk.destination_lng))
        .or(latlng_pair(walk.origin_lat, walk.origin_lng))
}

pub(crate) fn detail_from_parts(
    walk: walks::Model,
    pet_ids: Vec<Uuid>,
    payment_method_ids: Vec<Uuid>,
) -> WalkDetail {
    WalkDetail {
        id: walk.id,
        client_id: walk.client_id,
        walker_id: walk.walker_id,
        predefined_route_id: walk.predefined_route_id,
        walk_type: walk.r#type,
        source: walk.source,
        status: walk.status,
        origin: latlng_pair(walk.origin_lat, walk.origin_lng),
        destination: latlng_pair(walk.destination_lat, walk.destination_lng),
        pickup: latlng_pair(walk.pickup_lat, walk.pickup_lng),
        dropoff: latlng_pair(walk.dropoff_lat, walk.dropoff_lng),
        estimated_distance_meters: walk.estimated_distance_meters,
        estimated_duration_seconds: walk.estimated_duration_seconds,
        selected_route_polyline: walk.selected_route_polyline,
        requested_start_time: walk.requested_start_time,
        actual_start_time: walk.actual_start_time,
        actual_end_time: walk.actual_end_time,
        price_amount: walk.price_amount,
        price_currency: walk.price_currency,
        agreed_payment_method_id: walk.agreed_payment_method_id,
        pet_ids,
        payment_method_ids,
        created_at: walk.created_at,
        updated_at: walk.updated_at,
    }
}

pub(crate) fn summary_from_model(walk: &walks::Model) -> WalkSummary {
    WalkSummary {
        id: walk.id,
        walk_type: walk.r#type.clone(),
        status: walk.status.clone(),
        requested_start_time: walk.requested_start_time,
        estimated_distance_meters: walk.estimated_distance_meters,
        estimated_duration_seconds: walk.estimated_duration_seconds,
        price_amount: walk.price_amount,
        price_currency: walk.price_currency.clone(),
    }
}

async fn load_associations(
    db: &DatabaseConnection,
    walk_id: Uuid,
) -> Result<(Vec<Uuid>, Vec<Uuid>), WalkError> {
    let pets = walk_pets::Entity::find()
        .filter(walk_pets::Column::WalkId.eq(walk_id))
        .all(db)
        .await?;
    let payment_methods = walk_payment_methods::Entity::find()
        .filter(walk_payment_methods::Column::WalkId.eq(walk_id))
        .all(db)
        .await?;
    Ok((
        pets.into_iter().map(|p| p.pet_id).collect(),
        payment_methods
            .into_iter()
            .map(|p| p.payment_method_id)
            .collect(),
    ))
}

/// Fetch a walk plus its fixed associations as a detail view.
pub(crate) async fn load_detail(
    db: &DatabaseConnection,
    walk_id: Uuid,
) -> Result<Option<WalkDetail>, WalkError> {
    let Some(walk) = walks::Entity::find_by_id(walk_id).one(db).await? else {
        return Ok(None);
    };
    let (pet_ids, payment_method_ids) = load_associations(db, walk_id).await?;
    Ok(Some(detail_from_parts(walk, pet_ids, payment_method_ids)))
}

/// Read-only zone snapshot for a walker, taken once per operation.
pub(crate) async fn load_walker_zone(
    db: &DatabaseConnection,
    walker_user_id: Uuid,
) -> Result<Option<WalkerZone>, WalkError> {
    Ok(walker_profiles::Entity::find()
        .filter(walker_profiles::Column::UserId.eq(walker_user_id))
        .one(db)
        .await?
        .map(|profile| WalkerZone {
            center: LatLng::new(profile.service_center_lat, profile.service_center_lng),
            radius_km: profile.zone_radius_km,
            max_dogs: profile.max_dogs,
        }))
}
