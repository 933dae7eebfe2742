//! Raw location-point ingestion and track summarization.
//!
//! Points arrive unordered and append-only; summarization reads a capped,
//! time-ordered recent window and folds it into a distance/duration summary
//! row. Summaries are append-only too: each run inserts a new row and
//! readers take the latest.

use chrono::Utc;
use log::debug;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::WalkStatus;
use crate::entity::{walk_track_points, walk_track_summaries, walk_tracking_meta, walks};
use crate::error::WalkError;
use crate::geo_math;
use crate::types::{ActingUser, LatLng, TrackPointRequest, TrackSummary, WalkDetail};

/// How many of the most recent points feed a summary.
const RECENT_POINTS_LIMIT: u64 = 500;

/// Realtime deviation alerting parameters written into the tracking
/// metadata when a walk starts.
const DEVIATION_THRESHOLD_METERS: i32 = 120;
const EVALUATION_INTERVAL_SECONDS: i32 = 15;

/// A point sample reduced to what summarization needs.
#[derive(Debug, Clone, Copy)]
pub struct PointSample {
    pub lat: f64,
    pub lng: f64,
    pub timestamp_millis: Option<i64>,
}

/// Result of folding a point stream, before it is persisted.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummarizedTrack {
    pub total_distance_meters: Option<i32>,
    pub total_duration_seconds: Option<i32>,
    pub start: Option<LatLng>,
    pub end: Option<LatLng>,
}

/// Fold a point stream into a summary. Points are ordered by timestamp with
/// missing timestamps last; fewer than two points yields null distance and
/// duration but preserves whatever endpoints exist. Never fails.
pub fn summarize_points(mut samples: Vec<PointSample>) -> SummarizedTrack {
    samples.sort_by_key(|s| s.timestamp_millis.unwrap_or(i64::MAX));

    let start = samples.first().map(|s| LatLng::new(s.lat, s.lng));
    let end = samples.last().map(|s| LatLng::new(s.lat, s.lng));

    if samples.len() < 2 {
        return SummarizedTrack {
            total_distance_meters: None,
            total_duration_seconds: None,
            start,
            end,
        };
    }

    let mut total_meters = 0.0;
    for pair in samples.windows(2) {
        total_meters += geo_math::haversine_meters(
            LatLng::new(pair[0].lat, pair[0].lng),
            LatLng::new(pair[1].lat, pair[1].lng),
        );
    }

    let first_ts = samples.first().and_then(|s| s.timestamp_millis);
    let last_ts = samples.last().and_then(|s| s.timestamp_millis);
    let total_duration_seconds = match (first_ts, last_ts) {
        (Some(first), Some(last)) if last >= first => Some(((last - first) / 1000) as i32),
        _ => None,
    };

    SummarizedTrack {
        total_distance_meters: Some(total_meters as i32),
        total_duration_seconds,
        start,
        end,
    }
}

pub struct TrackingService {
    db: DatabaseConnection,
}

impl TrackingService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Append a device position report. Only the accepted walker of a
    /// STARTED walk may publish.
    pub async fn save_point(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
        request: TrackPointRequest,
    ) -> Result<(), WalkError> {
        if !acting.is_walker {
            return Err(WalkError::Validation(
                "only walkers can publish tracking points".into(),
            ));
        }
        let walk = walks::Entity::find_by_id(walk_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found".into()))?;
        if walk.walker_id != Some(acting.id) {
            return Err(WalkError::NotFound("walk not found for this walker".into()));
        }
        if walk.status != WalkStatus::Started {
            return Err(WalkError::StateConflict(
                "tracking points are only accepted while a walk is STARTED".into(),
            ));
        }

        let point = walk_track_points::Model {
            id: Uuid::new_v4(),
            walk_id,
            lat: request.lat,
            lng: request.lng,
            timestamp_millis: request.timestamp_millis,
            accuracy_meters: request.accuracy_meters,
            speed_mps: request.speed_mps,
            battery_level: request.battery_level,
            is_manual: request.is_manual,
            created_at: Utc::now().fixed_offset(),
        };
        walk_track_points::Entity::insert(point.into_active_model())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Latest stored summary for a walk, visible to its client, its walker
    /// and admins.
    pub async fn latest_summary(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
    ) -> Result<Option<TrackSummary>, WalkError> {
        let walk = walks::Entity::find_by_id(walk_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found".into()))?;
        let related =
            walk.client_id == acting.id || walk.walker_id == Some(acting.id) || acting.is_admin;
        if !related {
            return Err(WalkError::NotFound("walk not found".into()));
        }

        let row = walk_track_summaries::Entity::find()
            .filter(walk_track_summaries::Column::WalkId.eq(walk_id))
            .order_by_desc(walk_track_summaries::Column::CreatedAt)
            .limit(1)
            .one(&self.db)
            .await?;
        Ok(row.map(|m| summary_from_model(&m)))
    }

    /// Fold the recent point window into a new summary row.
    pub async fn summarize_and_store(&self, walk_id: Uuid) -> Result<TrackSummary, WalkError> {
        let rows = walk_track_points::Entity::find()
            .filter(walk_track_points::Column::WalkId.eq(walk_id))
            .order_by_desc(walk_track_points::Column::TimestampMillis)
            .limit(RECENT_POINTS_LIMIT)
            .all(&self.db)
            .await?;

        let samples: Vec<PointSample> = rows
            .iter()
            .map(|r| PointSample {
                lat: r.lat,
                lng: r.lng,
                timestamp_millis: r.timestamp_millis,
            })
            .collect();
        let summarized = summarize_points(samples);
        debug!(
            "summarized walk {walk_id}: {} points, {:?} m",
            rows.len(),
            summarized.total_distance_meters
        );

        let model = walk_track_summaries::Model {
            id: Uuid::new_v4(),
            walk_id,
            total_distance_meters: summarized.total_distance_meters,
            total_duration_seconds: summarized.total_duration_seconds,
            start_lat: summarized.start.map(|p| p.lat),
            start_lng: summarized.start.map(|p| p.lng),
            end_lat: summarized.end.map(|p| p.lat),
            end_lng: summarized.end.map(|p| p.lng),
            created_at: Utc::now().fixed_offset(),
        };
        walk_track_summaries::Entity::insert(model.clone().into_active_model())
            .exec_without_returning(&self.db)
            .await?;
        Ok(summary_from_model(&model))
    }

    /// Write the realtime tracking metadata for a freshly started walk.
    pub async fn init_realtime(&self, walk: &WalkDetail) -> Result<(), WalkError> {
        let route_polyline = walk.selected_route_polyline.clone().ok_or_else(|| {
            WalkError::Validation(
                "walk has no selected route polyline; realtime tracking needs one".into(),
            )
        })?;

        let meta = walk_tracking_meta::ActiveModel {
            walk_id: Set(walk.id),
            client_id: Set(walk.client_id),
            walker_id: Set(walk.walker_id),
            route_polyline: Set(route_polyline),
            deviation_threshold_meters: Set(DEVIATION_THRESHOLD_METERS),
            evaluation_interval_seconds: Set(EVALUATION_INTERVAL_SECONDS),
            active: Set(true),
            updated_at: Set(Utc::now().fixed_offset()),
        };
        walk_tracking_meta::Entity::insert(meta)
            .on_conflict(
                OnConflict::column(walk_tracking_meta::Column::WalkId)
                    .update_columns([
                        walk_tracking_meta::Column::WalkerId,
                        walk_tracking_meta::Column::RoutePolyline,
                        walk_tracking_meta::Column::Active,
                        walk_tracking_meta::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }

    /// Deactivate realtime tracking for a walk.
    pub async fn stop_realtime(&self, walk_id: Uuid) -> Result<(), WalkError> {
        walk_tracking_meta::Entity::update_many()
            .set(walk_tracking_meta::ActiveModel {
                active: Set(false),
                updated_at: Set(Utc::now().fixed_offset()),
                ..Default::default()
            })
            .filter(walk_tracking_meta::Column::WalkId.eq(walk_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }
}

fn summary_from_model(model: &walk_track_summaries::Model) -> TrackSummary {
    TrackSummary {
        walk_id: model.walk_id,
        total_distance_meters: model.total_distance_meters,
        total_duration_seconds: model.total_duration_seconds,
        start: match (model.start_lat, model.start_lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        },
        end: match (model.end_lat, model.end_lng) {
            (Some(lat), Some(lng)) => Some(LatLng::new(lat, lng)),
            _ => None,
        },
        created_at: model.created_at,
    }
}
