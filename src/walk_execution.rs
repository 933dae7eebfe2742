//! Geofenced start/end of a walk.
//!
//! Both actions are conditional on the walk's current status: the read
//! establishes the precondition and the geofence, the write is a single
//! compare-and-swap on `(id, walker_id, status)`. Ending a walk also folds
//! the track into a summary and flags outliers for review when the realized
//! duration exceeds twice the estimate.

use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
};
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::{MediaFileType, WalkStatus};
use crate::entity::{media_files, walks};
use crate::error::WalkError;
use crate::geofence;
use crate::notifications::{NotificationService, notify_client};
use crate::tracking::TrackingService;
use crate::types::{ActingUser, EndWalkRequest, LatLng, StartWalkRequest, WalkDetail};
use crate::walks::{load_detail, walk_end_anchor, walk_start_anchor};

/// Geofence radius for starting a walk, meters.
pub const START_RADIUS_METERS: f64 = 250.0;

/// Geofence radius for finishing a walk, meters.
pub const END_RADIUS_METERS: f64 = 300.0;

/// A walk whose realized duration exceeds the estimate by this factor goes
/// to manual review instead of straight through the finish flow.
const REVIEW_DURATION_FACTOR: i64 = 2;

pub struct WalkExecutionService {
    db: DatabaseConnection,
    tracking: Arc<TrackingService>,
    notifications: Arc<NotificationService>,
}

impl WalkExecutionService {
    pub fn new(
        db: DatabaseConnection,
        tracking: Arc<TrackingService>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            tracking,
            notifications,
        }
    }

    /// Start a walk. Legal only from ACCEPTED, with the walker reporting
    /// from inside the start geofence.
    pub async fn start_walk(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
        request: StartWalkRequest,
    ) -> Result<WalkDetail, WalkError> {
        if !acting.is_walker {
            return Err(WalkError::Validation("only walkers can start walks".into()));
        }
        let walk = self.find_walk_for_walker(acting.id, walk_id).await?;
        if walk.status != WalkStatus::Accepted {
            return Err(WalkError::StateConflict(
                "a walk can only be started from ACCEPTED".into(),
            ));
        }
        let anchor = walk_start_anchor(&walk).ok_or_else(|| {
            WalkError::Validation("walk has no start anchor (pickup or origin)".into())
        })?;
        geofence::ensure_within(
            LatLng::new(request.lat, request.lng),
            anchor,
            START_RADIUS_METERS,
        )?;

        self.store_photo(walk_id, MediaFileType::WalkStartPhoto, &request.start_photo_url)
            .await?;

        let now = Utc::now().fixed_offset();
        let result = walks::Entity::update_many()
            .set(walks::ActiveModel {
                status: Set(WalkStatus::Started),
                actual_start_time: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::WalkerId.eq(acting.id))
            .filter(walks::Column::Status.eq(WalkStatus::Accepted))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(WalkError::StateConflict(
                "walk changed state before it could be started".into(),
            ));
        }

        let detail = load_detail(&self.db, walk_id)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found after start".into()))?;

        self.tracking.init_realtime(&detail).await?;
        info!("walker {} started walk {walk_id}", acting.id);
        Ok(detail)
    }

    /// Finish a walk. Legal only from STARTED, with the walker reporting
    /// from inside the end geofence. Summarizes the track, flags outliers
    /// for review and always stops realtime tracking.
    pub async fn end_walk(
        &self,
        acting: &ActingUser,
        walk_id: Uuid,
        request: EndWalkRequest,
    ) -> Result<WalkDetail, WalkError> {
        if !acting.is_walker {
            return Err(WalkError::Validation("only walkers can finish walks".into()));
        }
        let walk = self.find_walk_for_walker(acting.id, walk_id).await?;
        if walk.status != WalkStatus::Started {
            return Err(WalkError::StateConflict(
                "a walk can only be finished from STARTED".into(),
            ));
        }
        let anchor = walk_end_anchor(&walk).ok_or_else(|| {
            WalkError::Validation("walk has no end anchor (dropoff, destination or origin)".into())
        })?;
        geofence::ensure_within(
            LatLng::new(request.lat, request.lng),
            anchor,
            END_RADIUS_METERS,
        )?;

        self.store_photo(walk_id, MediaFileType::WalkEndPhoto, &request.end_photo_url)
            .await?;

        let now = Utc::now().fixed_offset();
        let result = walks::Entity::update_many()
            .set(walks::ActiveModel {
                status: Set(WalkStatus::WalkerFinished),
                actual_end_time: Set(Some(now)),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::WalkerId.eq(acting.id))
            .filter(walks::Column::Status.eq(WalkStatus::Started))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(WalkError::StateConflict(
                "walk changed state before it could be finished".into(),
            ));
        }

        let summary = self.tracking.summarize_and_store(walk_id).await?;

        if needs_review(
            walk.estimated_duration_seconds,
            summary.total_duration_seconds,
        ) {
            let moved = walks::Entity::update_many()
                .set(walks::ActiveModel {
                    status: Set(WalkStatus::ReviewPending),
                    updated_at: Set(Utc::now().fixed_offset()),
                    ..Default::default()
                })
                .filter(walks::Column::Id.eq(walk_id))
                .filter(walks::Column::WalkerId.eq(acting.id))
                .filter(walks::Column::Status.eq(WalkStatus::WalkerFinished))
                .exec(&self.db)
                .await?;
            if moved.rows_affected == 0 {
                warn!("review transition skipped, walk {walk_id} changed state");
            } else {
                info!("walk {walk_id} flagged for review: realized duration outlier");
            }
        }

        // Tracking stops whether or not the review transition happened.
        if let Err(e) = self.tracking.stop_realtime(walk_id).await {
            warn!("failed to stop realtime tracking for walk {walk_id}: {e}");
        }

        let detail = load_detail(&self.db, walk_id)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found after finish".into()))?;

        info!("walker {} finished walk {walk_id}", acting.id);
        notify_client(
            &self.db,
            &self.notifications,
            detail.client_id,
            walk_id,
            "Walk finished",
            "Your walker marked the walk as finished.",
            "WALK_FINISHED",
        )
        .await;

        Ok(detail)
    }

    async fn find_walk_for_walker(
        &self,
        walker_id: Uuid,
        walk_id: Uuid,
    ) -> Result<walks::Model, WalkError> {
        walks::Entity::find()
            .filter(walks::Column::Id.eq(walk_id))
            .filter(walks::Column::WalkerId.eq(walker_id))
            .one(&self.db)
            .await?
            .ok_or_else(|| WalkError::NotFound("walk not found for this walker".into()))
    }

    async fn store_photo(
        &self,
        walk_id: Uuid,
        file_type: MediaFileType,
        storage_path: &str,
    ) -> Result<(), WalkError> {
        let row = media_files::Model {
            id: Uuid::new_v4(),
            walk_id,
            r#type: file_type,
            storage_path: storage_path.to_owned(),
            size_bytes: 0,
            mime_type: "image/jpeg".to_owned(),
            created_at: Utc::now().fixed_offset(),
        };
        media_files::Entity::insert(row.into_active_model())
            .exec_without_returning(&self.db)
            .await?;
        Ok(())
    }
}

/// Whether a finished walk's realized duration is an outlier worth manual
/// review.
pub(crate) fn needs_review(estimated_seconds: Option<i32>, realized_seconds: Option<i32>) -> bool {
    match (estimated_seconds, realized_seconds) {
        (Some(estimated), Some(realized)) if estimated > 0 => {
            i64::from(realized) > i64::from(estimated) * REVIEW_DURATION_FACTOR
        }
        _ => false,
    }
}
