use sea_orm::entity::prelude::*;

use super::sea_orm_active_enums::{WalkSource, WalkStatus, WalkType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "walks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub client_id: Uuid,
    pub walker_id: Option<Uuid>,
    pub predefined_route_id: Option<Uuid>,
    pub r#type: WalkType,
    pub source: WalkSource,
    pub status: WalkStatus,
    pub origin_lat: Option<f64>,
    pub origin_lng: Option<f64>,
    pub destination_lat: Option<f64>,
    pub destination_lng: Option<f64>,
    pub pickup_lat: Option<f64>,
    pub pickup_lng: Option<f64>,
    pub dropoff_lat: Option<f64>,
    pub dropoff_lng: Option<f64>,
    #[sea_orm(column_type = "Text", nullable)]
    pub selected_route_polyline: Option<String>,
    pub estimated_distance_meters: Option<i32>,
    pub estimated_duration_seconds: Option<i32>,
    pub requested_start_time: DateTimeWithTimeZone,
    pub actual_start_time: Option<DateTimeWithTimeZone>,
    pub actual_end_time: Option<DateTimeWithTimeZone>,
    pub price_amount: f64,
    pub price_currency: String,
    pub agreed_payment_method_id: Option<Uuid>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::walk_pets::Entity")]
    WalkPets,
    #[sea_orm(has_many = "super::walk_payment_methods::Entity")]
    WalkPaymentMethods,
    #[sea_orm(has_many = "super::walk_track_points::Entity")]
    WalkTrackPoints,
    #[sea_orm(has_many = "super::walk_track_summaries::Entity")]
    WalkTrackSummaries,
    #[sea_orm(has_many = "super::media_files::Entity")]
    MediaFiles,
}

impl Related<super::walk_pets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalkPets.def()
    }
}

impl Related<super::walk_payment_methods::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalkPaymentMethods.def()
    }
}

impl Related<super::walk_track_points::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalkTrackPoints.def()
    }
}

impl Related<super::walk_track_summaries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::WalkTrackSummaries.def()
    }
}

impl Related<super::media_files::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MediaFiles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
