use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "walk_tracking_meta")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub walk_id: Uuid,
    pub client_id: Uuid,
    pub walker_id: Option<Uuid>,
    #[sea_orm(column_type = "Text")]
    pub route_polyline: String,
    pub deviation_threshold_meters: i32,
    pub evaluation_interval_seconds: i32,
    pub active: bool,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
