use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "walk_status")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalkStatus {
    #[sea_orm(string_value = "PENDING")]
    Pending,
    #[sea_orm(string_value = "ACCEPTED")]
    Accepted,
    #[sea_orm(string_value = "STARTED")]
    Started,
    #[sea_orm(string_value = "WALKER_FINISHED")]
    WalkerFinished,
    #[sea_orm(string_value = "REVIEW_PENDING")]
    ReviewPending,
    #[sea_orm(string_value = "COMPLETED")]
    Completed,
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
    #[sea_orm(string_value = "INACTIVE")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "walk_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalkType {
    #[sea_orm(string_value = "A_TO_B")]
    AToB,
    #[sea_orm(string_value = "TIME")]
    Time,
    #[sea_orm(string_value = "DISTANCE")]
    Distance,
    #[sea_orm(string_value = "PREDEFINED")]
    Predefined,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "walk_source")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalkSource {
    #[sea_orm(string_value = "CUSTOM")]
    Custom,
    #[sea_orm(string_value = "PREDEFINED")]
    Predefined,
}

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "media_file_type")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaFileType {
    #[sea_orm(string_value = "WALK_START_PHOTO")]
    WalkStartPhoto,
    #[sea_orm(string_value = "WALK_END_PHOTO")]
    WalkEndPhoto,
}
