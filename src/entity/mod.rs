pub mod prelude;

pub mod media_files;
pub mod sea_orm_active_enums;
pub mod user_fcm_tokens;
pub mod walk_payment_methods;
pub mod walk_pets;
pub mod walk_track_points;
pub mod walk_track_summaries;
pub mod walk_tracking_meta;
pub mod walker_profiles;
pub mod walks;
