pub use super::media_files::Entity as MediaFiles;
pub use super::user_fcm_tokens::Entity as UserFcmTokens;
pub use super::walk_payment_methods::Entity as WalkPaymentMethods;
pub use super::walk_pets::Entity as WalkPets;
pub use super::walk_track_points::Entity as WalkTrackPoints;
pub use super::walk_track_summaries::Entity as WalkTrackSummaries;
pub use super::walk_tracking_meta::Entity as WalkTrackingMeta;
pub use super::walker_profiles::Entity as WalkerProfiles;
pub use super::walks::Entity as Walks;
