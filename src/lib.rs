//! # Walkbroker
//!
//! Core engine of a dog-walking marketplace backend. It brokers walks
//! between clients and walkers:
//!
//! - **Route search**: proposes a bounded, direction-diverse set of route
//!   candidates for point-to-point, target-duration or target-distance
//!   requests, under a hard budget of external directions/places calls.
//! - **Walk lifecycle**: drives a walk through
//!   `PENDING -> ACCEPTED -> STARTED -> WALKER_FINISHED` (with cancellation
//!   from `PENDING` and an automatic review flag for duration outliers),
//!   every transition a single conditional update on the walk row.
//! - **Tracking**: ingests raw device positions and folds them into
//!   monotonic distance/duration summaries.
//!
//! The HTTP surface, authentication and profile/pet/payment CRUD live
//! outside this crate; services here are plain async structs over a
//! [`sea_orm::DatabaseConnection`] plus an explicit [`types::ActingUser`]
//! identity context.

pub mod db;
pub mod directions;
pub mod entity;
pub mod error;
pub mod geo_math;
pub mod geofence;
pub mod notifications;
pub mod offline_routes;
pub mod route_provider;
pub mod route_search;
pub mod tracking;
pub mod types;
pub mod walk_execution;
pub mod walks;

pub use directions::{GoogleMapsClient, MapsBackend};
pub use error::WalkError;
pub use notifications::NotificationService;
pub use offline_routes::OfflineRouteProvider;
pub use route_provider::{RouteProvider, select_route_provider};
pub use route_search::{DirectionsRouteProvider, RouteSearchConfig};
pub use tracking::{PointSample, SummarizedTrack, TrackingService, summarize_points};
pub use types::{
    ActingUser, CreateWalkRequest, EndWalkRequest, LatLng, RouteQuote, RouteRequest,
    StartWalkRequest, TrackPointRequest, TrackSummary, WalkDetail, WalkSummary, WalkerZone,
};
pub use walk_execution::{END_RADIUS_METERS, START_RADIUS_METERS, WalkExecutionService};
pub use walks::WalkService;
