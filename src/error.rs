use thiserror::Error;

/// Error type shared by the route engine and the walk lifecycle.
///
/// Per-candidate backend failures are absorbed inside the route search and
/// never surface through this type; everything here is a whole-request
/// outcome the caller has to handle.
#[derive(Debug, Error)]
pub enum WalkError {
    /// Malformed or missing request fields. Raised before any external call.
    #[error("{0}")]
    Validation(String),

    /// The search exhausted every candidate without a usable result.
    #[error("no route could be calculated for the request")]
    NoRouteFound,

    /// The directions or places backend failed at the transport level.
    #[error("maps backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A conditional status update affected zero rows: the walk changed
    /// state underneath us or another walker won the race.
    #[error("{0}")]
    StateConflict(String),

    /// Reported position outside the geofence tolerance.
    #[error("position is {distance_meters:.0}m from the anchor, outside the {radius_meters:.0}m tolerance")]
    GeofenceViolation {
        distance_meters: f64,
        radius_meters: f64,
    },

    /// Walk, walker profile or related record does not exist for the caller.
    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}
