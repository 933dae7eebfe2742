//! The public contract for route calculation: request in, ranked route
//! quotes out. Two implementations share it — a deterministic offline
//! generator and the live directions-backed engine — selected by
//! configuration when the services are wired together.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};

use crate::directions::GoogleMapsClient;
use crate::error::WalkError;
use crate::offline_routes::OfflineRouteProvider;
use crate::route_search::{DirectionsRouteProvider, RouteSearchConfig};
use crate::types::{RouteQuote, RouteRequest};

#[async_trait]
pub trait RouteProvider: Send + Sync {
    /// Calculate up to a handful of ranked route alternatives for the
    /// request. Implementations must validate before touching the network
    /// and must return `NoRouteFound` rather than an empty list.
    async fn calculate_routes(&self, request: &RouteRequest) -> Result<Vec<RouteQuote>, WalkError>;
}

/// Pick the provider at composition time: the live engine when an API key is
/// configured, the offline generator otherwise (and as fallback when the
/// HTTP client cannot be built).
pub fn select_route_provider(
    google_api_key: Option<String>,
    backend_timeout: Duration,
) -> Arc<dyn RouteProvider> {
    match google_api_key {
        Some(key) if !key.is_empty() => match GoogleMapsClient::new(key, backend_timeout) {
            Ok(client) => {
                info!("route provider: live directions backend");
                Arc::new(DirectionsRouteProvider::new(
                    Arc::new(client),
                    RouteSearchConfig::default(),
                ))
            }
            Err(e) => {
                warn!("failed to build maps client, falling back to offline routes: {e}");
                Arc::new(OfflineRouteProvider::default())
            }
        },
        _ => {
            info!("route provider: offline generator");
            Arc::new(OfflineRouteProvider::default())
        }
    }
}
