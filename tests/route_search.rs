//! Route search behaviour against a scripted directions backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use walkbroker::{
    DirectionsRouteProvider, LatLng, MapsBackend, RouteProvider, RouteQuote, RouteRequest,
    RouteSearchConfig, WalkError, geo_math,
};

const SPEED_KMH: f64 = 4.5;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Deterministic backend: quotes derive from great-circle distance at a
/// fixed walking speed, loops double the origin->waypoint leg. Optionally
/// fails every n-th call or every call.
struct FakeBackend {
    fail_every: Option<usize>,
    fail_all: bool,
    calls: AtomicUsize,
    alternatives_offered: usize,
}

impl FakeBackend {
    fn reliable() -> Self {
        Self {
            fail_every: None,
            fail_all: false,
            calls: AtomicUsize::new(0),
            alternatives_offered: 5,
        }
    }

    fn flaky(n: usize) -> Self {
        Self {
            fail_every: Some(n),
            ..Self::reliable()
        }
    }

    fn down() -> Self {
        Self {
            fail_all: true,
            ..Self::reliable()
        }
    }

    fn quote_for(&self, points: &[LatLng], km: f64) -> RouteQuote {
        RouteQuote {
            polyline_encoded: geo_math::encode_polyline(points).unwrap(),
            distance_km: km,
            duration_min: (((km / SPEED_KMH) * 60.0).round() as i32).max(1),
            price_amount: 0.0,
            price_currency: "MXN".to_string(),
        }
    }
}

#[async_trait]
impl MapsBackend for FakeBackend {
    async fn directions(
        &self,
        origin: LatLng,
        destination: LatLng,
        waypoint: Option<LatLng>,
        alternatives: bool,
    ) -> Result<Vec<RouteQuote>, WalkError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all {
            return Err(WalkError::BackendUnavailable("scripted outage".into()));
        }
        if let Some(n) = self.fail_every {
            if call % n == 0 {
                return Err(WalkError::BackendUnavailable("scripted hiccup".into()));
            }
        }

        if alternatives {
            let km = geo_math::haversine_km(origin, destination).max(0.1);
            return Ok((0..self.alternatives_offered)
                .map(|i| {
                    self.quote_for(&[origin, destination], km * (1.0 + 0.05 * i as f64))
                })
                .collect());
        }

        let quote = match waypoint {
            Some(w) => {
                let km = geo_math::haversine_km(origin, w) * 2.0;
                self.quote_for(&[origin, w, destination], km)
            }
            None => {
                let km = geo_math::haversine_km(origin, destination);
                self.quote_for(&[origin, destination], km)
            }
        };
        Ok(vec![quote])
    }

    async fn nearby_places(
        &self,
        center: LatLng,
        _radius_meters: u32,
        place_type: Option<&str>,
        _keyword: Option<&str>,
        _limit: usize,
    ) -> Result<Vec<LatLng>, WalkError> {
        if self.fail_all {
            return Err(WalkError::BackendUnavailable("scripted outage".into()));
        }
        // A handful of parks spread around the origin; the relaxed keyword
        // pass finds nothing.
        if place_type == Some("park") {
            return Ok([15.0, 75.0, 135.0, 195.0, 255.0, 315.0]
                .iter()
                .map(|&bearing| geo_math::destination_from_bearing(center, 1.125, bearing))
                .collect());
        }
        Ok(Vec::new())
    }
}

fn origin() -> LatLng {
    LatLng::new(19.4326, -99.1332)
}

fn provider(backend: FakeBackend) -> DirectionsRouteProvider {
    DirectionsRouteProvider::new(Arc::new(backend), RouteSearchConfig::default())
}

/// Bearing of the loop waypoint recovered from the returned polyline.
fn waypoint_bearing(quote: &RouteQuote) -> f64 {
    let points = geo_math::decode_polyline(&quote.polyline_encoded).unwrap();
    geo_math::bearing_degrees(origin(), points[1])
}

#[tokio::test]
async fn time_request_returns_diverse_routes_within_tolerance() {
    init_logging();
    let provider = provider(FakeBackend::reliable());
    let routes = provider
        .calculate_routes(&RouteRequest::Time {
            origin: origin(),
            minutes: 30,
        })
        .await
        .unwrap();

    assert!(!routes.is_empty());
    assert!(routes.len() <= 3);
    for route in &routes {
        assert!(
            (20..=40).contains(&route.duration_min),
            "duration {} outside the 30 +/- 10 window",
            route.duration_min
        );
    }

    // Alternatives must differ in direction, not just in length.
    let bearings: Vec<f64> = routes.iter().map(waypoint_bearing).collect();
    for i in 0..bearings.len() {
        for j in (i + 1)..bearings.len() {
            let diff = (bearings[i] - bearings[j]).abs();
            let diff = diff.min(360.0 - diff);
            assert!(
                diff >= 50.0,
                "routes {i} and {j} point the same way: {bearings:?}"
            );
        }
    }
}

#[tokio::test]
async fn distance_request_returns_routes_within_tolerance() {
    let provider = provider(FakeBackend::reliable());
    let routes = provider
        .calculate_routes(&RouteRequest::Distance {
            origin: origin(),
            km: 3.0,
        })
        .await
        .unwrap();

    assert!(!routes.is_empty());
    assert!(routes.len() <= 3);
    for route in &routes {
        assert!(
            (2.9..=3.1).contains(&route.distance_km),
            "distance {} outside the 3.0 +/- 0.1 window",
            route.distance_km
        );
    }
}

#[tokio::test]
async fn per_candidate_failures_shrink_the_pool_but_never_abort() {
    let provider = provider(FakeBackend::flaky(3));
    let routes = provider
        .calculate_routes(&RouteRequest::Time {
            origin: origin(),
            minutes: 30,
        })
        .await
        .unwrap();
    assert!(!routes.is_empty());
}

#[tokio::test]
async fn total_backend_outage_surfaces_as_no_route_found() {
    let provider = provider(FakeBackend::down());
    let err = provider
        .calculate_routes(&RouteRequest::Time {
            origin: origin(),
            minutes: 30,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::NoRouteFound), "got {err:?}");
}

#[tokio::test]
async fn a_to_b_takes_at_most_three_alternatives() {
    let provider = provider(FakeBackend::reliable());
    let routes = provider
        .calculate_routes(&RouteRequest::AToB {
            origin: origin(),
            destination: LatLng::new(19.4270, -99.1677),
        })
        .await
        .unwrap();
    assert_eq!(routes.len(), 3);
}

#[tokio::test]
async fn validation_happens_before_any_backend_call() {
    let backend = FakeBackend::down();
    let provider = provider(backend);
    let err = provider
        .calculate_routes(&RouteRequest::Distance {
            origin: origin(),
            km: 0.0,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, WalkError::Validation(_)), "got {err:?}");
}
