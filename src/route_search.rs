//! Loop-route search over a directions backend.
//!
//! For TIME and DISTANCE requests the engine builds round trips
//! origin -> waypoint -> origin. Waypoint candidates come from real points of
//! interest first (parks make walking loops plausible) with a synthetic
//! ring/bearing fallback so the search never starves where POI data is
//! sparse. Every candidate gets a cheap one-way probe; only sector-diverse
//! finalists get the expensive loop probe. The caps in [`RouteSearchConfig`]
//! bound external-call cost and must hold regardless of probe concurrency.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use log::{debug, warn};

use crate::directions::MapsBackend;
use crate::error::WalkError;
use crate::geo_math;
use crate::route_provider::RouteProvider;
use crate::types::{LatLng, RouteQuote, RouteRequest};

/// Ring multipliers applied to the base one-way radius, nearest to farthest.
const RING_MULTIPLIERS: [f64; 5] = [0.65, 0.80, 1.00, 1.20, 1.40];

/// Synthetic candidate bearings: every 30 degrees.
const BEARING_STEP_DEG: usize = 30;

/// Rings below this radius stop being useful walking destinations.
const MIN_RING_RADIUS_KM: f64 = 0.15;

/// If the park lookup returns fewer hits than this, run the relaxed keyword
/// search as well.
const MIN_POI_BEFORE_KEYWORD_FALLBACK: usize = 10;

/// Tuning knobs for the candidate search. The caps are cost controls for
/// the external backend, not correctness requirements.
#[derive(Debug, Clone)]
pub struct RouteSearchConfig {
    pub walking_speed_kmh: f64,
    pub max_candidate_waypoints: usize,
    pub max_final_evaluations: usize,
    pub sector_count: usize,
    pub finalists_per_sector: usize,
    pub time_slack_min: i32,
    pub distance_slack_km: f64,
    pub max_suggested_routes: usize,
    pub max_places_candidates: usize,
    pub places_radius_min_meters: u32,
    pub places_radius_max_meters: u32,
    pub probe_concurrency: usize,
}

impl Default for RouteSearchConfig {
    fn default() -> Self {
        Self {
            walking_speed_kmh: 4.5,
            max_candidate_waypoints: 42,
            max_final_evaluations: 12,
            sector_count: 6,
            finalists_per_sector: 2,
            time_slack_min: 10,
            distance_slack_km: 0.1,
            max_suggested_routes: 3,
            max_places_candidates: 24,
            places_radius_min_meters: 300,
            places_radius_max_meters: 5000,
            probe_concurrency: 4,
        }
    }
}

/// Transient score of a waypoint candidate after the cheap probe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateScore {
    pub waypoint: LatLng,
    pub error: f64,
    pub est_duration_min: i32,
    pub est_distance_km: f64,
}

#[derive(Debug, Clone)]
struct LoopCandidate {
    quote: RouteQuote,
    sector: usize,
    error: f64,
}

#[derive(Debug, Clone, Copy)]
enum PlacesStrategy {
    Time,
    Distance,
}

impl PlacesStrategy {
    /// TIME searches widen the POI radius more aggressively: duration
    /// targets tolerate more detour than distance targets do.
    fn radius_multiplier(self) -> f64 {
        match self {
            Self::Time => 1.6,
            Self::Distance => 1.2,
        }
    }
}

/// Live route generation against a directions backend.
pub struct DirectionsRouteProvider {
    backend: Arc<dyn MapsBackend>,
    config: RouteSearchConfig,
}

impl DirectionsRouteProvider {
    pub fn new(backend: Arc<dyn MapsBackend>, config: RouteSearchConfig) -> Self {
        Self { backend, config }
    }

    /// Run the cheap one-way probe over every candidate. Failed probes drop
    /// the candidate silently; a shrunken pool is fine, an aborted search is
    /// not.
    async fn probe_one_way(&self, origin: LatLng, candidates: Vec<LatLng>) -> Vec<(LatLng, RouteQuote)> {
        stream::iter(candidates)
            .map(|waypoint| {
                let backend = Arc::clone(&self.backend);
                async move {
                    match backend.directions(origin, waypoint, None, false).await {
                        Ok(quotes) => quotes.into_iter().next().map(|q| (waypoint, q)),
                        Err(e) => {
                            debug!("one-way probe dropped a candidate: {e}");
                            None
                        }
                    }
                }
            })
            .buffered(self.config.probe_concurrency.max(1))
            .filter_map(|probe| async move { probe })
            .collect()
            .await
    }

    /// Waypoint candidates around the origin: POIs first, synthetic rings
    /// after, deduplicated at 5 decimal places and truncated to the cap.
    async fn candidate_waypoints(
        &self,
        origin: LatLng,
        base_radius_km: f64,
        strategy: PlacesStrategy,
    ) -> Vec<LatLng> {
        let radius_meters = (((base_radius_km * 1000.0) * strategy.radius_multiplier()).round()
            as i64)
            .clamp(
                i64::from(self.config.places_radius_min_meters),
                i64::from(self.config.places_radius_max_meters),
            ) as u32;

        let parks = match self
            .backend
            .nearby_places(
                origin,
                radius_meters,
                Some("park"),
                None,
                self.config.max_places_candidates,
            )
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("park lookup failed, continuing with synthetic candidates: {e}");
                Vec::new()
            }
        };

        let keyword_hits = if parks.len() < MIN_POI_BEFORE_KEYWORD_FALLBACK {
            match self
                .backend
                .nearby_places(
                    origin,
                    radius_meters,
                    None,
                    Some("dog park"),
                    self.config.max_places_candidates,
                )
                .await
            {
                Ok(hits) => hits,
                Err(e) => {
                    debug!("keyword place lookup failed: {e}");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let mut all = parks;
        all.extend(keyword_hits);
        all.extend(synthetic_ring_candidates(
            origin,
            base_radius_km,
            self.config.max_candidate_waypoints,
        ));

        let mut deduped = dedupe_latlng(all);
        deduped.truncate(self.config.max_candidate_waypoints);
        deduped
    }

    /// Loop probes for the finalists. Sequential: at most
    /// `max_final_evaluations` expensive calls per request.
    async fn probe_loops(&self, origin: LatLng, finalists: &[CandidateScore]) -> Vec<LoopCandidate> {
        let mut loops = Vec::with_capacity(finalists.len());
        for finalist in finalists {
            match self
                .backend
                .directions(origin, origin, Some(finalist.waypoint), false)
                .await
            {
                Ok(quotes) => {
                    if let Some(quote) = quotes.into_iter().next() {
                        loops.push(LoopCandidate {
                            sector: sector_index(origin, finalist.waypoint, self.config.sector_count),
                            error: 0.0,
                            quote,
                        });
                    }
                }
                Err(e) => debug!("loop probe dropped a finalist: {e}"),
            }
        }
        loops
    }

    async fn loop_routes_by_time(
        &self,
        origin: LatLng,
        target_min: i32,
        min_accept: i32,
        max_accept: i32,
    ) -> Result<Vec<RouteQuote>, WalkError> {
        let one_way_hours = (f64::from(target_min) / 2.0) / 60.0;
        let base_one_way_km = self.config.walking_speed_kmh * one_way_hours;

        let candidates = self
            .candidate_waypoints(origin, base_one_way_km, PlacesStrategy::Time)
            .await;
        let probed = self.probe_one_way(origin, candidates).await;

        let scored: Vec<CandidateScore> = probed
            .into_iter()
            .map(|(waypoint, quote)| {
                let est_duration_min = (quote.duration_min * 2).max(1);
                CandidateScore {
                    waypoint,
                    error: f64::from((est_duration_min - target_min).abs()),
                    est_duration_min,
                    est_distance_km: quote.distance_km * 2.0,
                }
            })
            .collect();

        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let finalists = pick_finalists_by_sector(
            origin,
            &scored,
            self.config.sector_count,
            self.config.finalists_per_sector,
            self.config.max_final_evaluations,
        );

        let mut loops = self.probe_loops(origin, &finalists).await;
        for candidate in &mut loops {
            candidate.error = f64::from((candidate.quote.duration_min - target_min).abs());
        }

        let ranked = rank_loops(loops, |q| {
            (min_accept..=max_accept).contains(&q.duration_min)
        });
        Ok(pick_diverse_top_k(&ranked, self.config.max_suggested_routes))
    }

    async fn loop_routes_by_distance(
        &self,
        origin: LatLng,
        target_km: f64,
        min_accept: f64,
        max_accept: f64,
    ) -> Result<Vec<RouteQuote>, WalkError> {
        let base_one_way_km = target_km / 2.0;

        let candidates = self
            .candidate_waypoints(origin, base_one_way_km, PlacesStrategy::Distance)
            .await;
        let probed = self.probe_one_way(origin, candidates).await;

        let scored: Vec<CandidateScore> = probed
            .into_iter()
            .map(|(waypoint, quote)| {
                let est_distance_km = quote.distance_km * 2.0;
                CandidateScore {
                    waypoint,
                    error: (est_distance_km - target_km).abs(),
                    est_duration_min: quote.duration_min * 2,
                    est_distance_km,
                }
            })
            .collect();

        if scored.is_empty() {
            return Ok(Vec::new());
        }

        let finalists = pick_finalists_by_sector(
            origin,
            &scored,
            self.config.sector_count,
            self.config.finalists_per_sector,
            self.config.max_final_evaluations,
        );

        let mut loops = self.probe_loops(origin, &finalists).await;
        for candidate in &mut loops {
            candidate.error = (candidate.quote.distance_km - target_km).abs();
        }

        let ranked = rank_loops(loops, |q| {
            q.distance_km >= min_accept && q.distance_km <= max_accept
        });
        Ok(pick_diverse_top_k(&ranked, self.config.max_suggested_routes))
    }
}

#[async_trait]
impl RouteProvider for DirectionsRouteProvider {
    async fn calculate_routes(&self, request: &RouteRequest) -> Result<Vec<RouteQuote>, WalkError> {
        request.validate()?;

        let routes = match request {
            RouteRequest::AToB {
                origin,
                destination,
            }
            | RouteRequest::Predefined {
                origin,
                destination,
                ..
            } => {
                let mut alternatives = self
                    .backend
                    .directions(*origin, *destination, None, true)
                    .await?;
                alternatives.truncate(self.config.max_suggested_routes);
                alternatives
            }
            RouteRequest::Time { origin, minutes } => {
                let min_accept = (minutes - self.config.time_slack_min).max(5);
                let max_accept = minutes + self.config.time_slack_min;
                self.loop_routes_by_time(*origin, *minutes, min_accept, max_accept)
                    .await?
            }
            RouteRequest::Distance { origin, km } => {
                let min_accept = (km - self.config.distance_slack_km).max(0.2);
                let max_accept = km + self.config.distance_slack_km;
                self.loop_routes_by_distance(*origin, *km, min_accept, max_accept)
                    .await?
            }
        };

        if routes.is_empty() {
            return Err(WalkError::NoRouteFound);
        }
        Ok(routes)
    }
}

/// Synthetic waypoints on 5 rings and 12 bearings around the origin,
/// truncated to the candidate cap.
pub(crate) fn synthetic_ring_candidates(
    origin: LatLng,
    base_radius_km: f64,
    cap: usize,
) -> Vec<LatLng> {
    let mut out = Vec::new();
    for multiplier in RING_MULTIPLIERS {
        let ring_km = (base_radius_km * multiplier).max(MIN_RING_RADIUS_KM);
        for bearing in (0..360).step_by(BEARING_STEP_DEG) {
            if out.len() >= cap {
                return out;
            }
            out.push(geo_math::destination_from_bearing(
                origin,
                ring_km,
                bearing as f64,
            ));
        }
    }
    out
}

/// Approximate dedupe: candidates are considered equal when they match after
/// rounding to 5 decimal places, which collapses POI and synthetic points
/// that fall on top of each other.
pub(crate) fn dedupe_latlng(points: Vec<LatLng>) -> Vec<LatLng> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(points.len());
    for point in points {
        let key = (
            (point.lat * 1e5).round() as i64,
            (point.lng * 1e5).round() as i64,
        );
        if seen.insert(key) {
            out.push(point);
        }
    }
    out
}

/// Which of the `sector_count` equal bearing sectors the waypoint falls in,
/// seen from the origin.
pub(crate) fn sector_index(origin: LatLng, waypoint: LatLng, sector_count: usize) -> usize {
    let angle = geo_math::bearing_degrees(origin, waypoint);
    let sector_size = 360.0 / sector_count as f64;
    ((angle / sector_size).floor() as usize).min(sector_count - 1)
}

/// Promote candidates to finalists: round-robin across sectors in ascending
/// sector order, best error first, up to `per_sector` per sector, until
/// `max_final` are picked or the sectors run dry; any shortfall is
/// back-filled in global best-error order.
pub(crate) fn pick_finalists_by_sector(
    origin: LatLng,
    scored: &[CandidateScore],
    sector_count: usize,
    per_sector: usize,
    max_final: usize,
) -> Vec<CandidateScore> {
    let mut by_sector: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, candidate) in scored.iter().enumerate() {
        by_sector
            .entry(sector_index(origin, candidate.waypoint, sector_count))
            .or_default()
            .push(idx);
    }
    for indices in by_sector.values_mut() {
        indices.sort_by(|&a, &b| scored[a].error.total_cmp(&scored[b].error));
    }

    let mut picked: Vec<usize> = Vec::new();
    let mut taken: HashMap<usize, usize> = HashMap::new();
    'rounds: loop {
        let mut added = false;
        for (&sector, indices) in &by_sector {
            let count = taken.get(&sector).copied().unwrap_or(0);
            if count >= per_sector {
                continue;
            }
            if let Some(&idx) = indices.get(count) {
                picked.push(idx);
                taken.insert(sector, count + 1);
                added = true;
                if picked.len() == max_final {
                    break 'rounds;
                }
            }
        }
        if !added {
            break;
        }
    }

    if picked.len() < max_final {
        let mut rest: Vec<usize> = (0..scored.len()).filter(|i| !picked.contains(i)).collect();
        rest.sort_by(|&a, &b| scored[a].error.total_cmp(&scored[b].error));
        picked.extend(rest.into_iter().take(max_final - picked.len()));
    }

    picked.into_iter().map(|i| scored[i]).collect()
}

/// Filter to the acceptance window and order by error; when nothing survives
/// the window, fall back to the full set so tight tolerances still return
/// the closest routes rather than nothing.
fn rank_loops(
    loops: Vec<LoopCandidate>,
    within: impl Fn(&RouteQuote) -> bool,
) -> Vec<(RouteQuote, usize)> {
    let mut ranked: Vec<LoopCandidate> =
        loops.iter().filter(|l| within(&l.quote)).cloned().collect();
    if ranked.is_empty() {
        ranked = loops;
    }
    ranked.sort_by(|a, b| a.error.total_cmp(&b.error));
    ranked.into_iter().map(|l| (l.quote, l.sector)).collect()
}

/// Walk the error-ranked list taking at most one route per sector, then
/// back-fill with the remaining best entries when fewer than `k` sectors are
/// represented. Returned alternatives differ in direction, not just in minor
/// distance variation.
pub(crate) fn pick_diverse_top_k(ranked: &[(RouteQuote, usize)], k: usize) -> Vec<RouteQuote> {
    if ranked.is_empty() || k == 0 {
        return Vec::new();
    }

    let mut chosen: Vec<usize> = Vec::new();
    let mut used_sectors = HashSet::new();
    for (idx, (_, sector)) in ranked.iter().enumerate() {
        if used_sectors.insert(*sector) {
            chosen.push(idx);
            if chosen.len() == k {
                break;
            }
        }
    }

    if chosen.len() < k {
        for idx in 0..ranked.len() {
            if chosen.len() == k {
                break;
            }
            if !chosen.contains(&idx) {
                chosen.push(idx);
            }
        }
    }

    chosen.into_iter().map(|i| ranked[i].0.clone()).collect()
}
