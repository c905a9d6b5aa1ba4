//! Read-only query services over the store: nearby stops, route search,
//! arrival estimates, and the operator dashboard.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use fleet_types::{Bus, BusId, GeoPoint, Route, RouteId, Stop, StopId};
use rand::Rng;
use serde::Serialize;

use crate::config::ArrivalConfig;
use crate::dashboard::{self, FleetOverview};
use crate::store::{StateStore, StoreError};

/// Radius used when a caller does not give one, in degrees.
pub const DEFAULT_NEARBY_RADIUS: f64 = 0.01;

/// Errors returned by query services.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// A referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The query parameters are malformed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

impl From<StoreError> for QueryError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::BusNotFound(id) => Self::NotFound(format!("bus {id}")),
            StoreError::RouteNotFound(id) => Self::NotFound(format!("route {id}")),
            StoreError::StopNotFound(id) => Self::NotFound(format!("stop {id}")),
            StoreError::InvalidUpdate { .. } => Self::InvalidQuery(err.to_string()),
        }
    }
}

/// A stop within the search radius.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NearbyStop {
    /// The stop.
    #[serde(flatten)]
    pub stop: Stop,
    /// Squared degree-space distance to the query point. Not geodesic.
    pub distance_sq: f64,
}

/// A route matched by name search, with its stops in sequence order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteMatch {
    /// The route, including its path.
    #[serde(flatten)]
    pub route: Route,
    /// Full stop records in sequence order.
    #[serde(rename = "stop_details")]
    pub stops: Vec<Stop>,
}

/// One synthetic arrival estimate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrivalEstimate {
    /// Bus identifier.
    pub bus_id: BusId,
    /// Fleet number.
    pub bus_number: String,
    /// Route the bus runs on.
    pub route_id: RouteId,
    /// Current occupancy percentage.
    pub occupancy: u8,
    /// Minutes until arrival.
    pub eta_minutes: u32,
    /// Absolute arrival time.
    pub estimated_arrival: DateTime<Utc>,
}

/// Stateless queries over a shared [`StateStore`].
#[derive(Debug, Clone)]
pub struct QueryService {
    store: Arc<StateStore>,
    arrivals: ArrivalConfig,
}

impl QueryService {
    /// Create a query service.
    pub const fn new(store: Arc<StateStore>, arrivals: ArrivalConfig) -> Self {
        Self { store, arrivals }
    }

    /// The underlying store.
    pub const fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// Stops strictly within `radius` of `point`, nearest first.
    ///
    /// Distance is squared Euclidean distance in degree space, a flat-earth
    /// approximation that is only meaningful for small radii.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] for a non-finite point or a
    /// negative or non-finite radius.
    pub fn nearest_stops(&self, point: GeoPoint, radius: f64) -> Result<Vec<NearbyStop>, QueryError> {
        if !point.is_finite() {
            return Err(QueryError::InvalidQuery(String::from(
                "latitude and longitude must be finite numbers",
            )));
        }
        if !radius.is_finite() || radius < 0.0 {
            return Err(QueryError::InvalidQuery(format!(
                "radius must be a non-negative number, got {radius}"
            )));
        }

        let limit = radius * radius;
        let mut found: Vec<NearbyStop> = self
            .store
            .network()
            .stops()
            .filter_map(|stop| {
                let distance_sq = stop.position().degree_distance_sq(point);
                (distance_sq < limit).then(|| NearbyStop {
                    stop: stop.clone(),
                    distance_sq,
                })
            })
            .collect();
        found.sort_by(|a, b| a.distance_sq.total_cmp(&b.distance_sq));
        Ok(found)
    }

    /// Routes whose stops include both names, in either order.
    ///
    /// Names are trimmed and compared case-insensitively against whole stop
    /// names. Results are in route id order.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidQuery`] if either name is blank.
    pub fn search_routes(&self, start: &str, end: &str) -> Result<Vec<RouteMatch>, QueryError> {
        let start = start.trim().to_lowercase();
        let end = end.trim().to_lowercase();
        if start.is_empty() || end.is_empty() {
            return Err(QueryError::InvalidQuery(String::from(
                "start and end must not be blank",
            )));
        }

        let network = self.store.network();
        let matches = network
            .routes()
            .filter_map(|route| {
                let stops = network.stops_on(route.id);
                let names: Vec<String> = stops.iter().map(|s| s.name.to_lowercase()).collect();
                let has = |name: &str| names.iter().any(|n| n == name);
                (has(&start) && has(&end)).then(|| RouteMatch {
                    route: route.clone(),
                    stops: stops.into_iter().cloned().collect(),
                })
            })
            .collect();
        Ok(matches)
    }

    /// Synthetic arrival estimates at a stop, one per bus on its route.
    ///
    /// The ETA is a uniformly random whole number of minutes within the
    /// configured bounds. It deliberately ignores bus position and speed.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NotFound`] for an unknown stop.
    pub async fn estimate_arrivals(&self, stop_id: StopId) -> Result<Vec<ArrivalEstimate>, QueryError> {
        let stop = self.store.stop(stop_id)?;
        let buses = self.store.buses_on_route(stop.route_id).await;
        let mut rng = rand::rng();
        Ok(synthesize_arrivals(&buses, self.arrivals, &mut rng, Utc::now()))
    }

    /// Operator dashboard figures for the current fleet as of `now`.
    pub async fn fleet_overview(&self, now: DateTime<Utc>) -> FleetOverview {
        let buses = self.store.buses().await;
        dashboard::fleet_overview(&self.store.routes(), &buses, now)
    }
}

/// Placeholder arrival heuristic: `now` plus a random whole number of
/// minutes in `[arrival_min_minutes, arrival_max_minutes]` for each bus.
pub fn synthesize_arrivals(
    buses: &[Bus],
    bounds: ArrivalConfig,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Vec<ArrivalEstimate> {
    let low = bounds.arrival_min_minutes.min(bounds.arrival_max_minutes);
    let high = bounds.arrival_max_minutes.max(low);
    buses
        .iter()
        .map(|bus| {
            let eta_minutes = rng.random_range(low..=high);
            ArrivalEstimate {
                bus_id: bus.id,
                bus_number: bus.bus_number.clone(),
                route_id: bus.route_id,
                occupancy: bus.occupancy,
                eta_minutes,
                estimated_arrival: now
                    .checked_add_signed(Duration::minutes(i64::from(eta_minutes)))
                    .unwrap_or(now),
            }
        })
        .collect()
}
