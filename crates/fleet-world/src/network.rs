//! The route network: routes and their stops.
//!
//! [`TransitNetwork`] is built once from seed data and never mutated, so it
//! can be shared between the tick and every request handler without a lock.
//! Building it enforces the stop-ordering invariant: each route's stop list
//! is derived from the stops' `sequence` numbers, ascending, and two stops on
//! the same route may not share a sequence number.

use std::collections::{BTreeMap, BTreeSet};

use fleet_types::{GeoPoint, Route, RouteId, Stop, StopId};
use tracing::debug;

use crate::error::WorldError;

/// Immutable set of routes and stops.
#[derive(Debug, Clone, Default)]
pub struct TransitNetwork {
    routes: BTreeMap<RouteId, Route>,
    stops: BTreeMap<StopId, Stop>,
}

impl TransitNetwork {
    /// Build a network from route and stop records.
    ///
    /// Any `stops` list already present on a route is replaced by the list
    /// derived from the stop records. A route with no `path` gets one made
    /// of its stop coordinates in sequence order.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] for duplicate ids, stops on unknown routes,
    /// repeated sequence numbers within a route, or non-finite coordinates.
    pub fn build(routes: Vec<Route>, stops: Vec<Stop>) -> Result<Self, WorldError> {
        let mut route_map = BTreeMap::new();
        for route in routes {
            if route.path.iter().any(|p| !p.is_finite()) {
                return Err(WorldError::InvalidCoordinate {
                    entity: format!("route {} path", route.id),
                });
            }
            let id = route.id;
            if route_map.insert(id, route).is_some() {
                return Err(WorldError::DuplicateRoute(id));
            }
        }

        let mut stop_map = BTreeMap::new();
        let mut sequences: BTreeSet<(RouteId, u32)> = BTreeSet::new();
        for stop in stops {
            if !route_map.contains_key(&stop.route_id) {
                return Err(WorldError::StopRouteNotFound {
                    stop: stop.id,
                    route: stop.route_id,
                });
            }
            if !stop.position().is_finite() {
                return Err(WorldError::InvalidCoordinate {
                    entity: format!("stop {}", stop.id),
                });
            }
            if !sequences.insert((stop.route_id, stop.sequence)) {
                return Err(WorldError::DuplicateSequence {
                    route: stop.route_id,
                    sequence: stop.sequence,
                });
            }
            let id = stop.id;
            if stop_map.insert(id, stop).is_some() {
                return Err(WorldError::DuplicateStop(id));
            }
        }

        // Stops ordered by (route, sequence) thanks to the BTreeSet above.
        let by_sequence: BTreeMap<(RouteId, u32), StopId> = stop_map
            .values()
            .map(|s| ((s.route_id, s.sequence), s.id))
            .collect();

        for route in route_map.values_mut() {
            route.stops = by_sequence
                .range((route.id, u32::MIN)..=(route.id, u32::MAX))
                .map(|(_, id)| *id)
                .collect();
            if route.path.is_empty() {
                route.path = route
                    .stops
                    .iter()
                    .filter_map(|id| stop_map.get(id))
                    .map(Stop::position)
                    .collect();
            }
            debug!(
                route = %route.id,
                stops = route.stops.len(),
                waypoints = route.path.len(),
                "Route indexed"
            );
        }

        Ok(Self {
            routes: route_map,
            stops: stop_map,
        })
    }

    /// All routes in id order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.values()
    }

    /// All stops in id order.
    pub fn stops(&self) -> impl Iterator<Item = &Stop> {
        self.stops.values()
    }

    /// Look up a route.
    pub fn route(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(&id)
    }

    /// Look up a stop.
    pub fn stop(&self, id: StopId) -> Option<&Stop> {
        self.stops.get(&id)
    }

    /// Whether a route exists.
    pub fn has_route(&self, id: RouteId) -> bool {
        self.routes.contains_key(&id)
    }

    /// Stops of a route in sequence order. Empty for an unknown route.
    pub fn stops_on(&self, route: RouteId) -> Vec<&Stop> {
        self.routes
            .get(&route)
            .map(|r| r.stops.iter().filter_map(|id| self.stops.get(id)).collect())
            .unwrap_or_default()
    }

    /// Waypoints of a route. Empty for an unknown route.
    pub fn path_of(&self, route: RouteId) -> &[GeoPoint] {
        self.routes
            .get(&route)
            .map(|r| r.path.as_slice())
            .unwrap_or_default()
    }

    /// Number of routes.
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }

    /// Number of stops.
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }
}
