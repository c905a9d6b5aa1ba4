//! Error types for the `fleet-world` crate.
//!
//! All fallible operations in this crate return [`WorldError`]. Every variant
//! describes seed data that violates a data-model invariant; a store is
//! never built from data that produced one of these.

use fleet_types::{BusId, NotificationId, RouteId, StopId};

/// Errors raised while loading or validating seed data.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// Two routes share an identifier.
    #[error("duplicate route id: {0}")]
    DuplicateRoute(RouteId),

    /// Two stops share an identifier.
    #[error("duplicate stop id: {0}")]
    DuplicateStop(StopId),

    /// Two buses share an identifier.
    #[error("duplicate bus id: {0}")]
    DuplicateBus(BusId),

    /// Two notifications share an identifier.
    #[error("duplicate notification id: {0}")]
    DuplicateNotification(NotificationId),

    /// A stop references a route that does not exist.
    #[error("stop {stop} references unknown route {route}")]
    StopRouteNotFound {
        /// The offending stop.
        stop: StopId,
        /// The missing route.
        route: RouteId,
    },

    /// A bus references a route that does not exist.
    #[error("bus {bus} references unknown route {route}")]
    BusRouteNotFound {
        /// The offending bus.
        bus: BusId,
        /// The missing route.
        route: RouteId,
    },

    /// Two stops on the same route share a sequence position.
    #[error("route {route} has two stops at sequence {sequence}")]
    DuplicateSequence {
        /// The route.
        route: RouteId,
        /// The repeated sequence number.
        sequence: u32,
    },

    /// A coordinate is NaN or infinite.
    #[error("non-finite coordinate on {entity}")]
    InvalidCoordinate {
        /// Description of the record carrying the coordinate.
        entity: String,
    },

    /// A bus carries an impossible speed or occupancy.
    #[error("invalid bus {bus}: {reason}")]
    InvalidBus {
        /// The offending bus.
        bus: BusId,
        /// What is wrong with it.
        reason: String,
    },

    /// Failed to read a seed file from disk.
    #[error("failed to read seed file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse seed YAML.
    #[error("failed to parse seed YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        #[from]
        source: serde_yml::Error,
    },
}
