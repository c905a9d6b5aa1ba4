//! Seed data: the records the engine starts from.
//!
//! A [`FleetSeed`] is either the built-in Hyderabad network
//! ([`create_starting_fleet`](crate::create_starting_fleet)) or a YAML file
//! with the same shape:
//!
//! ```yaml
//! routes:
//!   - { id: 1, route_no: "218K", route_name: "Koti–Kondapur", start_point: Koti, end_point: Kondapur }
//! stops:
//!   - { id: 1, stop_name: Koti, latitude: 17.385, longitude: 78.4867, route_id: 1, sequence: 1 }
//! buses:
//!   - { id: 1, bus_number: HYD001, route_id: 1, latitude: 17.4375, longitude: 78.4483, speed: 32, occupancy: 60 }
//! notifications: []
//! ```
//!
//! [`FleetSeed::build`] validates the whole seed and splits it into the
//! immutable [`TransitNetwork`] and the mutable bus and notification records.

use std::collections::BTreeSet;
use std::path::Path;

use fleet_types::{Bus, Notification, Route, Stop};
use serde::Deserialize;
use tracing::info;

use crate::error::WorldError;
use crate::network::TransitNetwork;

/// Maximum occupancy percentage.
pub const MAX_OCCUPANCY: u8 = 100;

/// Raw seed records, as loaded from YAML or built in code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FleetSeed {
    /// Routes.
    #[serde(default)]
    pub routes: Vec<Route>,
    /// Stops.
    #[serde(default)]
    pub stops: Vec<Stop>,
    /// Buses with their starting state.
    #[serde(default)]
    pub buses: Vec<Bus>,
    /// Notifications present at startup.
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// A validated seed, ready to back a store.
#[derive(Debug, Clone)]
pub struct SeededFleet {
    /// The immutable route network.
    pub network: TransitNetwork,
    /// Buses ordered by id.
    pub buses: Vec<Bus>,
    /// Notifications ordered by id.
    pub notifications: Vec<Notification>,
}

impl FleetSeed {
    /// Load a seed from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Io`] if the file cannot be read, or
    /// [`WorldError::Yaml`] if it is not valid seed YAML.
    pub fn from_file(path: &Path) -> Result<Self, WorldError> {
        let contents = std::fs::read_to_string(path)?;
        let seed = Self::parse(&contents)?;
        info!(path = %path.display(), "Seed file loaded");
        Ok(seed)
    }

    /// Parse a seed from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::Yaml`] if the string is not valid seed YAML.
    pub fn parse(yaml: &str) -> Result<Self, WorldError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Validate the seed and split it into network and live records.
    ///
    /// # Errors
    ///
    /// Returns a [`WorldError`] describing the first invariant violation:
    /// duplicate ids, dangling route references, repeated stop sequences,
    /// non-finite coordinates, negative speed, or occupancy above 100.
    pub fn build(self) -> Result<SeededFleet, WorldError> {
        let network = TransitNetwork::build(self.routes, self.stops)?;

        let mut bus_ids = BTreeSet::new();
        for bus in &self.buses {
            validate_bus(bus, &network)?;
            if !bus_ids.insert(bus.id) {
                return Err(WorldError::DuplicateBus(bus.id));
            }
        }

        let mut notification_ids = BTreeSet::new();
        for notification in &self.notifications {
            if !notification_ids.insert(notification.id) {
                return Err(WorldError::DuplicateNotification(notification.id));
            }
        }

        let mut buses = self.buses;
        buses.sort_by_key(|b| b.id);
        let mut notifications = self.notifications;
        notifications.sort_by_key(|n| n.id);

        info!(
            routes = network.route_count(),
            stops = network.stop_count(),
            buses = buses.len(),
            notifications = notifications.len(),
            "Seed validated"
        );

        Ok(SeededFleet {
            network,
            buses,
            notifications,
        })
    }
}

/// Check one bus against the network and the value bounds.
fn validate_bus(bus: &Bus, network: &TransitNetwork) -> Result<(), WorldError> {
    if !network.has_route(bus.route_id) {
        return Err(WorldError::BusRouteNotFound {
            bus: bus.id,
            route: bus.route_id,
        });
    }
    if !bus.position().is_finite() {
        return Err(WorldError::InvalidCoordinate {
            entity: format!("bus {}", bus.id),
        });
    }
    if !bus.speed.is_finite() || bus.speed < 0.0 {
        return Err(WorldError::InvalidBus {
            bus: bus.id,
            reason: format!("speed {} is not a non-negative number", bus.speed),
        });
    }
    if bus.occupancy > MAX_OCCUPANCY {
        return Err(WorldError::InvalidBus {
            bus: bus.id,
            reason: format!("occupancy {} exceeds {MAX_OCCUPANCY}", bus.occupancy),
        });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use fleet_types::{BusId, RouteId};

    use super::*;

    const SEED_YAML: &str = r#"
routes:
  - id: 1
    route_no: "218K"
    route_name: "Koti–Kondapur"
    start_point: Koti
    end_point: Kondapur
stops:
  - { id: 2, stop_name: Ameerpet, latitude: 17.4375, longitude: 78.4483, route_id: 1, sequence: 2 }
  - { id: 1, stop_name: Koti, latitude: 17.3850, longitude: 78.4867, route_id: 1, sequence: 1 }
buses:
  - { id: 1, bus_number: HYD001, route_id: 1, latitude: 17.4375, longitude: 78.4483, speed: 32, occupancy: 60 }
notifications:
  - { id: 1, message: "Route 218K service resumed", type: service, bus_id: null }
"#;

    #[test]
    fn parse_and_build_yaml_seed() {
        let fleet = FleetSeed::parse(SEED_YAML).unwrap().build().unwrap();
        assert_eq!(fleet.network.route_count(), 1);
        let names: Vec<&str> = fleet
            .network
            .stops_on(RouteId(1))
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Koti", "Ameerpet"]);
        assert_eq!(fleet.buses.len(), 1);
        assert_eq!(fleet.notifications.len(), 1);
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        assert!(matches!(
            FleetSeed::parse("routes: [ {id: "),
            Err(WorldError::Yaml { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let result = FleetSeed::from_file(Path::new("/definitely/not/here.yaml"));
        assert!(matches!(result, Err(WorldError::Io { .. })));
    }

    fn seed_with_bus(mutate: impl FnOnce(&mut Bus)) -> FleetSeed {
        let mut seed = FleetSeed::parse(SEED_YAML).unwrap();
        if let Some(bus) = seed.buses.first_mut() {
            mutate(bus);
        }
        seed
    }

    #[test]
    fn bus_on_unknown_route_is_rejected() {
        let seed = seed_with_bus(|b| b.route_id = RouteId(99));
        assert!(matches!(
            seed.build(),
            Err(WorldError::BusRouteNotFound { bus: BusId(1), route: RouteId(99) })
        ));
    }

    #[test]
    fn bus_value_bounds_are_enforced() {
        let seed = seed_with_bus(|b| b.occupancy = 101);
        assert!(matches!(seed.build(), Err(WorldError::InvalidBus { .. })));

        let seed = seed_with_bus(|b| b.speed = -1.0);
        assert!(matches!(seed.build(), Err(WorldError::InvalidBus { .. })));

        let seed = seed_with_bus(|b| b.longitude = f64::INFINITY);
        assert!(matches!(seed.build(), Err(WorldError::InvalidCoordinate { .. })));
    }

    #[test]
    fn duplicate_bus_is_rejected() {
        let mut seed = FleetSeed::parse(SEED_YAML).unwrap();
        let extra = seed.buses.first().cloned();
        seed.buses.extend(extra);
        assert!(matches!(seed.build(), Err(WorldError::DuplicateBus(BusId(1)))));
    }
}
