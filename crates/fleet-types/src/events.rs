//! Live events pushed to subscribers.
//!
//! Two shapes go over the wire, discriminated by a `type` field:
//!
//! ```json
//! {"type": "bus_update", "data": [{"id": 1, "bus_number": "HYD001", ...}]}
//! {"type": "notification", "message": "...", "severity": "warning"}
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::Severity;
use crate::ids::{BusId, RouteId};
use crate::structs::{Bus, Notification};

/// The per-bus projection carried in a `bus_update` event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BusPosition {
    /// Bus identifier.
    pub id: BusId,
    /// Fleet number.
    pub bus_number: String,
    /// Assigned route.
    pub route_id: RouteId,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Current speed.
    pub speed: f64,
    /// Occupancy percentage.
    pub occupancy: u8,
}

impl From<&Bus> for BusPosition {
    fn from(bus: &Bus) -> Self {
        Self {
            id: bus.id,
            bus_number: bus.bus_number.clone(),
            route_id: bus.route_id,
            latitude: bus.latitude,
            longitude: bus.longitude,
            speed: bus.speed,
            occupancy: bus.occupancy,
        }
    }
}

/// An event delivered to every live subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiveEvent {
    /// Positions of the whole fleet after a tick.
    BusUpdate {
        /// One entry per bus.
        data: Vec<BusPosition>,
    },
    /// A rider notification.
    Notification {
        /// Message text.
        message: String,
        /// Severity tag.
        severity: Severity,
    },
}

impl LiveEvent {
    /// Build a `bus_update` event from a set of buses.
    pub fn bus_update<'a>(buses: impl IntoIterator<Item = &'a Bus>) -> Self {
        Self::BusUpdate {
            data: buses.into_iter().map(BusPosition::from).collect(),
        }
    }

    /// Short name of the event kind, for logging.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::BusUpdate { .. } => "bus_update",
            Self::Notification { .. } => "notification",
        }
    }
}

impl From<&Notification> for LiveEvent {
    fn from(notification: &Notification) -> Self {
        Self::Notification {
            message: notification.message.clone(),
            severity: notification.category.severity(),
        }
    }
}
