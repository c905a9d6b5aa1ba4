//! Core entity records: routes, stops, buses, and notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::NotificationCategory;
use crate::ids::{BusId, NotificationId, RouteId, StopId};

// ---------------------------------------------------------------------------
// Geography
// ---------------------------------------------------------------------------

/// A latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoPoint {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Squared Euclidean distance in degree space.
    ///
    /// This is a flat-earth approximation that only makes sense for small
    /// separations. It is not a geodesic distance.
    pub fn degree_distance_sq(self, other: Self) -> f64 {
        let dlat = self.latitude - other.latitude;
        let dlon = self.longitude - other.longitude;
        dlat.mul_add(dlat, dlon * dlon)
    }

    /// Whether both coordinates are finite numbers.
    pub const fn is_finite(self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A fixed bus route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Route {
    /// Route identifier.
    pub id: RouteId,
    /// Public route number painted on the bus (e.g. `218K`).
    #[serde(rename = "route_no")]
    pub route_number: String,
    /// Display name, usually `Start–End`.
    #[serde(rename = "route_name")]
    pub name: String,
    /// Name of the first point served.
    pub start_point: String,
    /// Name of the last point served.
    pub end_point: String,
    /// Ordered waypoints describing the route's shape.
    #[serde(default)]
    pub path: Vec<GeoPoint>,
    /// Stops served by this route, in sequence order.
    #[serde(default)]
    pub stops: Vec<StopId>,
}

// ---------------------------------------------------------------------------
// Stop
// ---------------------------------------------------------------------------

/// A stop on a route. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Stop {
    /// Stop identifier.
    pub id: StopId,
    /// Stop name as shown to riders.
    #[serde(rename = "stop_name")]
    pub name: String,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Route this stop belongs to.
    pub route_id: RouteId,
    /// Position of the stop along its route (1-based in the seed data).
    pub sequence: u32,
}

impl Stop {
    /// The stop's location.
    pub const fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Bus
// ---------------------------------------------------------------------------

/// Live state of one bus. Only the simulation tick writes these fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Bus {
    /// Bus identifier.
    pub id: BusId,
    /// Fleet number (e.g. `HYD001`).
    pub bus_number: String,
    /// Route the bus is assigned to.
    pub route_id: RouteId,
    /// Current latitude in degrees.
    pub latitude: f64,
    /// Current longitude in degrees.
    pub longitude: f64,
    /// Current speed, never negative.
    pub speed: f64,
    /// Current occupancy percentage, 0 to 100.
    pub occupancy: u8,
    /// When the bus was last updated.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

impl Bus {
    /// The bus's current location.
    pub const fn position(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// An append-only rider notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Notification {
    /// Notification identifier.
    pub id: NotificationId,
    /// Free-text message.
    pub message: String,
    /// Category tag (delay, crowd, service).
    #[serde(rename = "type")]
    pub category: NotificationCategory,
    /// Bus the notification refers to, if any.
    pub bus_id: Option<BusId>,
    /// When the notification was created.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn degree_distance_is_squared() {
        let a = GeoPoint::new(17.0, 78.0);
        let b = GeoPoint::new(17.03, 78.04);
        let d = a.degree_distance_sq(b);
        assert!((d - 0.0025).abs() < 1e-12);
    }

    #[test]
    fn non_finite_points_are_detected() {
        assert!(GeoPoint::new(17.0, 78.0).is_finite());
        assert!(!GeoPoint::new(f64::NAN, 78.0).is_finite());
        assert!(!GeoPoint::new(17.0, f64::INFINITY).is_finite());
    }

    #[test]
    fn stop_uses_original_field_names() {
        let stop = Stop {
            id: StopId(1),
            name: String::from("Koti"),
            latitude: 17.385,
            longitude: 78.4867,
            route_id: RouteId(1),
            sequence: 1,
        };
        let json = serde_json::to_value(&stop).unwrap();
        assert_eq!(json["stop_name"], "Koti");
        assert_eq!(json["route_id"], 1);
    }
}
