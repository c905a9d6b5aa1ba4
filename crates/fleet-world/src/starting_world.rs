//! Default starting fleet: five Hyderabad city routes.
//!
//! Routes 218K and 8C have four stops each; 10H, 127K, and 225D are
//! registered without stops. Five buses run on the first three routes.

use chrono::Utc;
use fleet_types::{
    Bus, BusId, GeoPoint, Notification, NotificationCategory, NotificationId, Route, RouteId,
    Stop, StopId,
};

use crate::seed::FleetSeed;

/// Helper to build a [`Route`] with an optional explicit path.
fn route(id: u32, number: &str, start: &str, end: &str, path: Vec<GeoPoint>) -> Route {
    Route {
        id: RouteId(id),
        route_number: number.to_owned(),
        name: format!("{start}–{end}"),
        start_point: start.to_owned(),
        end_point: end.to_owned(),
        path,
        stops: Vec::new(),
    }
}

/// Helper to build a [`Stop`].
fn stop(id: u32, name: &str, latitude: f64, longitude: f64, route: u32, sequence: u32) -> Stop {
    Stop {
        id: StopId(id),
        name: name.to_owned(),
        latitude,
        longitude,
        route_id: RouteId(route),
        sequence,
    }
}

/// Helper to build a [`Bus`] stamped with the current time.
fn bus(id: u32, number: &str, route: u32, latitude: f64, longitude: f64, speed: f64, occupancy: u8) -> Bus {
    Bus {
        id: BusId(id),
        bus_number: number.to_owned(),
        route_id: RouteId(route),
        latitude,
        longitude,
        speed,
        occupancy,
        last_updated: Utc::now(),
    }
}

/// Helper to build a [`Notification`] stamped with the current time.
fn notice(id: u64, message: &str, category: NotificationCategory, bus_id: Option<u32>) -> Notification {
    Notification {
        id: NotificationId(id),
        message: message.to_owned(),
        category,
        bus_id: bus_id.map(BusId),
        timestamp: Utc::now(),
    }
}

/// Create the default starting fleet.
///
/// Paths for 218K and 8C are left empty so they are derived from the stop
/// sequence when the network is built. 10H has no stops, so its path is
/// given explicitly as its two terminals.
pub fn create_starting_fleet() -> FleetSeed {
    let routes = vec![
        route(1, "218K", "Koti", "Kondapur", Vec::new()),
        route(2, "8C", "Secunderabad", "Mehdipatnam", Vec::new()),
        route(
            3,
            "10H",
            "Charminar",
            "Hitech City",
            vec![GeoPoint::new(17.3616, 78.4747), GeoPoint::new(17.4435, 78.3772)],
        ),
        route(4, "127K", "Koti", "Kukatpally", Vec::new()),
        route(5, "225D", "Dilsukhnagar", "Gachibowli", Vec::new()),
    ];

    let stops = vec![
        stop(1, "Koti", 17.3850, 78.4867, 1, 1),
        stop(2, "Ameerpet", 17.4375, 78.4483, 1, 2),
        stop(3, "Madhapur", 17.4440, 78.3936, 1, 3),
        stop(4, "Kondapur", 17.4700, 78.3800, 1, 4),
        stop(5, "Secunderabad", 17.4399, 78.4983, 2, 1),
        stop(6, "Lakdikapul", 17.4065, 78.4691, 2, 2),
        stop(7, "Masab Tank", 17.3986, 78.4567, 2, 3),
        stop(8, "Mehdipatnam", 17.3950, 78.4400, 2, 4),
    ];

    let buses = vec![
        bus(1, "HYD001", 1, 17.4375, 78.4483, 32.0, 60),
        bus(2, "HYD002", 1, 17.4440, 78.3936, 28.0, 45),
        bus(3, "HYD003", 2, 17.4065, 78.4691, 35.0, 70),
        bus(4, "HYD004", 2, 17.3986, 78.4567, 30.0, 50),
        bus(5, "HYD005", 3, 17.4239, 78.4128, 40.0, 80),
    ];

    let notifications = vec![
        notice(1, "Bus HYD001 delayed by 10 mins", NotificationCategory::Delay, Some(1)),
        notice(2, "Bus HYD003 overcrowded", NotificationCategory::Crowd, Some(3)),
        notice(3, "Route 218K service resumed", NotificationCategory::Service, None),
    ];

    FleetSeed {
        routes,
        stops,
        buses,
        notifications,
    }
}
