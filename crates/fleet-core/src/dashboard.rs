//! Operator dashboard: per-bus status, per-route efficiency, fleet
//! counters, and canned operator alerts.
//!
//! Everything here is derived from a copy of the fleet; nothing is stored.
//! Thresholds are fixed:
//!
//! | Rule | Condition |
//! |------|-----------|
//! | Offline | no update for more than 10 minutes |
//! | Delayed | speed below 5 |
//! | Overcrowded | occupancy above 90 |
//! | Alerting | delayed, or occupancy above 80 |
//!
//! A route's efficiency is up to 50 points for average speed (full marks at
//! 30) plus up to 50 for average occupancy (full marks at 60). Scores above
//! 70 are `high`, above 40 `medium`, anything else `low`.

use chrono::{DateTime, Duration, Utc};
use fleet_types::{Bus, Notification, NotificationCategory, Route, RouteId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::broadcast::Broadcaster;
use crate::store::StateStore;

/// Minutes without an update after which a bus counts as offline.
pub const OFFLINE_AFTER_MINUTES: i64 = 10;

/// Speed below which a moving bus counts as delayed.
pub const DELAYED_BELOW_SPEED: f64 = 5.0;

/// Occupancy above which a bus counts as overcrowded.
pub const OVERCROWDED_ABOVE: u8 = 90;

/// Occupancy above which a bus raises a dashboard alert.
pub const ALERT_OCCUPANCY_ABOVE: u8 = 80;

/// Average speed that earns the full speed half of the efficiency score.
const TARGET_SPEED: f64 = 30.0;

/// Average occupancy that earns the full occupancy half of the score.
const TARGET_OCCUPANCY: f64 = 60.0;

/// Operational status of one bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BusStatus {
    /// Reporting and moving normally.
    Online,
    /// Reporting but crawling.
    Delayed,
    /// Reporting, moving, and nearly full.
    Overcrowded,
    /// Not heard from recently.
    Offline,
}

impl BusStatus {
    /// Classify a bus as of `now`. Rules are checked in the order
    /// offline, delayed, overcrowded.
    pub fn classify(bus: &Bus, now: DateTime<Utc>) -> Self {
        if now.signed_duration_since(bus.last_updated) > Duration::minutes(OFFLINE_AFTER_MINUTES) {
            Self::Offline
        } else if bus.speed < DELAYED_BELOW_SPEED {
            Self::Delayed
        } else if bus.occupancy > OVERCROWDED_ABOVE {
            Self::Overcrowded
        } else {
            Self::Online
        }
    }
}

/// Coarse efficiency band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EfficiencyClass {
    /// Score of 40 or less.
    Low,
    /// Score above 40, up to 70.
    Medium,
    /// Score above 70.
    High,
}

impl EfficiencyClass {
    /// The band a 0-100 score falls in.
    pub const fn from_score(score: u8) -> Self {
        if score > 70 {
            Self::High
        } else if score > 40 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Efficiency of the buses on one route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteEfficiency {
    /// Whole-number score, 0 to 100.
    pub score: u8,
    /// The band the score falls in.
    pub class: EfficiencyClass,
}

impl RouteEfficiency {
    /// Score a route from the buses running on it. No buses scores 0.
    pub fn of(buses: &[Bus]) -> Self {
        let score = averages(buses).map_or(0, |(speed, occupancy)| {
            let speed_points = (speed / TARGET_SPEED * 50.0).min(50.0);
            let occupancy_points = (occupancy / TARGET_OCCUPANCY * 50.0).min(50.0);
            whole_percent(speed_points + occupancy_points)
        });
        Self {
            score,
            class: EfficiencyClass::from_score(score),
        }
    }
}

/// One bus with its dashboard status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BusStatusEntry {
    /// The bus as stored.
    #[serde(flatten)]
    pub bus: Bus,
    /// Its classification.
    pub status: BusStatus,
}

/// Per-route figures for the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoutePerformance {
    /// Route identifier.
    pub route_id: RouteId,
    /// Public route number.
    #[serde(rename = "route_no")]
    pub route_number: String,
    /// Display name.
    pub route_name: String,
    /// Buses currently assigned.
    pub bus_count: usize,
    /// Average speed, one decimal place.
    pub avg_speed: f64,
    /// Average occupancy, rounded.
    pub avg_occupancy: u8,
    /// Efficiency score and band.
    pub efficiency: RouteEfficiency,
}

/// Everything the operator dashboard shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetOverview {
    /// When the figures were computed.
    pub generated_at: DateTime<Utc>,
    /// Buses whose status is [`BusStatus::Online`].
    pub active_buses: usize,
    /// Routes in the network.
    pub total_routes: usize,
    /// Average occupancy across the fleet, rounded. 0 for an empty fleet.
    pub avg_occupancy: u8,
    /// Buses that are delayed or above the alert occupancy.
    pub active_alerts: usize,
    /// Every bus with its status, in id order.
    pub buses: Vec<BusStatusEntry>,
    /// Every route with its figures, in id order.
    pub routes: Vec<RoutePerformance>,
}

/// Compute the dashboard from a copy of the routes and buses.
pub fn fleet_overview(routes: &[Route], buses: &[Bus], now: DateTime<Utc>) -> FleetOverview {
    let entries: Vec<BusStatusEntry> = buses
        .iter()
        .map(|bus| BusStatusEntry {
            bus: bus.clone(),
            status: BusStatus::classify(bus, now),
        })
        .collect();

    let active_buses = entries
        .iter()
        .filter(|e| e.status == BusStatus::Online)
        .count();
    let active_alerts = entries
        .iter()
        .filter(|e| e.status == BusStatus::Delayed || e.bus.occupancy > ALERT_OCCUPANCY_ABOVE)
        .count();
    let avg_occupancy = averages(buses).map_or(0, |(_, occupancy)| whole_percent(occupancy));

    let performance = routes
        .iter()
        .map(|route| {
            let on_route: Vec<Bus> = buses
                .iter()
                .filter(|b| b.route_id == route.id)
                .cloned()
                .collect();
            let (avg_speed, avg_occupancy) = averages(&on_route).unwrap_or((0.0, 0.0));
            RoutePerformance {
                route_id: route.id,
                route_number: route.route_number.clone(),
                route_name: route.name.clone(),
                bus_count: on_route.len(),
                avg_speed: (avg_speed * 10.0).round() / 10.0,
                avg_occupancy: whole_percent(avg_occupancy),
                efficiency: RouteEfficiency::of(&on_route),
            }
        })
        .collect();

    FleetOverview {
        generated_at: now,
        active_buses,
        total_routes: routes.len(),
        avg_occupancy,
        active_alerts,
        buses: entries,
        routes: performance,
    }
}

/// Mean speed and mean occupancy, or `None` for no buses.
fn averages(buses: &[Bus]) -> Option<(f64, f64)> {
    let count = u32::try_from(buses.len()).ok().filter(|n| *n > 0)?;
    let n = f64::from(count);
    let speed: f64 = buses.iter().map(|b| b.speed).sum();
    let occupancy: f64 = buses.iter().map(|b| f64::from(b.occupancy)).sum();
    Some((speed / n, occupancy / n))
}

/// Round to the nearest whole number within 0..=100.
fn whole_percent(value: f64) -> u8 {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let percent = value.round().clamp(0.0, 100.0) as u8;
    percent
}

// ---------------------------------------------------------------------------
// Operator alerts
// ---------------------------------------------------------------------------

/// Canned alerts an operator can raise from the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorAlert {
    /// Delays across the network.
    Delay,
    /// A bus has broken down.
    Breakdown,
    /// Heavy passenger volume.
    Overcrowding,
}

impl OperatorAlert {
    /// Rider-facing text.
    pub const fn message(self) -> &'static str {
        match self {
            Self::Delay => "Service delays reported on multiple routes",
            Self::Breakdown => "Bus breakdown reported - alternative arrangements in place",
            Self::Overcrowding => "High passenger volume detected - additional buses deployed",
        }
    }

    /// Notification category the alert is filed under.
    pub const fn category(self) -> NotificationCategory {
        match self {
            Self::Delay => NotificationCategory::Delay,
            Self::Breakdown => NotificationCategory::Service,
            Self::Overcrowding => NotificationCategory::Crowd,
        }
    }
}

/// An alert as raised: the stored notification and its fan-out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RaisedAlert {
    /// The notification appended to the store.
    pub notification: Notification,
    /// Subscribers that received it.
    pub delivered: usize,
}

/// Append an operator alert to the store and broadcast it to live viewers.
pub async fn raise_operator_alert(
    store: &StateStore,
    broadcaster: &Broadcaster,
    alert: OperatorAlert,
    now: DateTime<Utc>,
) -> RaisedAlert {
    let notification = store
        .push_notification(alert.message().to_owned(), alert.category(), None, now)
        .await;
    let report = broadcaster.broadcast((&notification).into()).await;
    info!(
        alert = ?alert,
        id = %notification.id,
        delivered = report.delivered,
        "Operator alert raised"
    );
    RaisedAlert {
        notification,
        delivered: report.delivered,
    }
}
