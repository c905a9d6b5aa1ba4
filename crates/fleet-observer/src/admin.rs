//! Operator dashboard endpoints.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/admin` | HTML fleet dashboard |
//! | `GET` | `/api/admin/overview` | Bus statuses, route efficiency, fleet counters |
//! | `POST` | `/api/admin/alerts` | Raise a canned operator alert |

use std::fmt::Write as _;
use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use chrono::{Local, Utc};
use fleet_core::dashboard::{self, FleetOverview, OperatorAlert};

use crate::state::AppState;

/// Request body for `POST /api/admin/alerts`.
#[derive(Debug, serde::Deserialize)]
pub struct AlertRequest {
    /// Which canned alert to raise: `delay`, `breakdown`, or `overcrowding`.
    #[serde(rename = "type")]
    pub kind: OperatorAlert,
}

// ---------------------------------------------------------------------------
// GET /api/admin/overview
// ---------------------------------------------------------------------------

/// Dashboard figures for the fleet as it stands now.
pub async fn overview(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.queries.fleet_overview(Utc::now()).await)
}

// ---------------------------------------------------------------------------
// POST /api/admin/alerts
// ---------------------------------------------------------------------------

/// Store a canned alert and push it to every live viewer.
pub async fn raise_alert(
    State(state): State<Arc<AppState>>,
    Json(request): Json<AlertRequest>,
) -> impl IntoResponse {
    let raised =
        dashboard::raise_operator_alert(&state.store, &state.broadcaster, request.kind, Utc::now())
            .await;
    (StatusCode::CREATED, Json(raised))
}

// ---------------------------------------------------------------------------
// GET /admin
// ---------------------------------------------------------------------------

/// Server-rendered fleet dashboard.
pub async fn dashboard_page(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let overview = state.queries.fleet_overview(Utc::now()).await;
    Html(render_dashboard(&overview))
}

fn render_dashboard(overview: &FleetOverview) -> String {
    let mut bus_rows = String::new();
    for entry in &overview.buses {
        let bus = &entry.bus;
        let status = format!("{:?}", entry.status);
        let _ = write!(
            bus_rows,
            r#"<tr><td>{number}</td><td>{route}</td><td>{speed:.1} km/h</td><td>{occupancy}%</td><td class="{class}">{status}</td><td>{updated}</td></tr>"#,
            number = escape(&bus.bus_number),
            route = bus.route_id,
            speed = bus.speed,
            occupancy = bus.occupancy,
            class = status.to_lowercase(),
            updated = bus.last_updated.with_timezone(&Local).format("%H:%M:%S"),
        );
    }

    let mut route_rows = String::new();
    for route in &overview.routes {
        let _ = write!(
            route_rows,
            r#"<tr><td>{number}</td><td>{name}</td><td>{count}</td><td>{speed:.1} km/h</td><td>{occupancy}%</td><td class="{class:?}">{score}%</td></tr>"#,
            number = escape(&route.route_number),
            name = escape(&route.route_name),
            count = route.bus_count,
            speed = route.avg_speed,
            occupancy = route.avg_occupancy,
            class = route.efficiency.class,
            score = route.efficiency.score,
        );
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Fleet Tracker Admin</title>
    <style>
        body {{ background: #0d1117; color: #c9d1d9; font-family: 'Fira Code', 'Consolas', monospace; padding: 2rem; }}
        h1, h2 {{ color: #58a6ff; }}
        table {{ border-collapse: collapse; margin-bottom: 2rem; }}
        th, td {{ border: 1px solid #30363d; padding: 0.4rem 0.8rem; text-align: left; }}
        .offline, .Low {{ color: #f85149; }}
        .delayed, .overcrowded, .Medium {{ color: #d29922; }}
        .online, .High {{ color: #7ee787; }}
    </style>
</head>
<body>
    <h1>Fleet Admin</h1>
    <p>Active buses: {active} &middot; Routes: {routes} &middot; Avg occupancy: {occupancy}% &middot; Alerts: {alerts}</p>

    <h2>Fleet</h2>
    <table>
        <tr><th>Bus</th><th>Route</th><th>Speed</th><th>Occupancy</th><th>Status</th><th>Last update</th></tr>
        {bus_rows}
    </table>

    <h2>Route performance</h2>
    <table>
        <tr><th>Route</th><th>Name</th><th>Buses</th><th>Avg speed</th><th>Avg occupancy</th><th>Efficiency</th></tr>
        {route_rows}
    </table>

    <p>Raise an alert with <code>POST /api/admin/alerts</code> and a body of
    <code>{{"type": "delay" | "breakdown" | "overcrowding"}}</code>.</p>
</body>
</html>"#,
        active = overview.active_buses,
        routes = overview.total_routes,
        occupancy = overview.avg_occupancy,
        alerts = overview.active_alerts,
    )
}

/// Escape text for an HTML element body.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
