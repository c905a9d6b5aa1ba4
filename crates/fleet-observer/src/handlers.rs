//! REST API endpoint handlers.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/` | Minimal HTML status page |
//! | `GET` | `/api/buses` | All buses (bare array) |
//! | `GET` | `/api/stops` | All stops |
//! | `GET` | `/api/routes` | All routes |
//! | `GET` | `/api/routes/{id}` | One route with its stops |
//! | `GET` | `/api/arrivals/{stop_id}` | Arrival estimates at a stop |
//! | `GET` | `/api/search_routes` | Routes serving two named stops |
//! | `GET` | `/api/nearby_stops` | Stops near a coordinate |
//! | `GET` | `/api/notifications` | Recent notifications, newest first |

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse};
use chrono::{Local, Utc};
use fleet_core::query::{DEFAULT_NEARBY_RADIUS, QueryError, RouteMatch};
use fleet_types::{GeoPoint, RouteId, StopId};

use crate::error::ObserverError;
use crate::state::AppState;

/// Notifications returned when no `limit` is given.
const DEFAULT_NOTIFICATION_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/search_routes`.
#[derive(Debug, serde::Deserialize)]
pub struct SearchQuery {
    /// Name of one stop.
    pub start: Option<String>,
    /// Name of the other stop.
    pub end: Option<String>,
}

/// Query parameters for `GET /api/nearby_stops`.
#[derive(Debug, serde::Deserialize)]
pub struct NearbyQuery {
    /// Latitude in degrees.
    pub lat: Option<f64>,
    /// Longitude in degrees.
    pub lon: Option<f64>,
    /// Search radius in degrees (default 0.01).
    pub radius: Option<f64>,
}

/// Query parameters for `GET /api/notifications`.
#[derive(Debug, serde::Deserialize)]
pub struct NotificationsQuery {
    /// Maximum number of notifications to return (default 50).
    pub limit: Option<usize>,
}

// ---------------------------------------------------------------------------
// GET / -- minimal HTML status page
// ---------------------------------------------------------------------------

/// Serve a minimal HTML page with live counters and API links.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ticks = state.store.batches_applied();
    let buses = state.store.bus_count().await;
    let routes = state.store.network().route_count();
    let stops = state.store.network().stop_count();
    let subscribers = state.broadcaster.subscriber_count().await;
    let uptime = Utc::now()
        .signed_duration_since(state.started_at)
        .num_seconds();

    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <title>Fleet Tracker</title>
    <style>
        body {{
            background: #0d1117;
            color: #c9d1d9;
            font-family: 'Fira Code', 'Consolas', monospace;
            padding: 2rem;
            max-width: 800px;
            margin: 0 auto;
        }}
        h1 {{ color: #58a6ff; }}
        .metric {{
            display: inline-block;
            background: #161b22;
            border: 1px solid #30363d;
            border-radius: 6px;
            padding: 1rem 1.5rem;
            margin: 0.5rem 0.5rem 0.5rem 0;
            min-width: 120px;
        }}
        .metric .label {{ color: #8b949e; font-size: 0.85rem; }}
        .metric .value {{ color: #58a6ff; font-size: 1.5rem; font-weight: bold; }}
        a {{ color: #58a6ff; text-decoration: none; }}
        ul {{ list-style: none; padding: 0; }}
        li {{ padding: 0.3rem 0; }}
        li::before {{ content: "GET "; color: #7ee787; font-weight: bold; }}
    </style>
</head>
<body>
    <h1>Fleet Tracker</h1>

    <div>
        <div class="metric"><div class="label">Ticks</div><div class="value">{ticks}</div></div>
        <div class="metric"><div class="label">Buses</div><div class="value">{buses}</div></div>
        <div class="metric"><div class="label">Routes</div><div class="value">{routes}</div></div>
        <div class="metric"><div class="label">Stops</div><div class="value">{stops}</div></div>
        <div class="metric"><div class="label">Live viewers</div><div class="value">{subscribers}</div></div>
        <div class="metric"><div class="label">Uptime (s)</div><div class="value">{uptime}</div></div>
    </div>

    <h2>API Endpoints</h2>
    <ul>
        <li><a href="/api/buses">/api/buses</a> -- All buses</li>
        <li><a href="/api/stops">/api/stops</a> -- All stops</li>
        <li><a href="/api/routes">/api/routes</a> -- All routes</li>
        <li><a href="/api/notifications">/api/notifications</a> -- Recent notifications</li>
        <li><a href="/api/nearby_stops?lat=17.385&lon=78.4867">/api/nearby_stops</a> -- Stops near a point</li>
        <li><a href="/api/search_routes?start=Koti&end=Kondapur">/api/search_routes</a> -- Routes serving two stops</li>
        <li><a href="/admin">/admin</a> -- Operator dashboard</li>
    </ul>

    <h2>WebSocket</h2>
    <ul>
        <li style="list-style:none;"><code>ws://host:port/ws</code> -- Live bus positions and notifications</li>
    </ul>
</body>
</html>"#
    ))
}

// ---------------------------------------------------------------------------
// Fleet records
// ---------------------------------------------------------------------------

/// Every bus with its latest position, as a bare JSON array.
pub async fn list_buses(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.store.buses().await)
}

/// Every stop.
pub async fn list_stops(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "stops": state.store.stops() }))
}

/// Every route.
pub async fn list_routes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({ "routes": state.store.routes() }))
}

/// One route with its stops in sequence order.
pub async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let id = RouteId(parse_id(&id_str, "route")?);
    let route = state.store.route(id).map_err(QueryError::from)?;
    let stops = state
        .store
        .network()
        .stops_on(id)
        .into_iter()
        .cloned()
        .collect();
    Ok(Json(RouteMatch { route, stops }))
}

/// Recent notifications, newest first.
pub async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotificationsQuery>,
) -> impl IntoResponse {
    let limit = params.limit.unwrap_or(DEFAULT_NOTIFICATION_LIMIT);
    let notifications = state.store.recent_notifications(limit).await;
    Json(serde_json::json!({
        "count": notifications.len(),
        "notifications": notifications,
    }))
}

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Synthetic arrival estimates for every bus on the stop's route.
///
/// `estimated_arrival` is local wall-clock `HH:MM`; `arrives_at` carries the
/// full UTC timestamp.
pub async fn get_arrivals(
    State(state): State<Arc<AppState>>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, ObserverError> {
    let stop_id = StopId(parse_id(&id_str, "stop")?);
    let estimates = state.queries.estimate_arrivals(stop_id).await?;

    let arrivals: Vec<serde_json::Value> = estimates
        .iter()
        .map(|a| {
            serde_json::json!({
                "bus_id": a.bus_id,
                "bus_number": a.bus_number,
                "route_id": a.route_id,
                "occupancy": a.occupancy,
                "eta_minutes": a.eta_minutes,
                "estimated_arrival": a.estimated_arrival.with_timezone(&Local).format("%H:%M").to_string(),
                "arrives_at": a.estimated_arrival,
            })
        })
        .collect();

    Ok(Json(serde_json::json!({ "arrivals": arrivals })))
}

/// Routes whose stops include both `start` and `end`.
pub async fn search_routes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let start = params.start.unwrap_or_default();
    let end = params.end.unwrap_or_default();
    let routes = state.queries.search_routes(&start, &end)?;
    Ok(Json(serde_json::json!({ "routes": routes })))
}

/// Stops within `radius` degrees of (`lat`, `lon`), nearest first.
pub async fn nearby_stops(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(ObserverError::InvalidQuery(String::from(
            "lat and lon are required",
        )));
    };
    let radius = params.radius.unwrap_or(DEFAULT_NEARBY_RADIUS);
    let stops = state.queries.nearest_stops(GeoPoint::new(lat, lon), radius)?;
    Ok(Json(serde_json::json!({ "stops": stops })))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Parse a numeric path id.
fn parse_id(s: &str, what: &str) -> Result<u32, ObserverError> {
    s.parse()
        .map_err(|e| ObserverError::InvalidQuery(format!("invalid {what} id {s:?}: {e}")))
}
