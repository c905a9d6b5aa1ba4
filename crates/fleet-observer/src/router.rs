//! Axum router construction.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with open CORS, request tracing, and gzip compression.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::admin;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- minimal HTML status page
/// - `GET /ws` -- `WebSocket` live feed
/// - `GET /api/buses` -- all buses
/// - `GET /api/stops` -- all stops
/// - `GET /api/routes` -- all routes
/// - `GET /api/routes/{id}` -- single route with stops
/// - `GET /api/arrivals/{stop_id}` -- arrival estimates
/// - `GET /api/search_routes` -- route search by stop names
/// - `GET /api/nearby_stops` -- stops near a coordinate
/// - `GET /api/notifications` -- recent notifications
/// - `GET /admin` -- operator dashboard page
/// - `GET /api/admin/overview` -- bus statuses and route efficiency
/// - `POST /api/admin/alerts` -- raise an operator alert
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Status page
        .route("/", get(handlers::index))
        // WebSocket
        .route("/ws", get(ws::ws_live))
        // REST API
        .route("/api/buses", get(handlers::list_buses))
        .route("/api/stops", get(handlers::list_stops))
        .route("/api/routes", get(handlers::list_routes))
        .route("/api/routes/{id}", get(handlers::get_route))
        .route("/api/arrivals/{stop_id}", get(handlers::get_arrivals))
        .route("/api/search_routes", get(handlers::search_routes))
        .route("/api/nearby_stops", get(handlers::nearby_stops))
        .route("/api/notifications", get(handlers::list_notifications))
        // Operator dashboard
        .route("/admin", get(admin::dashboard_page))
        .route("/api/admin/overview", get(admin::overview))
        .route("/api/admin/alerts", post(admin::raise_alert))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
