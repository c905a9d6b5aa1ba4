//! Integration tests for the HTTP API.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. This validates handler logic and routing
//! without needing a live network connection.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use chrono::{Duration, Utc};
use fleet_core::broadcast::Broadcaster;
use fleet_core::config::{ArrivalConfig, BroadcastConfig};
use fleet_core::store::{BusUpdate, StateStore};
use fleet_observer::router::build_router;
use fleet_observer::state::AppState;
use fleet_types::{BusId, GeoPoint, LiveEvent, NotificationCategory};
use fleet_world::create_starting_fleet;
use serde_json::Value;
use tower::ServiceExt;

fn make_test_state() -> Arc<AppState> {
    let store = Arc::new(StateStore::from_seed(create_starting_fleet()).unwrap());
    let broadcaster = Arc::new(Broadcaster::new(&BroadcastConfig::default()));
    Arc::new(AppState::new(store, broadcaster, ArrivalConfig::default()))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn post_json(state: Arc<AppState>, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = build_router(state)
        .oneshot(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_owned()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

async fn set_bus(state: &AppState, id: u32, speed: f64, occupancy: u8, minutes_ago: i64) {
    let bus = state.store.bus(BusId(id)).await.unwrap();
    let update = BusUpdate {
        bus_id: bus.id,
        position: GeoPoint::new(bus.latitude, bus.longitude),
        speed,
        occupancy,
        timestamp: Utc::now()
            .checked_sub_signed(Duration::minutes(minutes_ago))
            .unwrap(),
    };
    state.store.apply_bus_update(update).await.unwrap();
}

// =========================================================================
// Tests
// =========================================================================

#[tokio::test]
async fn test_index_returns_html() {
    let state = make_test_state();
    let response = build_router(state)
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(content_type.contains("text/html"));
}

#[tokio::test]
async fn test_list_buses_is_bare_array() {
    let (status, json) = get(make_test_state(), "/api/buses").await;

    assert_eq!(status, StatusCode::OK);
    let buses = json.as_array().unwrap();
    assert_eq!(buses.len(), 5);
    assert_eq!(buses[0]["bus_number"], "HYD001");
    assert!(buses[0]["last_updated"].is_string());
}

#[tokio::test]
async fn test_list_stops_and_routes() {
    let state = make_test_state();

    let (status, json) = get(Arc::clone(&state), "/api/stops").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["stops"].as_array().unwrap().len(), 8);
    assert_eq!(json["stops"][0]["stop_name"], "Koti");

    let (status, json) = get(state, "/api/routes").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["routes"].as_array().unwrap().len(), 5);
    assert_eq!(json["routes"][0]["route_no"], "218K");
}

#[tokio::test]
async fn test_get_route_with_stops() {
    let (status, json) = get(make_test_state(), "/api/routes/2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["route_no"], "8C");
    assert_eq!(json["stop_details"].as_array().unwrap().len(), 4);
    assert_eq!(json["stop_details"][3]["stop_name"], "Mehdipatnam");
}

#[tokio::test]
async fn test_get_route_not_found() {
    let (status, json) = get(make_test_state(), "/api/routes/99").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
    assert!(json["error"].as_str().unwrap().contains("route 99"));
}

#[tokio::test]
async fn test_get_route_bad_id() {
    let (status, json) = get(make_test_state(), "/api/routes/abc").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_arrivals_one_per_bus_on_route() {
    // Stop 6 (Lakdikapul) is on route 8C, served by HYD003 and HYD004.
    let (status, json) = get(make_test_state(), "/api/arrivals/6").await;

    assert_eq!(status, StatusCode::OK);
    let arrivals = json["arrivals"].as_array().unwrap();
    assert_eq!(arrivals.len(), 2);
    for a in arrivals {
        let eta = a["eta_minutes"].as_u64().unwrap();
        assert!((2..=15).contains(&eta));
        let clock = a["estimated_arrival"].as_str().unwrap();
        assert_eq!(clock.len(), 5);
        assert_eq!(clock.chars().nth(2), Some(':'));
        assert!(a["occupancy"].is_u64());
    }
}

#[tokio::test]
async fn test_arrivals_unknown_stop() {
    let (status, json) = get(make_test_state(), "/api/arrivals/404").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["status"], 404);
}

#[tokio::test]
async fn test_search_routes_ignores_case() {
    let state = make_test_state();

    let (status, json) = get(Arc::clone(&state), "/api/search_routes?start=Koti&end=Kondapur").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["routes"].as_array().unwrap().len(), 1);
    assert_eq!(json["routes"][0]["route_no"], "218K");
    assert_eq!(json["routes"][0]["path"].as_array().unwrap().len(), 4);

    let (_, shouted) = get(state, "/api/search_routes?start=koti&end=KONDAPUR").await;
    assert_eq!(shouted, json);
}

#[tokio::test]
async fn test_search_routes_requires_names() {
    let (status, json) = get(make_test_state(), "/api/search_routes?start=Koti").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn test_nearby_stops_sorted_within_radius() {
    let (status, json) =
        get(make_test_state(), "/api/nearby_stops?lat=17.4375&lon=78.4483&radius=0.05").await;

    assert_eq!(status, StatusCode::OK);
    let stops = json["stops"].as_array().unwrap();
    assert!(!stops.is_empty());
    assert_eq!(stops[0]["stop_name"], "Ameerpet");

    let distances: Vec<f64> = stops
        .iter()
        .map(|s| s["distance_sq"].as_f64().unwrap())
        .collect();
    assert!(distances.windows(2).all(|w| w[0] <= w[1]));
    assert!(distances.iter().all(|d| *d < 0.05 * 0.05));
}

#[tokio::test]
async fn test_nearby_stops_default_radius() {
    let (status, json) = get(make_test_state(), "/api/nearby_stops?lat=17.3850&lon=78.4867").await;

    assert_eq!(status, StatusCode::OK);
    let stops = json["stops"].as_array().unwrap();
    assert_eq!(stops.len(), 1);
    assert_eq!(stops[0]["stop_name"], "Koti");
}

#[tokio::test]
async fn test_nearby_stops_rejects_bad_input() {
    let state = make_test_state();

    let (status, _) = get(Arc::clone(&state), "/api/nearby_stops?lat=17.38&lon=78.48&radius=-1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = get(state, "/api/nearby_stops?lon=78.48").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().contains("lat"));
}

#[tokio::test]
async fn test_notifications_newest_first() {
    let state = make_test_state();
    state
        .store
        .push_notification(
            String::from("Bus HYD005 is overcrowded"),
            NotificationCategory::Crowd,
            Some(BusId(5)),
            Utc::now(),
        )
        .await;

    let (status, json) = get(state, "/api/notifications?limit=2").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 2);
    assert_eq!(json["notifications"][0]["id"], 4);
    assert_eq!(json["notifications"][0]["type"], "crowd");
    assert_eq!(json["notifications"][1]["id"], 3);
}

#[tokio::test]
async fn test_responses_are_gzipped_on_request() {
    let response = build_router(make_test_state())
        .oneshot(
            Request::get("/api/stops")
                .header("accept-encoding", "gzip")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-encoding").unwrap(),
        "gzip"
    );
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let response = build_router(make_test_state())
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_overview_classifies_every_status_and_band() {
    let state = make_test_state();
    set_bus(&state, 1, 2.0, 60, 0).await; // delayed
    set_bus(&state, 2, 30.0, 95, 0).await; // overcrowded
    set_bus(&state, 3, 20.0, 30, 20).await; // offline
    set_bus(&state, 4, 20.0, 30, 0).await; // online
    set_bus(&state, 5, 6.0, 12, 0).await; // online, slow route

    let (status, json) = get(state, "/api/admin/overview").await;
    assert_eq!(status, StatusCode::OK);

    let statuses: Vec<&str> = json["buses"]
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["delayed", "overcrowded", "offline", "online", "online"]);
    assert_eq!(json["active_buses"], 2);
    assert_eq!(json["active_alerts"], 2);
    assert_eq!(json["avg_occupancy"], 45);
    assert_eq!(json["total_routes"], 5);

    let routes = json["routes"].as_array().unwrap();
    assert_eq!(routes[0]["efficiency"], serde_json::json!({ "score": 77, "class": "high" }));
    assert_eq!(routes[1]["efficiency"], serde_json::json!({ "score": 58, "class": "medium" }));
    assert_eq!(routes[2]["efficiency"], serde_json::json!({ "score": 20, "class": "low" }));
    assert_eq!(routes[3]["bus_count"], 0);
    assert_eq!(routes[3]["efficiency"]["class"], "low");
}

#[tokio::test]
async fn test_admin_alert_is_stored_and_pushed_live() {
    let state = make_test_state();
    let mut sub = state.subscribe().await;

    let (status, json) =
        post_json(Arc::clone(&state), "/api/admin/alerts", r#"{"type":"overcrowding"}"#).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["delivered"], 1);
    assert_eq!(json["notification"]["type"], "crowd");
    assert_eq!(
        json["notification"]["message"],
        "High passenger volume detected - additional buses deployed"
    );
    assert!(matches!(sub.try_recv().as_deref(), Some(LiveEvent::Notification { .. })));

    let (_, listed) = get(state, "/api/notifications?limit=1").await;
    assert_eq!(listed["notifications"][0]["id"], json["notification"]["id"]);
}

#[tokio::test]
async fn test_admin_alert_rejects_unknown_type() {
    let state = make_test_state();
    let (status, _) = post_json(Arc::clone(&state), "/api/admin/alerts", r#"{"type":"meteor"}"#).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(state.store.notifications().await.len(), 3);
}

#[tokio::test]
async fn test_admin_page_lists_the_fleet() {
    let response = build_router(make_test_state())
        .oneshot(Request::get("/admin").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("HYD005"));
    assert!(html.contains("218K"));
    assert!(html.contains("Route performance"));
}
