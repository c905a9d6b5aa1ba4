//! HTTP and `WebSocket` transport for the fleet live-tracking engine.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws`) that registers each connection as a
//!   subscriber and forwards every `bus_update` and `notification` event
//! - **REST endpoints** for buses, stops, routes, notifications, nearby
//!   stops, route search, and arrival estimates
//! - **Minimal HTML status page** (`GET /`)
//! - **Operator dashboard** (`GET /admin`, `/api/admin/*`) with per-bus
//!   status, route efficiency, and canned alerts
//!
//! Handlers never touch bus state directly; they go through the shared
//! [`StateStore`](fleet_core::store::StateStore) and
//! [`QueryService`](fleet_core::query::QueryService), so a request only ever
//! waits on a short store read lock.

pub mod admin;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError};
pub use startup::spawn_observer;
pub use state::AppState;
