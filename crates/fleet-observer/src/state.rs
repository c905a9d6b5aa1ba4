//! Shared application state for the HTTP server.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_core::broadcast::{Broadcaster, Subscription};
use fleet_core::config::ArrivalConfig;
use fleet_core::query::QueryService;
use fleet_core::store::StateStore;

/// Everything a handler needs, shared behind an [`Arc`].
#[derive(Debug)]
pub struct AppState {
    /// The authoritative fleet state.
    pub store: Arc<StateStore>,
    /// The live subscriber registry.
    pub broadcaster: Arc<Broadcaster>,
    /// Read-only queries over the store.
    pub queries: QueryService,
    /// When the server state was created.
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Create the shared state.
    pub fn new(
        store: Arc<StateStore>,
        broadcaster: Arc<Broadcaster>,
        arrivals: ArrivalConfig,
    ) -> Self {
        Self {
            queries: QueryService::new(Arc::clone(&store), arrivals),
            store,
            broadcaster,
            started_at: Utc::now(),
        }
    }

    /// Register a new live subscriber.
    pub async fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe().await
    }
}
