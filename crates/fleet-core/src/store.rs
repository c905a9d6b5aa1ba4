//! The State Store: the single authoritative copy of fleet state.
//!
//! Routes and stops live in an immutable [`TransitNetwork`] shared without a
//! lock. Buses sit behind one [`RwLock`]; readers always get owned copies, and
//! the only writers are [`StateStore::apply_bus_update`] and
//! [`StateStore::update_fleet`], both of which validate before touching any
//! record so a failed write leaves the store unchanged. Notifications are an
//! append-only log behind their own lock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use fleet_types::{
    Bus, BusId, GeoPoint, Notification, NotificationCategory, NotificationId, Route, RouteId,
    Stop, StopId,
};
use fleet_world::{FleetSeed, MAX_OCCUPANCY, SeededFleet, TransitNetwork, WorldError};
use tokio::sync::RwLock;
use tracing::debug;

/// Errors returned by store operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// No bus with this id.
    #[error("bus {0} not found")]
    BusNotFound(BusId),

    /// No route with this id.
    #[error("route {0} not found")]
    RouteNotFound(RouteId),

    /// No stop with this id.
    #[error("stop {0} not found")]
    StopNotFound(StopId),

    /// The update carried values the store refuses to hold.
    #[error("invalid update for bus {bus}: {reason}")]
    InvalidUpdate {
        /// The bus the update targeted.
        bus: BusId,
        /// What was wrong with it.
        reason: String,
    },
}

/// New dynamic values for one bus.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BusUpdate {
    /// The bus to update.
    pub bus_id: BusId,
    /// New position.
    pub position: GeoPoint,
    /// New speed, non-negative.
    pub speed: f64,
    /// New occupancy, at most 100.
    pub occupancy: u8,
    /// When the values were observed.
    pub timestamp: DateTime<Utc>,
}

impl BusUpdate {
    fn validate(&self) -> Result<(), StoreError> {
        let reason = if !self.position.is_finite() {
            "position is not finite"
        } else if !self.speed.is_finite() || self.speed < 0.0 {
            "speed must be a non-negative number"
        } else if self.occupancy > MAX_OCCUPANCY {
            "occupancy exceeds 100"
        } else {
            return Ok(());
        };
        Err(StoreError::InvalidUpdate {
            bus: self.bus_id,
            reason: reason.to_owned(),
        })
    }

    fn apply_to(&self, bus: &mut Bus) {
        bus.latitude = self.position.latitude;
        bus.longitude = self.position.longitude;
        bus.speed = self.speed;
        bus.occupancy = self.occupancy;
        bus.last_updated = self.timestamp;
    }
}

#[derive(Debug)]
struct NotificationLog {
    entries: Vec<Notification>,
    next_id: NotificationId,
}

/// Shared, concurrency-safe fleet state.
#[derive(Debug)]
pub struct StateStore {
    network: Arc<TransitNetwork>,
    buses: RwLock<BTreeMap<BusId, Bus>>,
    notifications: RwLock<NotificationLog>,
    batches_applied: AtomicU64,
}

impl StateStore {
    /// Create a store from validated seed data.
    pub fn new(fleet: SeededFleet) -> Self {
        let next_id = fleet
            .notifications
            .iter()
            .map(|n| n.id)
            .max()
            .map_or(NotificationId(1), NotificationId::next);
        Self {
            network: Arc::new(fleet.network),
            buses: RwLock::new(fleet.buses.into_iter().map(|b| (b.id, b)).collect()),
            notifications: RwLock::new(NotificationLog {
                entries: fleet.notifications,
                next_id,
            }),
            batches_applied: AtomicU64::new(0),
        }
    }

    /// Validate raw seed records and create a store from them.
    ///
    /// # Errors
    ///
    /// Returns the [`WorldError`] raised by seed validation.
    pub fn from_seed(seed: FleetSeed) -> Result<Self, WorldError> {
        Ok(Self::new(seed.build()?))
    }

    // -----------------------------------------------------------------------
    // Routes and stops (immutable, no lock)
    // -----------------------------------------------------------------------

    /// The immutable route network.
    pub fn network(&self) -> &TransitNetwork {
        &self.network
    }

    /// Copies of all routes in id order.
    pub fn routes(&self) -> Vec<Route> {
        self.network.routes().cloned().collect()
    }

    /// Copies of all stops in id order.
    pub fn stops(&self) -> Vec<Stop> {
        self.network.stops().cloned().collect()
    }

    /// A copy of one route.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::RouteNotFound`] for an unknown id.
    pub fn route(&self, id: RouteId) -> Result<Route, StoreError> {
        self.network
            .route(id)
            .cloned()
            .ok_or(StoreError::RouteNotFound(id))
    }

    /// A copy of one stop.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::StopNotFound`] for an unknown id.
    pub fn stop(&self, id: StopId) -> Result<Stop, StoreError> {
        self.network
            .stop(id)
            .cloned()
            .ok_or(StoreError::StopNotFound(id))
    }

    // -----------------------------------------------------------------------
    // Buses
    // -----------------------------------------------------------------------

    /// A consistent copy of every bus, in id order.
    pub async fn buses(&self) -> Vec<Bus> {
        self.buses.read().await.values().cloned().collect()
    }

    /// A copy of one bus.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BusNotFound`] for an unknown id.
    pub async fn bus(&self, id: BusId) -> Result<Bus, StoreError> {
        self.buses
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(StoreError::BusNotFound(id))
    }

    /// Copies of the buses assigned to a route.
    pub async fn buses_on_route(&self, route: RouteId) -> Vec<Bus> {
        self.buses
            .read()
            .await
            .values()
            .filter(|b| b.route_id == route)
            .cloned()
            .collect()
    }

    /// Number of buses.
    pub async fn bus_count(&self) -> usize {
        self.buses.read().await.len()
    }

    /// Number of fleet-wide update batches committed so far.
    pub fn batches_applied(&self) -> u64 {
        self.batches_applied.load(Ordering::Relaxed)
    }

    /// Replace one bus's dynamic fields atomically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BusNotFound`] for an unknown bus or
    /// [`StoreError::InvalidUpdate`] for out-of-range values. The store is
    /// unchanged on error.
    pub async fn apply_bus_update(&self, update: BusUpdate) -> Result<Bus, StoreError> {
        update.validate()?;
        let mut buses = self.buses.write().await;
        let bus = buses
            .get_mut(&update.bus_id)
            .ok_or(StoreError::BusNotFound(update.bus_id))?;
        update.apply_to(bus);
        Ok(bus.clone())
    }

    /// Read every bus, compute a batch of updates, and commit it, all under
    /// one write lock.
    ///
    /// `plan` sees the prior state of the whole fleet. Every update is
    /// validated before any is written, so either the whole batch lands or
    /// nothing does. Returns the post-commit fleet in id order.
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError`] found in the batch.
    pub async fn update_fleet<F>(&self, plan: F) -> Result<Vec<Bus>, StoreError>
    where
        F: FnOnce(&[Bus]) -> Vec<BusUpdate>,
    {
        let mut buses = self.buses.write().await;
        let prior: Vec<Bus> = buses.values().cloned().collect();
        let updates = plan(&prior);

        for update in &updates {
            update.validate()?;
            if !buses.contains_key(&update.bus_id) {
                return Err(StoreError::BusNotFound(update.bus_id));
            }
        }
        for update in &updates {
            if let Some(bus) = buses.get_mut(&update.bus_id) {
                update.apply_to(bus);
            }
        }

        self.batches_applied.fetch_add(1, Ordering::Relaxed);
        debug!(updated = updates.len(), "Fleet batch committed");
        Ok(buses.values().cloned().collect())
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// All notifications, oldest first.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.notifications.read().await.entries.clone()
    }

    /// Up to `limit` notifications, newest first.
    pub async fn recent_notifications(&self, limit: usize) -> Vec<Notification> {
        self.notifications
            .read()
            .await
            .entries
            .iter()
            .rev()
            .take(limit)
            .cloned()
            .collect()
    }

    /// Append a notification and return it with its assigned id.
    pub async fn push_notification(
        &self,
        message: String,
        category: NotificationCategory,
        bus_id: Option<BusId>,
        timestamp: DateTime<Utc>,
    ) -> Notification {
        let mut log = self.notifications.write().await;
        let notification = Notification {
            id: log.next_id,
            message,
            category,
            bus_id,
            timestamp,
        };
        log.next_id = log.next_id.next();
        log.entries.push(notification.clone());
        notification
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::AtomicBool;

    use fleet_world::create_starting_fleet;

    use super::*;

    fn store() -> StateStore {
        StateStore::from_seed(create_starting_fleet()).unwrap()
    }

    fn update(bus: u32, occupancy: u8) -> BusUpdate {
        BusUpdate {
            bus_id: BusId(bus),
            position: GeoPoint::new(17.40, 78.45),
            speed: 12.0,
            occupancy,
            timestamp: Utc::now(),
        }
    }

    /// Every field of every bus set from one batch number.
    fn marked_batch(prior: &[Bus], k: u8) -> Vec<BusUpdate> {
        prior
            .iter()
            .map(|b| BusUpdate {
                bus_id: b.id,
                position: marked_point(k),
                speed: f64::from(k),
                occupancy: k,
                timestamp: DateTime::from_timestamp(i64::from(k), 0).unwrap(),
            })
            .collect()
    }

    fn marked_point(k: u8) -> GeoPoint {
        GeoPoint::new(17.3 + f64::from(k) / 1000.0, 78.4 + f64::from(k) / 1000.0)
    }

    /// The batch number a snapshot was taken from. Fails if the buses
    /// disagree.
    fn batch_of(buses: &[Bus]) -> u8 {
        let k = buses.first().unwrap().occupancy;
        for bus in buses {
            assert_eq!(bus.occupancy, k, "{buses:?}");
            assert_eq!(bus.speed.to_bits(), f64::from(k).to_bits(), "{buses:?}");
            assert_eq!(bus.position(), marked_point(k));
            assert_eq!(bus.last_updated.timestamp(), i64::from(k));
        }
        k
    }

    #[tokio::test]
    async fn reads_are_copies_in_id_order() {
        let store = store();
        let mut buses = store.buses().await;
        let ids: Vec<BusId> = buses.iter().map(|b| b.id).collect();
        assert_eq!(ids, (1..=5).map(BusId).collect::<Vec<_>>());

        if let Some(bus) = buses.first_mut() {
            bus.occupancy = 0;
        }
        assert_eq!(store.bus(BusId(1)).await.map(|b| b.occupancy), Ok(60));
    }

    #[tokio::test]
    async fn apply_bus_update_replaces_all_dynamic_fields() {
        let store = store();
        let upd = update(2, 99);
        store.apply_bus_update(upd).await.unwrap();

        let bus = store.bus(BusId(2)).await.unwrap();
        assert_eq!(bus.position(), upd.position);
        assert_eq!(bus.occupancy, 99);
        assert_eq!(bus.last_updated, upd.timestamp);
    }

    #[tokio::test]
    async fn unknown_bus_is_not_found() {
        let store = store();
        assert_eq!(
            store.apply_bus_update(update(42, 10)).await,
            Err(StoreError::BusNotFound(BusId(42)))
        );
        assert_eq!(store.bus(BusId(42)).await, Err(StoreError::BusNotFound(BusId(42))));
    }

    #[tokio::test]
    async fn invalid_update_leaves_bus_untouched() {
        let store = store();
        let before = store.bus(BusId(1)).await;
        let result = store.apply_bus_update(update(1, 101)).await;
        assert!(matches!(result, Err(StoreError::InvalidUpdate { .. })));
        assert_eq!(store.bus(BusId(1)).await, before);
    }

    #[tokio::test]
    async fn failed_batch_writes_nothing() {
        let store = store();
        let before = store.buses().await;
        let result = store
            .update_fleet(|_| vec![update(1, 10), update(2, 20), update(77, 30)])
            .await;
        assert_eq!(result, Err(StoreError::BusNotFound(BusId(77))));
        assert_eq!(store.buses().await, before);
        assert_eq!(store.batches_applied(), 0);
    }

    #[tokio::test]
    async fn batch_sees_prior_state_and_commits_together() {
        let store = store();
        let after = store
            .update_fleet(|prior| {
                prior
                    .iter()
                    .map(|b| BusUpdate {
                        bus_id: b.id,
                        position: b.position(),
                        speed: b.speed,
                        occupancy: b.occupancy.saturating_add(1).min(MAX_OCCUPANCY),
                        timestamp: b.last_updated,
                    })
                    .collect()
            })
            .await
            .unwrap();
        let occupancy: Vec<u8> = after.iter().map(|b| b.occupancy).collect();
        assert_eq!(occupancy, vec![61, 46, 71, 51, 81]);
        assert_eq!(store.buses().await, after);
        assert_eq!(store.batches_applied(), 1);
    }

    #[tokio::test]
    async fn route_and_stop_lookups() {
        let store = store();
        assert_eq!(store.routes().len(), 5);
        assert_eq!(store.stops().len(), 8);
        assert!(store.route(RouteId(1)).is_ok());
        assert_eq!(store.route(RouteId(9)), Err(StoreError::RouteNotFound(RouteId(9))));
        assert_eq!(store.stop(StopId(9)), Err(StoreError::StopNotFound(StopId(9))));
        assert_eq!(store.buses_on_route(RouteId(2)).await.len(), 2);
        assert!(store.buses_on_route(RouteId(4)).await.is_empty());
    }

    #[tokio::test]
    async fn notifications_append_with_fresh_ids() {
        let store = store();
        let pushed = store
            .push_notification(
                String::from("Bus HYD002 is experiencing delays"),
                NotificationCategory::Delay,
                Some(BusId(2)),
                Utc::now(),
            )
            .await;
        assert_eq!(pushed.id, NotificationId(4));
        assert_eq!(store.notifications().await.len(), 4);

        let recent = store.recent_notifications(2).await;
        let ids: Vec<NotificationId> = recent.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![NotificationId(4), NotificationId(3)]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_readers_only_see_whole_batches() {
        let store = Arc::new(store());
        store.update_fleet(|prior| marked_batch(prior, 0)).await.unwrap();
        let done = Arc::new(AtomicBool::new(false));

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                let done = Arc::clone(&done);
                tokio::spawn(async move {
                    let mut last = 0;
                    let mut reads: u32 = 0;
                    loop {
                        let k = batch_of(&store.buses().await);
                        assert!(k >= last, "batch went backwards: {last} -> {k}");
                        last = k;
                        reads = reads.saturating_add(1);
                        if done.load(Ordering::Acquire) {
                            break reads;
                        }
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for k in 1..=MAX_OCCUPANCY {
            store.update_fleet(|prior| marked_batch(prior, k)).await.unwrap();
            tokio::task::yield_now().await;
        }
        done.store(true, Ordering::Release);

        for reader in readers {
            assert!(reader.await.unwrap() > 0);
        }
        assert_eq!(batch_of(&store.buses().await), MAX_OCCUPANCY);
        assert_eq!(store.batches_applied(), 101);
    }
}
