//! The position simulator: one tick of the fleet random walk.
//!
//! A tick runs in three steps:
//!
//! 1. **Move** -- under one store write lock, read the whole fleet, plan a
//!    jittered update for every bus from that single prior state, and commit
//!    the batch ([`plan_tick`], [`StateStore::update_fleet`]).
//!
//! 2. **Publish** -- wrap the committed fleet in a [`FleetSnapshot`] and hand
//!    it straight to the [`Broadcaster`] as a `bus_update` event.
//!
//! 3. **Notify** -- with the configured probability, append one synthetic
//!    delay or crowding notice to the store and broadcast it after the
//!    snapshot.
//!
//! The walk is a bounded random perturbation, not a model of real motion.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use fleet_types::{Bus, BusId, GeoPoint, LiveEvent, Notification, NotificationCategory};
use fleet_world::MAX_OCCUPANCY;
use rand::distr::uniform::Error as RangeError;
use rand::distr::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::broadcast::Broadcaster;
use crate::config::SimulationConfig;
use crate::store::{BusUpdate, StateStore, StoreError};

/// Errors that can occur during tick execution.
#[derive(Debug, thiserror::Error)]
pub enum TickError {
    /// The store rejected the tick's batch.
    #[error("store error: {source}")]
    Store {
        /// The underlying store error.
        #[from]
        source: StoreError,
    },

    /// A jitter bound does not describe a finite sampling range.
    #[error("invalid {name} jitter {bound}: {source}")]
    Jitter {
        /// Which jitter bound was rejected.
        name: &'static str,
        /// The rejected bound.
        bound: f64,
        /// Why the range could not be built.
        source: RangeError,
    },
}

/// The numeric knobs of the random walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulationParams {
    /// Per-axis position jitter bound, degrees.
    pub position_jitter: f64,
    /// Speed jitter bound.
    pub speed_jitter: f64,
    /// Occupancy jitter bound, percentage points.
    pub occupancy_jitter: u8,
    /// Chance per tick of a synthetic notification.
    pub notification_probability: f64,
    /// Occupancy at which a notice reports crowding.
    pub crowding_threshold: u8,
}

impl From<&SimulationConfig> for SimulationParams {
    fn from(config: &SimulationConfig) -> Self {
        Self {
            position_jitter: config.position_jitter_degrees,
            speed_jitter: config.speed_jitter,
            occupancy_jitter: config.occupancy_jitter,
            notification_probability: config.notification_probability,
            crowding_threshold: config.crowding_threshold,
        }
    }
}

impl SimulationParams {
    /// Check that every float jitter bound can be sampled.
    ///
    /// # Errors
    ///
    /// Returns [`TickError::Jitter`] for a bound whose range `[-b, b]` is
    /// not finite.
    pub fn check(&self) -> Result<(), TickError> {
        for (name, bound) in [
            ("position", self.position_jitter),
            ("speed", self.speed_jitter),
        ] {
            if bound > 0.0 {
                Uniform::new_inclusive(-bound, bound)
                    .map_err(|source| TickError::Jitter { name, bound, source })?;
            }
        }
        Ok(())
    }
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self::from(&SimulationConfig::default())
    }
}

/// Plan one bus's next state from its current state.
pub fn plan_bus_update(
    bus: &Bus,
    params: &SimulationParams,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> BusUpdate {
    let position = GeoPoint::new(
        bus.latitude + symmetric(rng, params.position_jitter),
        bus.longitude + symmetric(rng, params.position_jitter),
    );
    let speed = (bus.speed + symmetric(rng, params.speed_jitter)).max(0.0);

    let bound = i16::from(params.occupancy_jitter);
    let delta = rng.random_range(-bound..=bound);
    let occupancy = i16::from(bus.occupancy)
        .saturating_add(delta)
        .clamp(0, i16::from(MAX_OCCUPANCY));

    BusUpdate {
        bus_id: bus.id,
        position,
        speed,
        occupancy: u8::try_from(occupancy).unwrap_or(MAX_OCCUPANCY),
        timestamp: now,
    }
}

/// Plan a whole tick. Every update is computed from `prior` alone.
pub fn plan_tick(
    prior: &[Bus],
    params: &SimulationParams,
    rng: &mut impl Rng,
    now: DateTime<Utc>,
) -> Vec<BusUpdate> {
    prior
        .iter()
        .map(|bus| plan_bus_update(bus, params, rng, now))
        .collect()
}

/// Uniform value in `[-bound, bound]`; zero when that range is empty or
/// not finite.
fn symmetric(rng: &mut impl Rng, bound: f64) -> f64 {
    if bound > 0.0 {
        Uniform::new_inclusive(-bound, bound).map_or(0.0, |range| range.sample(rng))
    } else {
        0.0
    }
}

/// Immutable copy of the fleet taken right after a tick commits.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetSnapshot {
    tick: u64,
    taken_at: DateTime<Utc>,
    buses: Vec<Bus>,
}

impl FleetSnapshot {
    /// Wrap a committed fleet.
    pub const fn new(tick: u64, taken_at: DateTime<Utc>, buses: Vec<Bus>) -> Self {
        Self {
            tick,
            taken_at,
            buses,
        }
    }

    /// The tick that produced this snapshot.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// When the tick committed.
    pub const fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }

    /// Buses in id order.
    pub fn buses(&self) -> &[Bus] {
        &self.buses
    }

    /// The `bus_update` event for this snapshot.
    pub fn to_event(&self) -> LiveEvent {
        LiveEvent::bus_update(&self.buses)
    }
}

/// Summary of a completed tick.
#[derive(Debug, Clone)]
pub struct TickSummary {
    /// The tick number that was executed.
    pub tick: u64,
    /// The fleet as committed by this tick.
    pub snapshot: FleetSnapshot,
    /// The synthetic notification emitted this tick, if any.
    pub notification: Option<Notification>,
    /// Successful deliveries across this tick's broadcasts.
    pub delivered: usize,
    /// Subscribers dropped during this tick's broadcasts.
    pub dropped: usize,
}

/// Drives the random walk against a shared store and broadcaster.
#[derive(Debug)]
pub struct Simulator {
    store: Arc<StateStore>,
    broadcaster: Arc<Broadcaster>,
    params: SimulationParams,
    rng: StdRng,
    tick: u64,
}

impl Simulator {
    /// Create a simulator. Uses `config.seed` when set, OS entropy otherwise.
    pub fn new(
        store: Arc<StateStore>,
        broadcaster: Arc<Broadcaster>,
        config: &SimulationConfig,
    ) -> Self {
        let rng = config
            .seed
            .map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);
        Self::with_rng(store, broadcaster, SimulationParams::from(config), rng)
    }

    /// Create a simulator with explicit parameters and random source.
    pub const fn with_rng(
        store: Arc<StateStore>,
        broadcaster: Arc<Broadcaster>,
        params: SimulationParams,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            broadcaster,
            params,
            rng,
            tick: 0,
        }
    }

    /// Number of ticks attempted so far.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The walk parameters in use.
    pub const fn params(&self) -> &SimulationParams {
        &self.params
    }

    /// Execute one tick: move, publish, maybe notify.
    ///
    /// # Errors
    ///
    /// Returns [`TickError`] if a jitter bound is unusable or the store
    /// rejects the batch. Nothing is written or broadcast in that case.
    pub async fn run_tick(&mut self) -> Result<TickSummary, TickError> {
        self.tick = self.tick.saturating_add(1);
        let tick = self.tick;
        let now = Utc::now();
        self.params.check()?;

        // --- Move ---
        let params = self.params;
        let rng = &mut self.rng;
        let buses = self
            .store
            .update_fleet(|prior| plan_tick(prior, &params, rng, now))
            .await?;

        // --- Publish ---
        let snapshot = FleetSnapshot::new(tick, now, buses);
        let report = self.broadcaster.broadcast(snapshot.to_event()).await;
        let mut delivered = report.delivered;
        let mut dropped = report.dropped.len();

        // --- Notify ---
        let notification = match self.roll_notification(snapshot.buses()) {
            Some((message, category, bus_id)) => {
                let notification = self
                    .store
                    .push_notification(message, category, Some(bus_id), now)
                    .await;
                let report = self
                    .broadcaster
                    .broadcast(LiveEvent::from(&notification))
                    .await;
                delivered = delivered.saturating_add(report.delivered);
                dropped = dropped.saturating_add(report.dropped.len());
                info!(tick, message = %notification.message, "Synthetic notification emitted");
                Some(notification)
            }
            None => None,
        };

        debug!(
            tick,
            buses = snapshot.buses().len(),
            delivered,
            dropped,
            "Tick complete"
        );

        Ok(TickSummary {
            tick,
            snapshot,
            notification,
            delivered,
            dropped,
        })
    }

    /// Decide whether this tick emits a notice, and about which bus.
    fn roll_notification(
        &mut self,
        buses: &[Bus],
    ) -> Option<(String, NotificationCategory, BusId)> {
        let p = self.params.notification_probability;
        if !(p > 0.0 && self.rng.random_bool(p.min(1.0))) {
            return None;
        }
        let bus = buses.choose(&mut self.rng)?;
        let (message, category) = if bus.occupancy >= self.params.crowding_threshold {
            (
                format!("Bus {} is overcrowded", bus.bus_number),
                NotificationCategory::Crowd,
            )
        } else {
            (
                format!("Bus {} is experiencing delays", bus.bus_number),
                NotificationCategory::Delay,
            )
        };
        Some((message, category, bus.id))
    }
}
