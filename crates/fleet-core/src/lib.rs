//! Real-time fleet state engine: the store, the tick, the fan-out, and the
//! queries.
//!
//! One background task runs the [`Simulator`] on a timer. Every tick it
//! commits a batch of bus updates to the [`StateStore`] under a single write
//! lock and hands the resulting snapshot to the [`Broadcaster`]. Request
//! handlers read the store through [`QueryService`] independently of the
//! tick.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `fleet-config.yaml` into
//!   strongly-typed structs.
//! - [`store`] -- [`StateStore`], the authoritative bus and notification state.
//! - [`tick`] -- The random-walk tick and [`FleetSnapshot`].
//! - [`broadcast`] -- Subscriber registry and event fan-out.
//! - [`query`] -- Nearby stops, route search, arrival estimates.
//! - [`dashboard`] -- Operator bus status, route efficiency, canned alerts.
//! - [`runner`] -- The recurring tick loop with shutdown and tick limits.
//!
//! [`Simulator`]: tick::Simulator
//! [`StateStore`]: store::StateStore
//! [`Broadcaster`]: broadcast::Broadcaster
//! [`QueryService`]: query::QueryService
//! [`FleetSnapshot`]: tick::FleetSnapshot

pub mod broadcast;
pub mod config;
pub mod dashboard;
pub mod query;
pub mod runner;
pub mod store;
pub mod tick;
