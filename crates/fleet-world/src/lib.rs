//! Route network and seed data for the fleet live-tracking engine.
//!
//! This crate models the parts of the world that do not move: routes with
//! their ordered stops and path waypoints. It also owns the seed records the
//! engine starts from and the validation that keeps bad seed data out of
//! the store.
//!
//! # Modules
//!
//! - [`error`] -- Error types for seed loading and validation.
//! - [`network`] -- [`TransitNetwork`], the immutable route/stop index.
//! - [`seed`] -- [`FleetSeed`] loading (YAML) and validation.
//! - [`starting_world`] -- The built-in Hyderabad starting fleet.

pub mod error;
pub mod network;
pub mod seed;
pub mod starting_world;

pub use error::WorldError;
pub use network::TransitNetwork;
pub use seed::{FleetSeed, MAX_OCCUPANCY, SeededFleet};
pub use starting_world::create_starting_fleet;
