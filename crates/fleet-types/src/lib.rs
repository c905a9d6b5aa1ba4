//! Shared type definitions for the fleet live-tracking engine.
//!
//! This crate is the single source of truth for the records the engine
//! stores and the events it pushes. Types flow to `TypeScript` via `ts-rs`
//! for the map frontend.
//!
//! # Modules
//!
//! - [`ids`] -- Typed integer identifiers for routes, stops, buses, notifications
//! - [`enums`] -- Notification category and severity
//! - [`structs`] -- Route, stop, bus, and notification records
//! - [`events`] -- Live event wire shapes (`bus_update`, `notification`)

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

pub use enums::{NotificationCategory, Severity};
pub use events::{BusPosition, LiveEvent};
pub use ids::{BusId, NotificationId, RouteId, StopId};
pub use structs::{Bus, GeoPoint, Notification, Route, Stop};
