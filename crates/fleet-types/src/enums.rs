//! Enumeration types for notifications.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum NotificationCategory {
    /// A bus is running behind schedule.
    Delay,
    /// A bus is overcrowded.
    Crowd,
    /// General service announcement (route resumed, diversion, ...).
    Service,
}

impl NotificationCategory {
    /// Severity shown to viewers for this category.
    pub const fn severity(self) -> Severity {
        match self {
            Self::Delay | Self::Crowd => Severity::Warning,
            Self::Service => Severity::Info,
        }
    }
}

/// Severity tag carried on the live notification event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Severity {
    /// Informational.
    Info,
    /// Something riders should know about.
    Warning,
}
