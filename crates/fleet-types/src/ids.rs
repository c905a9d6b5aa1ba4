//! Type-safe identifier wrappers around integer keys.
//!
//! Every record in the fleet has a strongly-typed ID so a stop id can never
//! be passed where a bus id is expected. The seed data and the HTTP layer
//! both use small integers, so the wrappers serialize as plain numbers.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around an integer key with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the inner integer value.
            pub const fn into_inner(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$inner> for $name {
            fn from(id: $inner) -> Self {
                Self(id)
            }
        }

        impl From<$name> for $inner {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a route.
    RouteId(u32)
}

define_id! {
    /// Unique identifier for a stop.
    StopId(u32)
}

define_id! {
    /// Unique identifier for a bus.
    BusId(u32)
}

define_id! {
    /// Unique identifier for a notification. Assigned in append order.
    NotificationId(u64)
}

impl NotificationId {
    /// The identifier following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&BusId(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
        let restored: Result<StopId, _> = serde_json::from_str("12");
        assert_eq!(restored.ok(), Some(StopId(12)));
    }

    #[test]
    fn id_display_matches_inner() {
        assert_eq!(RouteId(218).to_string(), "218");
    }

    #[test]
    fn notification_id_next_saturates() {
        assert_eq!(NotificationId(1).next(), NotificationId(2));
        assert_eq!(NotificationId(u64::MAX).next(), NotificationId(u64::MAX));
    }
}
