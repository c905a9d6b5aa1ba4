//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: fleet_core::config::ConfigError,
    },

    /// Seed loading or validation failed.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: fleet_world::WorldError,
    },

    /// HTTP server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying startup error.
        #[from]
        source: fleet_observer::startup::StartupError,
    },
}
