//! Server startup helper for embedding in the engine binary.
//!
//! [`spawn_observer`] binds the listening socket on the caller's task, so a
//! bad address or a port in use is reported immediately, then serves on a
//! background Tokio task alongside the tick loop.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::server::{self, ServerConfig, ServerError};
use crate::state::AppState;

/// Errors that can occur when spawning the server.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    /// The server failed to bind or start.
    #[error("server start error: {0}")]
    Server(#[from] ServerError),
}

/// Bind the server and serve on a background task.
///
/// The returned handle finishes only if serving fails; abort it on
/// shutdown.
///
/// # Errors
///
/// Returns [`StartupError::Server`] if the address cannot be bound.
pub async fn spawn_observer(
    config: &ServerConfig,
    state: Arc<AppState>,
) -> Result<JoinHandle<()>, StartupError> {
    let listener = server::bind(config).await?;

    let handle = tokio::spawn(async move {
        if let Err(e) = server::serve(listener, state).await {
            tracing::error!(error = %e, "HTTP server exited with error");
        }
    });

    tracing::info!(port = config.port, "HTTP server spawned on background task");

    Ok(handle)
}
