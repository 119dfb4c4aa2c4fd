use std::sync::Arc;

use medreview_events::EventBus;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: medreview_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Review events published after each committed transition.
    pub event_bus: Arc<EventBus>,
}
