//! EDC Studio Backend — connector manager.
//!
//! REST API that manages Eclipse Dataspace Connector (EDC) instances:
//! connector metadata CRUD in MongoDB, Docker lifecycle for managed
//! connectors, and asset / policy / contract / transfer operations through
//! the EDC Management API.

use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub mod config;
pub mod edc;
pub mod error;
pub mod handlers;
pub mod launcher;
pub mod state;
pub mod store;
pub mod types;

pub use config::Config;
pub use error::ApiError;
pub use state::AppState;
pub use store::Store;

/// Assemble the full application router.
pub fn app(state: Arc<AppState>) -> Router {
  Router::new()
    .merge(handlers::health::routes())
    .merge(handlers::connectors::routes())
    .merge(handlers::assets::routes())
    .merge(handlers::policies::routes())
    .merge(handlers::contracts::routes())
    .merge(handlers::transfers::routes())
    .layer(CorsLayer::permissive())
    .with_state(state)
}
