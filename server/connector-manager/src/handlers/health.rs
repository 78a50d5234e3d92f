//! Liveness probe.

use axum::routing::get;
use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
  Router::new().route("/health", get(health))
}

pub async fn health() -> &'static str {
  "ok"
}
