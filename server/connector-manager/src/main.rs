//! Binary entrypoint for the connector manager.

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use connector_manager::{app, AppState, Config, Store};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .compact()
    .init();

  let config = Config::from_env();

  let client = mongodb::Client::with_uri_str(&config.mongodb_uri).await?;
  let db = client.database(&config.mongodb_db);
  tracing::info!(
    "connected to MongoDB at {}, using database '{}'",
    config.mongodb_uri,
    config.mongodb_db
  );

  let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
  let state = Arc::new(AppState {
    store: Store::new(db),
    http: reqwest::Client::new(),
    config,
  });

  tracing::info!("connector-manager listening on http://{}", addr);
  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app(state)).await?;

  Ok(())
}
