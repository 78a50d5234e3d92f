//! Connector lifecycle endpoints: CRUD plus start/stop of the Docker stack.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

use crate::error::ApiError;
use crate::launcher;
use crate::state::AppState;
use crate::types::{
  Connector, ConnectorResponse, ConnectorState, ConnectorUpdate, IdResponse, MessageResponse,
};

pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/connectors", post(create).get(list))
    .route("/connectors/:id", get(fetch).put(update).delete(remove))
    .route("/connectors/:id/start", post(start))
    .route("/connectors/:id/stop", post(stop))
}

async fn create(
  State(state): State<Arc<AppState>>,
  Json(connector): Json<Connector>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
  let id = state.store.insert_connector(&connector).await?;
  Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

/// Generate runtime files, bring the Docker stack up, mark as running.
async fn start(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = state.store.connector(&id).await?;

  launcher::launch(&connector, &state.config)
    .await
    .map_err(|e| ApiError::internal(format!("Failed to start connector: {}", e)))?;

  state
    .store
    .set_connector_state(&id, ConnectorState::Running)
    .await?;
  tracing::info!("connector {} started", id);
  Ok(Json(MessageResponse::new("Connector started successfully")))
}

/// Compose down, wipe the runtime dir, mark as stopped.
async fn stop(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
  let base = state.config.runtime_path.join(&id);
  if !base.exists() {
    return Err(ApiError::not_found("Runtime folder does not exist"));
  }

  launcher::shutdown(&base)
    .await
    .map_err(|e| ApiError::internal(format!("Failed to stop connector: {}", e)))?;

  state
    .store
    .set_connector_state(&id, ConnectorState::Stopped)
    .await?;
  tracing::info!("connector {} stopped", id);
  Ok(Json(MessageResponse::new("Connector stopped")))
}

async fn list(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ConnectorResponse>>, ApiError> {
  let connectors = state.store.list_connectors().await?;
  Ok(Json(
    connectors
      .into_iter()
      .map(Connector::into_response)
      .collect(),
  ))
}

async fn fetch(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<ConnectorResponse>, ApiError> {
  let connector = state.store.connector(&id).await?;
  Ok(Json(connector.into_response()))
}

async fn update(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
  Json(update): Json<ConnectorUpdate>,
) -> Result<Json<MessageResponse>, ApiError> {
  state.store.update_connector(&id, &update).await?;
  Ok(Json(MessageResponse::new("Connector updated successfully")))
}

async fn remove(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
  state.store.delete_connector(&id).await?;
  Ok(Json(MessageResponse::new("Connector deleted successfully")))
}
