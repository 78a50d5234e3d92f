//! Asset endpoints: registered in the owning connector via the Management API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use std::sync::Arc;

use crate::edc::EdcClient;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Asset, Connector, MessageResponse};

pub fn routes() -> Router<Arc<AppState>> {
  // The router wants one name per path position: `:id` is the edc id on PUT
  // and the asset id on DELETE; extraction is positional.
  Router::new()
    .route("/assets", post(create))
    .route("/assets/by-edc/:edc_id", get(list_by_edc))
    .route("/assets/by-asset-id/:edc_id/:asset_id", get(fetch))
    .route("/assets/:id", put(update))
    .route("/assets/:id/:edc_id", delete(remove))
}

/// Look up the connector an asset operation targets (404 as "EDC not found").
async fn edc(state: &AppState, edc_id: &str) -> Result<Connector, ApiError> {
  state
    .store
    .find_connector(edc_id)
    .await?
    .ok_or_else(|| ApiError::not_found("EDC not found"))
}

/// Create an asset; the response body is the created asset's `@id`.
async fn create(
  State(state): State<Arc<AppState>>,
  Json(asset): Json<Asset>,
) -> Result<(StatusCode, Json<String>), ApiError> {
  let connector = edc(&state, &asset.edc).await?;
  let client = EdcClient::new(&state.http, &state.config);

  let created = client.create_asset(&connector, &asset).await?;
  let id = created["@id"]
    .as_str()
    .ok_or_else(|| ApiError::internal("Unexpected error: EDC response without @id"))?
    .to_string();
  Ok((StatusCode::CREATED, Json(id)))
}

async fn list_by_edc(
  State(state): State<Arc<AppState>>,
  Path(edc_id): Path<String>,
) -> Result<Json<Vec<Asset>>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.query_assets(&connector).await?))
}

async fn fetch(
  State(state): State<Arc<AppState>>,
  Path((edc_id, asset_id)): Path<(String, String)>,
) -> Result<Json<Asset>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.get_asset(&connector, &asset_id).await?))
}

async fn update(
  State(state): State<Arc<AppState>>,
  Path(edc_id): Path<String>,
  Json(asset): Json<Asset>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  client.update_asset(&connector, &asset).await?;
  Ok(Json(MessageResponse::new("Asset updated successfully")))
}

async fn remove(
  State(state): State<Arc<AppState>>,
  Path((asset_id, edc_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  client.delete_asset(&connector, &asset_id).await?;
  Ok(Json(MessageResponse::new("Asset deleted successfully")))
}
