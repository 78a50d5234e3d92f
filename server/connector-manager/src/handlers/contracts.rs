//! Contract definition endpoints proxied to the Management API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

use crate::edc::EdcClient;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Connector, Contract, MessageResponse};

pub fn routes() -> Router<Arc<AppState>> {
  // The router wants one name per path position: `:id` is the edc id on PUT
  // and the contract id on DELETE; extraction is positional.
  Router::new()
    .route("/contracts", post(create))
    .route("/contracts/by-edc/:edc_id", get(list_by_edc))
    .route("/contracts/by-contract-id/:edc_id/:contract_id", get(fetch))
    .route("/contracts/:id", put(update))
    .route("/contracts/:id/:edc_id", delete(remove))
}

async fn edc(state: &AppState, edc_id: &str) -> Result<Connector, ApiError> {
  state
    .store
    .find_connector(edc_id)
    .await?
    .ok_or_else(|| ApiError::not_found("EDC not found"))
}

async fn create(
  State(state): State<Arc<AppState>>,
  Json(contract): Json<Contract>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
  let connector = edc(&state, &contract.edc).await?;
  let client = EdcClient::new(&state.http, &state.config);
  let created = client.create_contract(&connector, &contract).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

async fn list_by_edc(
  State(state): State<Arc<AppState>>,
  Path(edc_id): Path<String>,
) -> Result<Json<Vec<Contract>>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.query_contracts(&connector).await?))
}

async fn fetch(
  State(state): State<Arc<AppState>>,
  Path((edc_id, contract_id)): Path<(String, String)>,
) -> Result<Json<Contract>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.get_contract(&connector, &contract_id).await?))
}

async fn update(
  State(state): State<Arc<AppState>>,
  Path(edc_id): Path<String>,
  Json(contract): Json<Contract>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  if !client.update_contract(&connector, &contract).await? {
    return Err(ApiError::not_found("Asset not found or not updated"));
  }
  Ok(Json(MessageResponse::new("Contract updated successfully")))
}

async fn remove(
  State(state): State<Arc<AppState>>,
  Path((contract_id, edc_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  if !client.delete_contract(&connector, &contract_id).await? {
    return Err(ApiError::not_found("Asset not found or not deleted"));
  }
  Ok(Json(MessageResponse::new("Contract deleted successfully")))
}
