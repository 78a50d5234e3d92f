//! Policy definition endpoints (ODRL) proxied to the Management API.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;

use crate::edc::EdcClient;
use crate::error::ApiError;
use crate::state::AppState;
use crate::types::{Connector, MessageResponse, Policy};

pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/policies", post(create))
    .route("/policies/by-edc/:edc_id", get(list_by_edc))
    .route("/policies/by-policy-id/:edc_id/:policy_id", get(fetch))
    .route("/policies/:policy_id/:edc_id", delete(remove))
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
  Json(policy): Json<Policy>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
  let connector = edc(&state, &policy.edc).await?;
  let client = EdcClient::new(&state.http, &state.config);
  let created = client.create_policy(&connector, &policy).await?;
  Ok((StatusCode::CREATED, Json(created)))
}

async fn list_by_edc(
  State(state): State<Arc<AppState>>,
  Path(edc_id): Path<String>,
) -> Result<Json<Vec<Policy>>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.query_policies(&connector).await?))
}

async fn fetch(
  State(state): State<Arc<AppState>>,
  Path((edc_id, policy_id)): Path<(String, String)>,
) -> Result<Json<Policy>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.get_policy(&connector, &policy_id).await?))
}

async fn remove(
  State(state): State<Arc<AppState>>,
  Path((policy_id, edc_id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
  let connector = edc(&state, &edc_id).await?;
  let client = EdcClient::new(&state.http, &state.config);
  client.delete_policy(&connector, &policy_id).await?;
  Ok(Json(MessageResponse::new("Policy deleted successfully")))
}
