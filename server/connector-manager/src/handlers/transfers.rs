//! Transfer orchestration: catalog retrieval, contract negotiation, push/pull
//! transfer processes, the http-logger container and the local transfer log.

use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use crate::config::Deployment;
use crate::edc::EdcClient;
use crate::error::ApiError;
use crate::launcher;
use crate::state::AppState;
use crate::types::{
  CheckTransfer, Connector, ContractAgreement, IdResponse, MessageResponse, NegotiateContract,
  RequestCatalog, StartTransfer, Transfer, TransferResponse,
};

pub fn routes() -> Router<Arc<AppState>> {
  Router::new()
    .route("/transfers", post(create).get(list))
    .route("/transfers/catalog_request", post(catalog_request))
    .route("/transfers/negotiate_contract", post(negotiate_contract))
    .route("/transfers/contract_agreement", post(contract_agreement))
    .route("/transfers/start_http_server", post(start_http_server))
    .route("/transfers/stop_http_server", post(stop_http_server))
    .route("/transfers/start_transfer", post(start_transfer))
    .route("/transfers/start_transfer_pull", post(start_transfer_pull))
    .route("/transfers/check_transfer", post(check_transfer))
    .route("/transfers/check_data_pull", post(check_data_pull))
    .route("/transfers/proxy_http_logger", get(proxy_http_logger))
    .route("/transfers/proxy_pull", get(proxy_pull))
}

/// Connector lookup for transfer operations (consumer or provider side).
async fn participant(state: &AppState, id: &str) -> Result<Connector, ApiError> {
  state
    .store
    .find_connector(id)
    .await?
    .ok_or_else(|| ApiError::not_found("Consumer or provider connector not found"))
}

async fn catalog_request(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<RequestCatalog>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let provider = participant(&state, &payload.provider).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(client.request_catalog(&consumer, &provider).await?))
}

async fn negotiate_contract(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<NegotiateContract>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let provider = participant(&state, &payload.provider).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .negotiate_contract(&consumer, &provider, &payload.contract_offer_id, &payload.asset)
      .await?,
  ))
}

async fn contract_agreement(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<ContractAgreement>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .contract_agreement(&consumer, &payload.id_contract_negotiation)
      .await?,
  ))
}

async fn start_http_server(
  State(state): State<Arc<AppState>>,
) -> Result<Json<MessageResponse>, ApiError> {
  launcher::start_logger(&state.config)
    .await
    .map_err(|e| ApiError::internal(format!("Failed to start HTTP logger: {}", e)))?;
  Ok(Json(MessageResponse::new(
    "HTTP request logger started successfully",
  )))
}

async fn stop_http_server() -> Result<Json<MessageResponse>, ApiError> {
  launcher::stop_logger()
    .await
    .map_err(|e| ApiError::internal(format!("Failed to stop HTTP logger: {}", e)))?;
  Ok(Json(MessageResponse::new(
    "HTTP request logger stopped successfully",
  )))
}

/// Push transfer: the provider delivers into the http-logger sink.
async fn start_transfer(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<StartTransfer>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let provider = participant(&state, &payload.provider).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .start_push_transfer(&consumer, &provider, &payload.contract_agreement_id)
      .await?,
  ))
}

/// Pull transfer: the consumer fetches through an EDR once provisioned.
async fn start_transfer_pull(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<StartTransfer>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let provider = participant(&state, &payload.provider).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .start_pull_transfer(&consumer, &provider, &payload.contract_agreement_id)
      .await?,
  ))
}

async fn check_transfer(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<CheckTransfer>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .transfer_status(&consumer, &payload.transfer_process_id)
      .await?,
  ))
}

async fn check_data_pull(
  State(state): State<Arc<AppState>>,
  Json(payload): Json<CheckTransfer>,
) -> Result<Json<Value>, ApiError> {
  let consumer = participant(&state, &payload.consumer).await?;
  let client = EdcClient::new(&state.http, &state.config);
  Ok(Json(
    client
      .pull_data_address(&consumer, &payload.transfer_process_id)
      .await?,
  ))
}

/// Record a completed transfer in the local database.
async fn create(
  State(state): State<Arc<AppState>>,
  Json(transfer): Json<Transfer>,
) -> Result<(StatusCode, Json<IdResponse>), ApiError> {
  let id = state.store.insert_transfer(&transfer).await?;
  Ok((StatusCode::CREATED, Json(IdResponse { id })))
}

async fn list(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<TransferResponse>>, ApiError> {
  Ok(Json(state.store.list_transfers().await?))
}

/// Relay the http-logger's stored body; non-JSON bodies come back as a JSON
/// string.
async fn proxy_http_logger(
  State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, ApiError> {
  let url = match state.config.deployment {
    Deployment::Localhost => format!("http://localhost:{}/data", state.config.logger_port),
    Deployment::Docker => "http://http-logger:4000/data".to_string(),
  };

  let response = state
    .http
    .get(&url)
    .send()
    .await
    .map_err(|e| ApiError::internal(format!("Failed to reach HTTP logger: {}", e)))?;
  let text = response
    .text()
    .await
    .map_err(|e| ApiError::internal(format!("Failed to read HTTP logger body: {}", e)))?;

  let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
  Ok(Json(value))
}

#[derive(Debug, Deserialize)]
struct ProxyPullParams {
  uri: String,
}

/// Fetch a pull endpoint on behalf of the frontend, relaying body and
/// content type.
async fn proxy_pull(
  State(state): State<Arc<AppState>>,
  Query(params): Query<ProxyPullParams>,
  headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
  let authorization = headers
    .get(header::AUTHORIZATION)
    .and_then(|value| value.to_str().ok())
    .ok_or_else(|| ApiError::bad_request("Authorization header is required"))?;

  let response = state
    .http
    .get(&params.uri)
    .header(header::AUTHORIZATION, authorization)
    .send()
    .await
    .map_err(|e| ApiError::Unreachable(e.to_string()))?;

  let status = response.status();
  if status != reqwest::StatusCode::OK {
    let body = response.text().await.unwrap_or_default();
    return Err(ApiError::Upstream {
      status: status.as_u16(),
      detail: format!("Error from pull endpoint: {}", body),
    });
  }

  let content_type = response
    .headers()
    .get(header::CONTENT_TYPE)
    .and_then(|value| value.to_str().ok())
    .unwrap_or("application/octet-stream")
    .to_string();
  let body = response
    .bytes()
    .await
    .map_err(|e| ApiError::internal(format!("Failed to read pull body: {}", e)))?;

  Ok(([(header::CONTENT_TYPE, content_type)], body.to_vec()))
}
