//! HTTP client for the EDC Management API of one or more connectors.
//!
//! URL building depends on the connector mode: managed connectors are reached
//! via localhost (backend on the host) or via their Docker service name
//! `edc-{type}-{id}` (backend on the connector network); remote connectors
//! bring their own management/protocol base URLs.

use serde_json::Value;

use crate::config::{Config, Deployment};
use crate::edc::payload;
use crate::error::ApiError;
use crate::types::{Asset, Connector, ConnectorMode, Contract, Policy};

/// Data destination for push transfers: the http-request-logger sink on the
/// connector network.
pub const PUSH_DESTINATION_URL: &str = "http://http-logger:4000/api/consumer/store";

pub struct EdcClient<'a> {
  http: &'a reqwest::Client,
  config: &'a Config,
}

impl<'a> EdcClient<'a> {
  pub fn new(http: &'a reqwest::Client, config: &'a Config) -> Self {
    Self { http, config }
  }

  // -------------------------------------------------------------------------
  // URL + auth plumbing
  // -------------------------------------------------------------------------

  /// Management API URL for `path` (always a `/v3/...` path).
  pub fn management_url(&self, connector: &Connector, path: &str) -> Result<String, ApiError> {
    match connector.mode {
      ConnectorMode::Managed => {
        let ports = connector
          .ports
          .ok_or_else(|| ApiError::internal("Connector ports not configured"))?;
        match self.config.deployment {
          Deployment::Localhost => Ok(format!(
            "http://localhost:{}/management{}",
            ports.management, path
          )),
          Deployment::Docker => Ok(format!(
            "http://edc-{}-{}:{}/management{}",
            connector.kind,
            connector.hex_id(),
            ports.management,
            path
          )),
        }
      }
      ConnectorMode::Remote => {
        let endpoints = connector
          .endpoints_url
          .as_ref()
          .ok_or_else(|| ApiError::internal("Connector management endpoint not configured"))?;
        Ok(format!("{}{}", endpoints.management.trim_end_matches('/'), path))
      }
    }
  }

  /// Protocol endpoint of a counterparty connector.
  pub fn protocol_url(&self, connector: &Connector) -> Result<String, ApiError> {
    match connector.mode {
      ConnectorMode::Managed => {
        let ports = connector
          .ports
          .ok_or_else(|| ApiError::internal("Connector ports not configured"))?;
        Ok(format!(
          "http://edc-{}-{}:{}/protocol",
          connector.kind,
          connector.hex_id(),
          ports.protocol
        ))
      }
      ConnectorMode::Remote => connector
        .endpoints_url
        .as_ref()
        .and_then(|endpoints| endpoints.protocol.clone())
        .ok_or_else(|| ApiError::internal("Connector protocol endpoint not configured")),
    }
  }

  fn api_key<'c>(connector: &'c Connector) -> Result<&'c str, ApiError> {
    connector
      .api_key
      .as_deref()
      .filter(|key| !key.is_empty())
      .ok_or_else(|| ApiError::internal("Connector API key not configured"))
  }

  async fn send(
    &self,
    request: reqwest::RequestBuilder,
    key: &str,
  ) -> Result<reqwest::Response, ApiError> {
    request
      .header("x-api-key", key)
      .send()
      .await
      .map_err(|e| ApiError::Unreachable(e.to_string()))
  }

  /// Resource-style error mapping: mirror the EDC status, prefix the body.
  async fn expect_success(
    &self,
    response: reqwest::Response,
    prefix: &str,
  ) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
      return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Upstream {
      status: status.as_u16(),
      detail: format!("{}: {}", prefix, body),
    })
  }

  async fn json_body(&self, response: reqwest::Response) -> Result<Value, ApiError> {
    response
      .json()
      .await
      .map_err(|e| ApiError::internal(format!("Unexpected error: {}", e)))
  }

  // -------------------------------------------------------------------------
  // Assets
  // -------------------------------------------------------------------------

  pub async fn create_asset(&self, connector: &Connector, asset: &Asset) -> Result<Value, ApiError> {
    let url = self.management_url(connector, "/v3/assets")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(self.http.post(&url).json(&payload::asset_create(asset)), key)
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    self.json_body(response).await
  }

  pub async fn query_assets(&self, connector: &Connector) -> Result<Vec<Asset>, ApiError> {
    let url = self.management_url(connector, "/v3/assets/request")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(self.http.post(&url).json(&payload::query_spec()), key)
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let items = self.json_body(response).await?;
    payload::parse_assets(&items, &connector.hex_id())
  }

  pub async fn get_asset(&self, connector: &Connector, asset_id: &str) -> Result<Asset, ApiError> {
    let url = self.management_url(connector, &format!("/v3/assets/{}", asset_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let item = self.json_body(response).await?;
    payload::parse_asset(&item, &connector.hex_id())
  }

  pub async fn update_asset(&self, connector: &Connector, asset: &Asset) -> Result<(), ApiError> {
    let url = self.management_url(connector, &format!("/v3/assets/{}", asset.asset_id))?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(self.http.put(&url).json(&payload::asset_update(asset)), key)
      .await?;
    self.expect_success(response, "HTTP error from EDC").await?;
    Ok(())
  }

  pub async fn delete_asset(&self, connector: &Connector, asset_id: &str) -> Result<(), ApiError> {
    let url = self.management_url(connector, &format!("/v3/assets/{}", asset_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.delete(&url), key).await?;
    self.expect_success(response, "HTTP error from EDC").await?;
    Ok(())
  }

  // -------------------------------------------------------------------------
  // Policy definitions
  // -------------------------------------------------------------------------

  pub async fn create_policy(
    &self,
    connector: &Connector,
    policy: &Policy,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(connector, "/v3/policydefinitions")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(
        self.http.post(&url).json(&payload::policy_create(policy)),
        key,
      )
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    self.json_body(response).await
  }

  pub async fn query_policies(&self, connector: &Connector) -> Result<Vec<Policy>, ApiError> {
    let url = self.management_url(connector, "/v3/policydefinitions/request")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(self.http.post(&url).json(&payload::query_spec()), key)
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let items = self.json_body(response).await?;
    payload::parse_policies(&items, &connector.hex_id())
  }

  pub async fn get_policy(
    &self,
    connector: &Connector,
    policy_id: &str,
  ) -> Result<Policy, ApiError> {
    let url = self.management_url(connector, &format!("/v3/policydefinitions/{}", policy_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let item = self.json_body(response).await?;
    payload::parse_policy(&item, &connector.hex_id())
  }

  pub async fn delete_policy(
    &self,
    connector: &Connector,
    policy_id: &str,
  ) -> Result<(), ApiError> {
    let url = self.management_url(connector, &format!("/v3/policydefinitions/{}", policy_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.delete(&url), key).await?;
    self.expect_success(response, "HTTP error from EDC").await?;
    Ok(())
  }

  // -------------------------------------------------------------------------
  // Contract definitions
  // -------------------------------------------------------------------------

  pub async fn create_contract(
    &self,
    connector: &Connector,
    contract: &Contract,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(connector, "/v3/contractdefinitions")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(
        self
          .http
          .post(&url)
          .json(&payload::contract_create(contract)),
        key,
      )
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    self.json_body(response).await
  }

  pub async fn query_contracts(&self, connector: &Connector) -> Result<Vec<Contract>, ApiError> {
    let url = self.management_url(connector, "/v3/contractdefinitions/request")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(self.http.post(&url).json(&payload::query_spec()), key)
      .await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let items = self.json_body(response).await?;
    payload::parse_contracts(&items, &connector.hex_id())
  }

  pub async fn get_contract(
    &self,
    connector: &Connector,
    contract_id: &str,
  ) -> Result<Contract, ApiError> {
    let url =
      self.management_url(connector, &format!("/v3/contractdefinitions/{}", contract_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "HTTP error from EDC").await?;
    let item = self.json_body(response).await?;
    payload::parse_contract(&item, &connector.hex_id())
  }

  /// Returns whether the EDC acknowledged the update (204).
  pub async fn update_contract(
    &self,
    connector: &Connector,
    contract: &Contract,
  ) -> Result<bool, ApiError> {
    let url = self.management_url(connector, "/v3/contractdefinitions")?;
    let key = Self::api_key(connector)?;
    let response = self
      .send(
        self
          .http
          .put(&url)
          .json(&payload::contract_update(contract)),
        key,
      )
      .await?;
    Ok(response.status() == reqwest::StatusCode::NO_CONTENT)
  }

  /// Returns whether the EDC acknowledged the deletion (204).
  pub async fn delete_contract(
    &self,
    connector: &Connector,
    contract_id: &str,
  ) -> Result<bool, ApiError> {
    let url =
      self.management_url(connector, &format!("/v3/contractdefinitions/{}", contract_id))?;
    let key = Self::api_key(connector)?;
    let response = self.send(self.http.delete(&url), key).await?;
    Ok(response.status() == reqwest::StatusCode::NO_CONTENT)
  }

  // -------------------------------------------------------------------------
  // Catalog / negotiation / transfer processes
  // -------------------------------------------------------------------------

  pub async fn request_catalog(
    &self,
    consumer: &Connector,
    provider: &Connector,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(consumer, "/v3/catalog/request")?;
    let protocol_url = self.protocol_url(provider)?;
    let key = Self::api_key(consumer)?;
    let response = self
      .send(
        self
          .http
          .post(&url)
          .json(&payload::catalog_request(&protocol_url)),
        key,
      )
      .await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  pub async fn negotiate_contract(
    &self,
    consumer: &Connector,
    provider: &Connector,
    contract_offer_id: &str,
    asset: &str,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(consumer, "/v3/contractnegotiations")?;
    let protocol_url = self.protocol_url(provider)?;
    let key = Self::api_key(consumer)?;
    let response = self
      .send(
        self.http.post(&url).json(&payload::contract_request(
          &protocol_url,
          contract_offer_id,
          asset,
        )),
        key,
      )
      .await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  pub async fn contract_agreement(
    &self,
    consumer: &Connector,
    negotiation_id: &str,
  ) -> Result<Value, ApiError> {
    let url =
      self.management_url(consumer, &format!("/v3/contractnegotiations/{}", negotiation_id))?;
    let key = Self::api_key(consumer)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  pub async fn start_push_transfer(
    &self,
    consumer: &Connector,
    provider: &Connector,
    contract_agreement_id: &str,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(consumer, "/v3/transferprocesses")?;
    let protocol_url = self.protocol_url(provider)?;
    let key = Self::api_key(consumer)?;
    let response = self
      .send(
        self.http.post(&url).json(&payload::push_transfer_request(
          &protocol_url,
          contract_agreement_id,
          PUSH_DESTINATION_URL,
        )),
        key,
      )
      .await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  pub async fn start_pull_transfer(
    &self,
    consumer: &Connector,
    provider: &Connector,
    contract_agreement_id: &str,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(consumer, "/v3/transferprocesses")?;
    let protocol_url = self.protocol_url(provider)?;
    let key = Self::api_key(consumer)?;
    let response = self
      .send(
        self.http.post(&url).json(&payload::pull_transfer_request(
          &protocol_url,
          contract_agreement_id,
        )),
        key,
      )
      .await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  pub async fn transfer_status(
    &self,
    consumer: &Connector,
    transfer_process_id: &str,
  ) -> Result<Value, ApiError> {
    let url =
      self.management_url(consumer, &format!("/v3/transferprocesses/{}", transfer_process_id))?;
    let key = Self::api_key(consumer)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }

  /// Data address (EDR) of a pull transfer once the EDC has provisioned it.
  pub async fn pull_data_address(
    &self,
    consumer: &Connector,
    transfer_process_id: &str,
  ) -> Result<Value, ApiError> {
    let url = self.management_url(
      consumer,
      &format!("/v3/edrs/{}/dataaddress", transfer_process_id),
    )?;
    let key = Self::api_key(consumer)?;
    let response = self.send(self.http.get(&url), key).await?;
    let response = self.expect_success(response, "EDC error").await?;
    self.json_body(response).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::types::{ConnectorState, ConnectorType, Endpoints, PortConfig};
  use mongodb::bson::oid::ObjectId;

  fn managed_connector() -> Connector {
    Connector {
      id: Some(ObjectId::parse_str("65f0aa11bb22cc33dd44ee55").unwrap()),
      name: "EDC Provider 01".into(),
      description: None,
      kind: ConnectorType::Provider,
      ports: Some(PortConfig {
        http: 8181,
        management: 8182,
        protocol: 8183,
        control: 8184,
        public: 8185,
        version: 8186,
      }),
      api_key: Some("secret".into()),
      state: ConnectorState::Stopped,
      mode: crate::types::ConnectorMode::Managed,
      endpoints_url: None,
      domain: None,
    }
  }

  fn remote_connector() -> Connector {
    Connector {
      mode: crate::types::ConnectorMode::Remote,
      ports: None,
      endpoints_url: Some(Endpoints {
        management: "https://edc.example.org/management/".into(),
        protocol: Some("https://edc.example.org/protocol".into()),
      }),
      ..managed_connector()
    }
  }

  #[test]
  fn managed_localhost_urls_use_the_management_port() {
    let http = reqwest::Client::new();
    let config = Config::default();
    let client = EdcClient::new(&http, &config);

    let url = client
      .management_url(&managed_connector(), "/v3/assets")
      .unwrap();
    assert_eq!(url, "http://localhost:8182/management/v3/assets");
  }

  #[test]
  fn managed_docker_urls_use_the_service_name() {
    let http = reqwest::Client::new();
    let config = Config {
      deployment: Deployment::Docker,
      ..Config::default()
    };
    let client = EdcClient::new(&http, &config);

    let url = client
      .management_url(&managed_connector(), "/v3/assets")
      .unwrap();
    assert_eq!(
      url,
      "http://edc-provider-65f0aa11bb22cc33dd44ee55:8182/management/v3/assets"
    );
  }

  #[test]
  fn remote_urls_trim_the_trailing_slash() {
    let http = reqwest::Client::new();
    let config = Config::default();
    let client = EdcClient::new(&http, &config);

    let url = client
      .management_url(&remote_connector(), "/v3/catalog/request")
      .unwrap();
    assert_eq!(url, "https://edc.example.org/management/v3/catalog/request");
  }

  #[test]
  fn protocol_url_prefers_docker_service_name_for_managed() {
    let http = reqwest::Client::new();
    let config = Config::default();
    let client = EdcClient::new(&http, &config);

    let url = client.protocol_url(&managed_connector()).unwrap();
    assert_eq!(
      url,
      "http://edc-provider-65f0aa11bb22cc33dd44ee55:8183/protocol"
    );

    let url = client.protocol_url(&remote_connector()).unwrap();
    assert_eq!(url, "https://edc.example.org/protocol");
  }

  #[test]
  fn missing_api_key_is_a_500() {
    let mut connector = managed_connector();
    connector.api_key = Some(String::new());
    let err = EdcClient::api_key(&connector).unwrap_err();
    assert_eq!(err.to_string(), "Connector API key not configured");
  }
}
