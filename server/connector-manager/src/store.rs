//! Typed access to the MongoDB collections (`connectors`, `transfers`).

use futures::TryStreamExt;
use mongodb::bson::oid::ObjectId;
use mongodb::bson::{doc, to_bson};
use mongodb::{Collection, Database};

use crate::error::ApiError;
use crate::types::{
  Connector, ConnectorState, ConnectorUpdate, StoredTransfer, Transfer, TransferResponse,
};

pub struct Store {
  db: Database,
}

impl Store {
  pub fn new(db: Database) -> Self {
    Self { db }
  }

  fn connectors(&self) -> Collection<Connector> {
    self.db.collection("connectors")
  }

  fn transfers(&self) -> Collection<StoredTransfer> {
    self.db.collection("transfers")
  }

  /// Parse a client-supplied id into an ObjectId (400 on garbage).
  pub fn parse_id(id: &str) -> Result<ObjectId, ApiError> {
    ObjectId::parse_str(id)
      .map_err(|_| ApiError::bad_request(format!("invalid connector id: {}", id)))
  }

  // -------------------------------------------------------------------------
  // Connectors
  // -------------------------------------------------------------------------

  pub async fn insert_connector(&self, connector: &Connector) -> Result<String, ApiError> {
    let result = self.connectors().insert_one(connector).await?;
    let id = result
      .inserted_id
      .as_object_id()
      .ok_or_else(|| ApiError::internal("inserted connector id is not an ObjectId"))?;
    Ok(id.to_hex())
  }

  pub async fn find_connector(&self, id: &str) -> Result<Option<Connector>, ApiError> {
    let oid = Self::parse_id(id)?;
    Ok(self.connectors().find_one(doc! { "_id": oid }).await?)
  }

  /// Fetch a connector, 404 when absent.
  pub async fn connector(&self, id: &str) -> Result<Connector, ApiError> {
    self
      .find_connector(id)
      .await?
      .ok_or_else(|| ApiError::not_found("Connector not found"))
  }

  pub async fn list_connectors(&self) -> Result<Vec<Connector>, ApiError> {
    let cursor = self.connectors().find(doc! {}).await?;
    Ok(cursor.try_collect().await?)
  }

  pub async fn update_connector(
    &self,
    id: &str,
    update: &ConnectorUpdate,
  ) -> Result<(), ApiError> {
    let oid = Self::parse_id(id)?;
    let set = to_bson(update)
      .map_err(|e| ApiError::internal(format!("serialize connector update: {}", e)))?;
    let result = self
      .connectors()
      .update_one(doc! { "_id": oid }, doc! { "$set": set })
      .await?;
    if result.matched_count == 0 {
      return Err(ApiError::not_found("Connector not found"));
    }
    Ok(())
  }

  pub async fn set_connector_state(
    &self,
    id: &str,
    state: ConnectorState,
  ) -> Result<(), ApiError> {
    let oid = Self::parse_id(id)?;
    let state = to_bson(&state)
      .map_err(|e| ApiError::internal(format!("serialize connector state: {}", e)))?;
    self
      .connectors()
      .update_one(doc! { "_id": oid }, doc! { "$set": { "state": state } })
      .await?;
    Ok(())
  }

  pub async fn delete_connector(&self, id: &str) -> Result<(), ApiError> {
    let oid = Self::parse_id(id)?;
    let result = self.connectors().delete_one(doc! { "_id": oid }).await?;
    if result.deleted_count == 0 {
      return Err(ApiError::not_found("Connector not found"));
    }
    Ok(())
  }

  // -------------------------------------------------------------------------
  // Transfers
  // -------------------------------------------------------------------------

  /// Record a completed transfer; consumer/provider must exist.
  pub async fn insert_transfer(&self, transfer: &Transfer) -> Result<String, ApiError> {
    let consumer = self
      .find_connector(&transfer.consumer)
      .await?
      .ok_or_else(|| ApiError::not_found("Consumer not found"))?;
    let provider = self
      .find_connector(&transfer.provider)
      .await?
      .ok_or_else(|| ApiError::not_found("Provider not found"))?;

    let stored = StoredTransfer {
      id: None,
      consumer: consumer
        .id
        .ok_or_else(|| ApiError::internal("consumer connector has no id"))?,
      provider: provider
        .id
        .ok_or_else(|| ApiError::internal("provider connector has no id"))?,
      asset: transfer.asset.clone(),
      has_policy_id: transfer.has_policy_id.clone(),
      negotiate_contract_id: transfer.negotiate_contract_id.clone(),
      contract_agreement_id: transfer.contract_agreement_id.clone(),
      transfer_process_id: transfer.transfer_process_id.clone(),
      transfer_flow: transfer.transfer_flow,
      authorization: transfer.authorization.clone(),
      endpoint: transfer.endpoint.clone(),
    };

    let result = self.transfers().insert_one(&stored).await?;
    let id = result
      .inserted_id
      .as_object_id()
      .ok_or_else(|| ApiError::internal("inserted transfer id is not an ObjectId"))?;
    Ok(id.to_hex())
  }

  /// List all transfers with consumer/provider populated from the connectors
  /// collection. Dangling references come back as null.
  pub async fn list_transfers(&self) -> Result<Vec<TransferResponse>, ApiError> {
    let mut cursor = self.transfers().find(doc! {}).await?;
    let mut out = Vec::new();

    while let Some(stored) = cursor.try_next().await? {
      let consumer = self
        .connectors()
        .find_one(doc! { "_id": stored.consumer })
        .await?;
      let provider = self
        .connectors()
        .find_one(doc! { "_id": stored.provider })
        .await?;

      out.push(TransferResponse {
        id: stored.id.map(|id| id.to_hex()).unwrap_or_default(),
        consumer: consumer.map(Connector::into_response),
        provider: provider.map(Connector::into_response),
        asset: stored.asset,
        has_policy_id: stored.has_policy_id,
        negotiate_contract_id: stored.negotiate_contract_id,
        contract_agreement_id: stored.contract_agreement_id,
        transfer_process_id: stored.transfer_process_id,
        transfer_flow: stored.transfer_flow,
        authorization: stored.authorization,
        endpoint: stored.endpoint,
      });
    }

    Ok(out)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_id_accepts_hex_object_ids() {
    let oid = Store::parse_id("65f0aa11bb22cc33dd44ee55").unwrap();
    assert_eq!(oid.to_hex(), "65f0aa11bb22cc33dd44ee55");
  }

  #[test]
  fn parse_id_rejects_garbage() {
    let err = Store::parse_id("edc-provider-01").unwrap_err();
    assert!(err.to_string().contains("invalid connector id"));
  }
}
