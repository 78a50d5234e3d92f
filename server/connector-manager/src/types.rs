//! Domain and wire types (MongoDB documents + JSON contracts of the REST API).

use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// EDC vocabulary namespace used in JSON-LD contexts.
pub const EDC_NS: &str = "https://w3id.org/edc/v0.0.1/ns/";

/// ODRL JSON-LD context for policy definitions.
pub const ODRL_CONTEXT: &str = "http://www.w3.org/ns/odrl.jsonld";

// ---------------------------------------------------------------------------
// Connector
// ---------------------------------------------------------------------------

/// Role of a connector in the dataspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorType {
  Provider,
  Consumer,
}

impl fmt::Display for ConnectorType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Provider => write!(f, "provider"),
      Self::Consumer => write!(f, "consumer"),
    }
  }
}

/// Operational state of a connector instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
  Running,
  Stopped,
}

/// Where the connector runs: launched by this backend or reachable remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorMode {
  Managed,
  Remote,
}

/// Ports a managed connector exposes (one per EDC web context).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
  pub http: u16,
  pub management: u16,
  pub protocol: u16,
  pub control: u16,
  pub public: u16,
  pub version: u16,
}

/// Endpoints of a remote connector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
  pub management: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub protocol: Option<String>,
}

/// An EDC connector instance, as stored in the `connectors` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<ObjectId>,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind: ConnectorType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ports: Option<PortConfig>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  pub state: ConnectorState,
  pub mode: ConnectorMode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoints_url: Option<Endpoints>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
}

impl Connector {
  /// Hex form of the MongoDB id ("" for a document that was never inserted).
  pub fn hex_id(&self) -> String {
    self.id.map(|id| id.to_hex()).unwrap_or_default()
  }

  pub fn into_response(self) -> ConnectorResponse {
    ConnectorResponse {
      id: self.hex_id(),
      name: self.name,
      description: self.description,
      kind: self.kind,
      ports: self.ports,
      state: self.state,
      mode: self.mode,
      endpoints_url: self.endpoints_url,
      api_key: self.api_key,
    }
  }
}

/// Connector as returned by the API (ObjectId flattened to a hex string).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorResponse {
  pub id: String,
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind: ConnectorType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ports: Option<PortConfig>,
  pub state: ConnectorState,
  pub mode: ConnectorMode,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoints_url: Option<Endpoints>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
}

/// Partial update of a connector; absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorUpdate {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
  pub kind: Option<ConnectorType>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ports: Option<PortConfig>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub api_key: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub state: Option<ConnectorState>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mode: Option<ConnectorMode>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoints_url: Option<Endpoints>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub domain: Option<String>,
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataAddressType {
  HttpData,
  File,
}

impl fmt::Display for DataAddressType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::HttpData => write!(f, "HttpData"),
      Self::File => write!(f, "File"),
    }
  }
}

/// A data asset registered in a connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
  pub asset_id: String,
  pub name: String,
  pub content_type: String,
  pub data_address_name: String,
  pub data_address_type: DataAddressType,
  pub data_address_proxy: bool,
  pub base_url: String,
  /// Id of the connector the asset belongs to.
  pub edc: String,
}

// ---------------------------------------------------------------------------
// Policy (ODRL)
// ---------------------------------------------------------------------------

/// Comparison operator of a constraint (e.g. "EQ", "NEQ", "GT", "LT").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operator {
  pub id: String,
}

/// A conditional restriction on a rule (e.g. "purpose EQ research").
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraint {
  #[serde(rename = "leftOperand")]
  pub left_operand: String,
  pub operator: Operator,
  #[serde(rename = "rightOperand")]
  pub right_operand: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RuleAction {
  Use,
  Read,
  Write,
  Modify,
  Delete,
  Log,
  Notify,
  Anonymize,
}

impl RuleAction {
  /// Parse an action as it appears in Management API responses.
  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "USE" => Some(Self::Use),
      "READ" => Some(Self::Read),
      "WRITE" => Some(Self::Write),
      "MODIFY" => Some(Self::Modify),
      "DELETE" => Some(Self::Delete),
      "LOG" => Some(Self::Log),
      "NOTIFY" => Some(Self::Notify),
      "ANONYMIZE" => Some(Self::Anonymize),
      _ => None,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Use => "USE",
      Self::Read => "READ",
      Self::Write => "WRITE",
      Self::Modify => "MODIFY",
      Self::Delete => "DELETE",
      Self::Log => "LOG",
      Self::Notify => "NOTIFY",
      Self::Anonymize => "ANONYMIZE",
    }
  }
}

/// One permission, prohibition or obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
  pub action: RuleAction,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub constraint: Option<Vec<Constraint>>,
}

fn default_odrl_context() -> String {
  ODRL_CONTEXT.to_string()
}

fn default_policy_type() -> String {
  "Set".to_string()
}

fn default_edc_context() -> Value {
  json!({ "@vocab": EDC_NS })
}

/// A complete ODRL policy body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyDefinition {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub permission: Option<Vec<Rule>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prohibition: Option<Vec<Rule>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub obligation: Option<Vec<Rule>>,
  #[serde(default = "default_odrl_context")]
  pub context: String,
  #[serde(rename = "type", default = "default_policy_type")]
  pub kind: String,
}

/// A policy definition bound to one connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
  /// Id of the connector the policy lives in.
  pub edc: String,
  pub policy_id: String,
  pub policy: PolicyDefinition,
  #[serde(default = "default_edc_context")]
  pub context: Value,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// A contract definition: links assets with access and usage policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
  /// Id of the connector the contract lives in.
  pub edc: String,
  pub contract_id: String,
  #[serde(rename = "accessPolicyId")]
  pub access_policy_id: String,
  #[serde(rename = "contractPolicyId")]
  pub contract_policy_id: String,
  #[serde(rename = "assetsSelector")]
  pub assets_selector: Vec<String>,
  #[serde(default = "default_edc_context")]
  pub context: Value,
}

// ---------------------------------------------------------------------------
// Transfer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferFlow {
  Push,
  Pull,
}

/// A completed transfer as submitted by the frontend for record keeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transfer {
  pub consumer: String,
  pub provider: String,
  pub asset: String,
  pub has_policy_id: String,
  pub negotiate_contract_id: String,
  pub contract_agreement_id: String,
  pub transfer_process_id: String,
  pub transfer_flow: TransferFlow,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authorization: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
}

/// Transfer document in the `transfers` collection (connector refs resolved
/// to ObjectIds on insert).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredTransfer {
  #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
  pub id: Option<ObjectId>,
  pub consumer: ObjectId,
  pub provider: ObjectId,
  pub asset: String,
  pub has_policy_id: String,
  pub negotiate_contract_id: String,
  pub contract_agreement_id: String,
  pub transfer_process_id: String,
  pub transfer_flow: TransferFlow,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub authorization: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
}

/// Transfer as listed by the API, with consumer/provider populated from the
/// connectors collection (null when the referenced connector is gone).
#[derive(Debug, Clone, Serialize)]
pub struct TransferResponse {
  pub id: String,
  pub consumer: Option<ConnectorResponse>,
  pub provider: Option<ConnectorResponse>,
  pub asset: String,
  pub has_policy_id: String,
  pub negotiate_contract_id: String,
  pub contract_agreement_id: String,
  pub transfer_process_id: String,
  pub transfer_flow: TransferFlow,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub authorization: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub endpoint: Option<String>,
}

// ---------------------------------------------------------------------------
// Transfer operation payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RequestCatalog {
  pub consumer: String,
  pub provider: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NegotiateContract {
  pub consumer: String,
  pub provider: String,
  pub contract_offer_id: String,
  pub asset: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContractAgreement {
  pub consumer: String,
  pub id_contract_negotiation: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartTransfer {
  pub consumer: String,
  pub provider: String,
  pub contract_agreement_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckTransfer {
  pub consumer: String,
  pub transfer_process_id: String,
}

// ---------------------------------------------------------------------------
// Generic response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct IdResponse {
  pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
  pub message: String,
}

impl MessageResponse {
  pub fn new(message: impl Into<String>) -> Self {
    Self {
      message: message.into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn connector_round_trips_through_json() {
    let json = r#"{
      "name": "EDC Provider 01",
      "type": "provider",
      "state": "stopped",
      "mode": "managed",
      "ports": {"http": 8181, "management": 8182, "protocol": 8183, "control": 8184, "public": 8185, "version": 8186},
      "api_key": "secret"
    }"#;
    let connector: Connector = serde_json::from_str(json).unwrap();
    assert_eq!(connector.kind, ConnectorType::Provider);
    assert_eq!(connector.state, ConnectorState::Stopped);
    assert_eq!(connector.mode, ConnectorMode::Managed);
    assert!(connector.id.is_none());
    assert_eq!(connector.ports.unwrap().management, 8182);

    let value = serde_json::to_value(&connector).unwrap();
    assert_eq!(value["type"], "provider");
    assert!(value.get("_id").is_none());
    assert!(value.get("description").is_none());
  }

  #[test]
  fn unknown_connector_mode_is_rejected() {
    let json = r#"{
      "name": "x",
      "type": "provider",
      "state": "stopped",
      "mode": "sideways"
    }"#;
    assert!(serde_json::from_str::<Connector>(json).is_err());
  }

  #[test]
  fn policy_defaults_fill_context_and_type() {
    let json = r#"{
      "edc": "65f0aa11bb22cc33dd44ee55",
      "policy_id": "policy-001",
      "policy": {"permission": [{"action": "USE"}]}
    }"#;
    let policy: Policy = serde_json::from_str(json).unwrap();
    assert_eq!(policy.policy.kind, "Set");
    assert_eq!(policy.policy.context, ODRL_CONTEXT);
    assert_eq!(policy.context["@vocab"], EDC_NS);
    let rules = policy.policy.permission.unwrap();
    assert_eq!(rules[0].action, RuleAction::Use);
  }

  #[test]
  fn rule_action_parse_matches_wire_form() {
    assert_eq!(RuleAction::parse("USE"), Some(RuleAction::Use));
    assert_eq!(RuleAction::parse("ANONYMIZE"), Some(RuleAction::Anonymize));
    assert_eq!(RuleAction::parse("use"), None);
  }

  #[test]
  fn contract_uses_camel_case_wire_names() {
    let contract = Contract {
      edc: "65f0aa11bb22cc33dd44ee55".into(),
      contract_id: "contract-1".into(),
      access_policy_id: "policy-a".into(),
      contract_policy_id: "policy-c".into(),
      assets_selector: vec!["asset-001".into()],
      context: default_edc_context(),
    };
    let value = serde_json::to_value(&contract).unwrap();
    assert_eq!(value["accessPolicyId"], "policy-a");
    assert_eq!(value["contractPolicyId"], "policy-c");
    assert_eq!(value["assetsSelector"][0], "asset-001");
  }
}
