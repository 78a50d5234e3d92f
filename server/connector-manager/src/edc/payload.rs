//! JSON-LD payload builders and response parsers for the EDC Management API.
//!
//! The Management API speaks JSON-LD: requests carry an `@context` with the
//! EDC vocabulary, responses come back with `odrl:`-prefixed keys and
//! scalar-or-list properties. Everything shape-related lives here so the
//! client module only moves bytes.

use serde_json::{json, Map, Value};

use crate::error::ApiError;
use crate::types::{
  Asset, Constraint, Contract, DataAddressType, Operator, Policy, PolicyDefinition, Rule,
  RuleAction, EDC_NS, ODRL_CONTEXT,
};

/// Wire protocol identifier for connector-to-connector exchange.
pub const DATASPACE_PROTOCOL: &str = "dataspace-protocol-http";

/// Empty QuerySpec: "return everything" for the */request endpoints.
pub fn query_spec() -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@type": "QuerySpec"
  })
}

// ---------------------------------------------------------------------------
// Assets
// ---------------------------------------------------------------------------

pub fn asset_create(asset: &Asset) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@id": asset.asset_id,
    "properties": {
      "name": asset.name,
      "contenttype": asset.content_type
    },
    "dataAddress": {
      "type": asset.data_address_type.to_string(),
      "name": asset.data_address_name,
      "baseUrl": asset.base_url,
      "proxyPath": asset.data_address_proxy.to_string()
    }
  })
}

pub fn asset_update(asset: &Asset) -> Value {
  json!({
    "@context": {
      "@vocab": EDC_NS,
      "edc": EDC_NS,
      "odrl": "http://www.w3.org/ns/odrl/2/"
    },
    "@id": asset.asset_id,
    "@type": "Asset",
    "properties": {
      "name": asset.name,
      "contenttype": asset.content_type
    },
    "dataAddress": {
      "@type": "DataAddress",
      "type": asset.data_address_type.to_string(),
      "name": asset.data_address_name,
      "baseUrl": asset.base_url,
      "proxyPath": asset.data_address_proxy.to_string()
    }
  })
}

/// Parse one asset out of a Management API response object.
pub fn parse_asset(item: &Value, edc_id: &str) -> Result<Asset, ApiError> {
  let properties = &item["properties"];
  let data_address = &item["dataAddress"];

  let type_str = str_field(data_address, "type")?;
  let data_address_type = match type_str {
    "HttpData" => DataAddressType::HttpData,
    "File" => DataAddressType::File,
    other => {
      return Err(shape_error(format!(
        "unknown dataAddress type '{}'",
        other
      )))
    }
  };

  Ok(Asset {
    asset_id: str_field(item, "@id")?.to_string(),
    name: str_field(properties, "name")?.to_string(),
    content_type: str_field(properties, "contenttype")?.to_string(),
    data_address_name: str_field(data_address, "name")?.to_string(),
    data_address_type,
    data_address_proxy: data_address["proxyPath"].as_str() == Some("true"),
    base_url: str_field(data_address, "baseUrl")?.to_string(),
    edc: edc_id.to_string(),
  })
}

pub fn parse_assets(items: &Value, edc_id: &str) -> Result<Vec<Asset>, ApiError> {
  as_list(items)
    .iter()
    .map(|item| parse_asset(item, edc_id))
    .collect()
}

// ---------------------------------------------------------------------------
// Policy definitions (ODRL)
// ---------------------------------------------------------------------------

pub fn policy_create(policy: &Policy) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@id": policy.policy_id,
    "policy": {
      "@context": ODRL_CONTEXT,
      "@type": policy.policy.kind,
      "permission": rules_payload(policy.policy.permission.as_deref()),
      "prohibition": rules_payload(policy.policy.prohibition.as_deref()),
      "obligation": rules_payload(policy.policy.obligation.as_deref()),
    }
  })
}

fn rules_payload(rules: Option<&[Rule]>) -> Vec<Value> {
  rules
    .unwrap_or_default()
    .iter()
    .map(|rule| {
      let mut out = Map::new();
      out.insert("action".into(), json!(rule.action.as_str()));
      if let Some(constraints) = rule
        .constraint
        .as_deref()
        .filter(|constraints| !constraints.is_empty())
      {
        let constraints: Vec<Value> = constraints
          .iter()
          .map(|c| {
            json!({
              "leftOperand": c.left_operand,
              "operator": { "@id": c.operator.id },
              "rightOperand": c.right_operand
            })
          })
          .collect();
        out.insert("constraint".into(), Value::Array(constraints));
      }
      Value::Object(out)
    })
    .collect()
}

/// Parse one policy definition from the `odrl:`-prefixed response shape.
pub fn parse_policy(item: &Value, edc_id: &str) -> Result<Policy, ApiError> {
  let policy_data = &item["policy"];

  let kind = policy_data["@type"]
    .as_str()
    .unwrap_or("odrl:Set")
    .replace("odrl:", "");

  Ok(Policy {
    edc: edc_id.to_string(),
    policy_id: str_field(item, "@id")?.to_string(),
    policy: PolicyDefinition {
      permission: parse_rules(&policy_data["odrl:permission"])?,
      prohibition: parse_rules(&policy_data["odrl:prohibition"])?,
      obligation: parse_rules(&policy_data["odrl:obligation"])?,
      context: policy_data["@context"]
        .as_str()
        .unwrap_or(ODRL_CONTEXT)
        .to_string(),
      kind,
    },
    context: item
      .get("@context")
      .cloned()
      .unwrap_or_else(|| json!({ "@vocab": EDC_NS })),
  })
}

pub fn parse_policies(items: &Value, edc_id: &str) -> Result<Vec<Policy>, ApiError> {
  as_list(items)
    .iter()
    .map(|item| parse_policy(item, edc_id))
    .collect()
}

fn parse_rules(raw: &Value) -> Result<Option<Vec<Rule>>, ApiError> {
  let rules = as_list(raw);
  if rules.is_empty() {
    return Ok(None);
  }

  let mut out = Vec::with_capacity(rules.len());
  for rule in rules {
    let action_raw = rule["odrl:action"]["@id"]
      .as_str()
      .ok_or_else(|| shape_error("rule without odrl:action"))?;
    let action_name = action_raw.replace("edc:", "").replace("odrl:", "");
    let action = RuleAction::parse(&action_name)
      .ok_or_else(|| shape_error(format!("unknown rule action '{}'", action_raw)))?;

    let constraints_raw = as_list(&rule["odrl:constraint"]);
    let constraint = if constraints_raw.is_empty() {
      None
    } else {
      let mut constraints = Vec::with_capacity(constraints_raw.len());
      for c in constraints_raw {
        constraints.push(Constraint {
          left_operand: c["odrl:leftOperand"]["@id"]
            .as_str()
            .ok_or_else(|| shape_error("constraint without odrl:leftOperand"))?
            .to_string(),
          operator: Operator {
            id: c["odrl:operator"]["@id"]
              .as_str()
              .ok_or_else(|| shape_error("constraint without odrl:operator"))?
              .to_string(),
          },
          right_operand: match &c["odrl:rightOperand"] {
            Value::String(s) => s.clone(),
            other => other.to_string(),
          },
        });
      }
      Some(constraints)
    };

    out.push(Rule { action, constraint });
  }

  Ok(Some(out))
}

// ---------------------------------------------------------------------------
// Contract definitions
// ---------------------------------------------------------------------------

pub fn contract_create(contract: &Contract) -> Value {
  let selectors: Vec<Value> = contract
    .assets_selector
    .iter()
    .map(|asset_id| criterion(asset_id, true))
    .collect();

  json!({
    "@context": { "@vocab": EDC_NS },
    "@id": contract.contract_id,
    "accessPolicyId": contract.access_policy_id,
    "contractPolicyId": contract.contract_policy_id,
    "assetsSelector": selectors
  })
}

/// Update payload; a single-element selector collapses to a bare object.
pub fn contract_update(contract: &Contract) -> Value {
  let mut payload = json!({
    "@id": contract.contract_id,
    "@type": "ContractDefinition",
    "accessPolicyId": contract.access_policy_id,
    "contractPolicyId": contract.contract_policy_id,
    "@context": {
      "@vocab": EDC_NS,
      "edc": EDC_NS,
      "odrl": "http://www.w3.org/ns/odrl/2/"
    }
  });

  match contract.assets_selector.as_slice() {
    [] => {}
    [single] => {
      payload["assetsSelector"] = criterion(single, false);
    }
    many => {
      payload["assetsSelector"] = Value::Array(
        many.iter().map(|asset_id| criterion(asset_id, false)).collect(),
      );
    }
  }

  payload
}

fn criterion(asset_id: &str, qualified_type: bool) -> Value {
  let type_name = if qualified_type {
    format!("{}Criterion", EDC_NS)
  } else {
    "Criterion".to_string()
  };
  json!({
    "@type": type_name,
    "operandLeft": "id",
    "operator": "=",
    "operandRight": asset_id
  })
}

/// Parse a contract definition; assetsSelector may be an object or an array.
pub fn parse_contract(item: &Value, edc_id: &str) -> Result<Contract, ApiError> {
  let assets_selector = as_list(&item["assetsSelector"])
    .iter()
    .filter_map(|criterion| criterion["operandRight"].as_str())
    .map(str::to_string)
    .collect();

  Ok(Contract {
    edc: edc_id.to_string(),
    contract_id: str_field(item, "@id")?.to_string(),
    access_policy_id: str_field(item, "accessPolicyId")?.to_string(),
    contract_policy_id: str_field(item, "contractPolicyId")?.to_string(),
    assets_selector,
    context: item
      .get("@context")
      .cloned()
      .unwrap_or_else(|| json!({ "@vocab": EDC_NS })),
  })
}

pub fn parse_contracts(items: &Value, edc_id: &str) -> Result<Vec<Contract>, ApiError> {
  as_list(items)
    .iter()
    .map(|item| parse_contract(item, edc_id))
    .collect()
}

// ---------------------------------------------------------------------------
// Catalog / negotiation / transfer processes
// ---------------------------------------------------------------------------

pub fn catalog_request(protocol_url: &str) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "counterPartyAddress": protocol_url,
    "protocol": DATASPACE_PROTOCOL
  })
}

pub fn contract_request(protocol_url: &str, contract_offer_id: &str, asset: &str) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@type": "ContractRequest",
    "counterPartyAddress": protocol_url,
    "protocol": DATASPACE_PROTOCOL,
    "policy": {
      "@context": ODRL_CONTEXT,
      "@id": contract_offer_id,
      "@type": "Offer",
      "assigner": "provider",
      "target": asset
    }
  })
}

pub fn push_transfer_request(
  protocol_url: &str,
  contract_agreement_id: &str,
  destination_url: &str,
) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@type": "TransferRequestDto",
    "connectorId": "provider",
    "counterPartyAddress": protocol_url,
    "contractId": contract_agreement_id,
    "protocol": DATASPACE_PROTOCOL,
    "transferType": "HttpData-PUSH",
    "dataDestination": {
      "type": "HttpData",
      "baseUrl": destination_url
    }
  })
}

pub fn pull_transfer_request(protocol_url: &str, contract_agreement_id: &str) -> Value {
  json!({
    "@context": { "@vocab": EDC_NS },
    "@type": "TransferRequestDto",
    "connectorId": "provider",
    "counterPartyAddress": protocol_url,
    "contractId": contract_agreement_id,
    "protocol": DATASPACE_PROTOCOL,
    "transferType": "HttpData-PULL"
  })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// JSON-LD properties arrive as a scalar, a list, or not at all.
fn as_list(value: &Value) -> Vec<Value> {
  match value {
    Value::Array(items) => items.clone(),
    Value::Null => Vec::new(),
    other => vec![other.clone()],
  }
}

fn str_field<'a>(value: &'a Value, key: &str) -> Result<&'a str, ApiError> {
  value[key]
    .as_str()
    .ok_or_else(|| shape_error(format!("missing or non-string '{}'", key)))
}

fn shape_error(detail: impl Into<String>) -> ApiError {
  ApiError::internal(format!("unexpected EDC response: {}", detail.into()))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample_asset() -> Asset {
    Asset {
      asset_id: "asset-001".into(),
      name: "Weather Dataset".into(),
      content_type: "application/json".into(),
      data_address_name: "weather-data".into(),
      data_address_type: DataAddressType::HttpData,
      data_address_proxy: false,
      base_url: "https://data.server.com/weather".into(),
      edc: "65f0aa11bb22cc33dd44ee55".into(),
    }
  }

  #[test]
  fn asset_create_serializes_proxy_flag_as_string() {
    let payload = asset_create(&sample_asset());
    assert_eq!(payload["@id"], "asset-001");
    assert_eq!(payload["properties"]["contenttype"], "application/json");
    assert_eq!(payload["dataAddress"]["type"], "HttpData");
    assert_eq!(payload["dataAddress"]["proxyPath"], "false");
  }

  #[test]
  fn asset_parse_round_trips_create_payload() {
    let asset = sample_asset();
    let parsed = parse_asset(&asset_create(&asset), &asset.edc).unwrap();
    assert_eq!(parsed.asset_id, asset.asset_id);
    assert_eq!(parsed.name, asset.name);
    assert_eq!(parsed.data_address_type, DataAddressType::HttpData);
    assert!(!parsed.data_address_proxy);
  }

  #[test]
  fn policy_create_builds_odrl_rules() {
    let policy = Policy {
      edc: "65f0aa11bb22cc33dd44ee55".into(),
      policy_id: "policy-001".into(),
      policy: PolicyDefinition {
        permission: Some(vec![Rule {
          action: RuleAction::Use,
          constraint: Some(vec![Constraint {
            left_operand: "purpose".into(),
            operator: Operator { id: "EQ".into() },
            right_operand: "research".into(),
          }]),
        }]),
        prohibition: None,
        obligation: None,
        context: ODRL_CONTEXT.into(),
        kind: "Set".into(),
      },
      context: json!({ "@vocab": EDC_NS }),
    };

    let payload = policy_create(&policy);
    assert_eq!(payload["policy"]["@type"], "Set");
    let permission = &payload["policy"]["permission"][0];
    assert_eq!(permission["action"], "USE");
    assert_eq!(permission["constraint"][0]["operator"]["@id"], "EQ");
    assert_eq!(payload["policy"]["prohibition"], json!([]));
  }

  #[test]
  fn parse_policy_handles_odrl_prefixes_and_scalars() {
    let item = json!({
      "@id": "policy-001",
      "@context": { "@vocab": EDC_NS },
      "policy": {
        "@context": ODRL_CONTEXT,
        "@type": "odrl:Set",
        "odrl:permission": {
          "odrl:action": { "@id": "edc:USE" },
          "odrl:constraint": {
            "odrl:leftOperand": { "@id": "purpose" },
            "odrl:operator": { "@id": "EQ" },
            "odrl:rightOperand": "research"
          }
        }
      }
    });

    let policy = parse_policy(&item, "65f0aa11bb22cc33dd44ee55").unwrap();
    assert_eq!(policy.policy_id, "policy-001");
    assert_eq!(policy.policy.kind, "Set");
    let permission = policy.policy.permission.unwrap();
    assert_eq!(permission.len(), 1);
    assert_eq!(permission[0].action, RuleAction::Use);
    let constraints = permission[0].constraint.as_ref().unwrap();
    assert_eq!(constraints[0].left_operand, "purpose");
    assert_eq!(constraints[0].right_operand, "research");
    assert!(policy.policy.prohibition.is_none());
  }

  #[test]
  fn parse_policy_rejects_unknown_actions() {
    let item = json!({
      "@id": "policy-001",
      "policy": {
        "odrl:permission": { "odrl:action": { "@id": "edc:TELEPORT" } }
      }
    });
    let err = parse_policy(&item, "x").unwrap_err();
    assert!(err.to_string().contains("TELEPORT"));
  }

  #[test]
  fn contract_update_collapses_single_selector_to_object() {
    let mut contract = Contract {
      edc: "65f0aa11bb22cc33dd44ee55".into(),
      contract_id: "contract-1".into(),
      access_policy_id: "policy-a".into(),
      contract_policy_id: "policy-c".into(),
      assets_selector: vec!["asset-001".into()],
      context: json!({ "@vocab": EDC_NS }),
    };

    let single = contract_update(&contract);
    assert!(single["assetsSelector"].is_object());
    assert_eq!(single["assetsSelector"]["operandRight"], "asset-001");

    contract.assets_selector.push("asset-002".into());
    let many = contract_update(&contract);
    assert!(many["assetsSelector"].is_array());
    assert_eq!(many["assetsSelector"][1]["operandRight"], "asset-002");
  }

  #[test]
  fn parse_contract_accepts_object_and_array_selectors() {
    let object_form = json!({
      "@id": "contract-1",
      "accessPolicyId": "policy-a",
      "contractPolicyId": "policy-c",
      "assetsSelector": {
        "@type": "Criterion",
        "operandLeft": "id",
        "operator": "=",
        "operandRight": "asset-001"
      }
    });
    let contract = parse_contract(&object_form, "x").unwrap();
    assert_eq!(contract.assets_selector, vec!["asset-001"]);

    let array_form = json!({
      "@id": "contract-1",
      "accessPolicyId": "policy-a",
      "contractPolicyId": "policy-c",
      "assetsSelector": [
        { "operandRight": "asset-001" },
        { "operandRight": "asset-002" }
      ]
    });
    let contract = parse_contract(&array_form, "x").unwrap();
    assert_eq!(contract.assets_selector, vec!["asset-001", "asset-002"]);
  }

  #[test]
  fn transfer_requests_carry_the_dataspace_protocol() {
    let push = push_transfer_request(
      "http://edc-provider-1:8183/protocol",
      "agreement-001",
      "http://http-logger:4000/api/consumer/store",
    );
    assert_eq!(push["transferType"], "HttpData-PUSH");
    assert_eq!(push["protocol"], DATASPACE_PROTOCOL);
    assert_eq!(
      push["dataDestination"]["baseUrl"],
      "http://http-logger:4000/api/consumer/store"
    );

    let pull = pull_transfer_request("http://edc-provider-1:8183/protocol", "agreement-001");
    assert_eq!(pull["transferType"], "HttpData-PULL");
    assert!(pull.get("dataDestination").is_none());
  }
}
