//! Runtime file generation for managed connectors.

use mongodb::bson::oid::ObjectId;
use tempfile::TempDir;

use connector_manager::config::Config;
use connector_manager::launcher;
use connector_manager::types::{
  Connector, ConnectorMode, ConnectorState, ConnectorType, PortConfig,
};

fn provider() -> Connector {
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
    mode: ConnectorMode::Managed,
    endpoints_url: None,
    domain: Some("provider.example.org".into()),
  }
}

#[tokio::test]
async fn runtime_layout_matches_the_compose_volumes() {
  let temp = TempDir::new().unwrap();
  let config = Config {
    runtime_path: temp.path().join("runtime"),
    ..Config::default()
  };

  let connector = provider();
  let base = config.runtime_path.join(connector.hex_id());
  launcher::write_runtime_files(&connector, &base, "kspass", &config)
    .await
    .unwrap();

  let properties = std::fs::read_to_string(
    base
      .join("resources")
      .join("configuration")
      .join("config.properties"),
  )
  .unwrap();
  assert!(properties.contains("web.http.management.auth.key=secret"));
  assert!(properties.contains("edc.participant.id=provider"));

  let compose = std::fs::read_to_string(base.join("docker-compose.yml")).unwrap();
  assert!(compose.contains("container_name: edc-provider-65f0aa11bb22cc33dd44ee55"));
  assert!(compose.contains("EDC_KEYSTORE_PASSWORD=kspass"));
  // The compose volume paths point back into the runtime dir we rendered to.
  let volume_root = format!(
    "{}/65f0aa11bb22cc33dd44ee55/resources",
    config.runtime_path.display()
  );
  assert!(compose.contains(&format!("{}/configuration:/app/configuration", volume_root)));
  assert!(compose.contains(&format!("{}/certs:/app/certs", volume_root)));

  // The certs dir exists for the keystore step.
  assert!(base.join("resources").join("certs").is_dir());
}

#[tokio::test]
async fn rendering_without_ports_fails_cleanly() {
  let temp = TempDir::new().unwrap();
  let config = Config {
    runtime_path: temp.path().join("runtime"),
    ..Config::default()
  };

  let mut connector = provider();
  connector.ports = None;
  let base = config.runtime_path.join(connector.hex_id());

  let err = launcher::write_runtime_files(&connector, &base, "kspass", &config)
    .await
    .unwrap_err();
  assert!(err.to_string().contains("ports not configured"));
}
