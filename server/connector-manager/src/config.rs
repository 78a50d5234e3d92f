//! Environment-driven configuration with sane defaults.

use std::env;
use std::path::PathBuf;

/// How managed connectors are addressed from this backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
  /// Backend runs on the host: reach connectors via localhost + host port.
  Localhost,
  /// Backend runs on the connector network: reach them via service name.
  Docker,
}

/// PostgreSQL instance backing managed connectors.
#[derive(Debug, Clone)]
pub struct PostgresConfig {
  pub host: String,
  pub port: u16,
  pub user: String,
  pub password: String,
}

impl PostgresConfig {
  /// Connection URL for the given database.
  pub fn url(&self, database: &str) -> String {
    format!(
      "postgres://{}:{}@{}:{}/{}",
      self.user, self.password, self.host, self.port, database
    )
  }
}

#[derive(Debug, Clone)]
pub struct Config {
  /// API listen port.
  pub port: u16,
  pub mongodb_uri: String,
  pub mongodb_db: String,
  /// Root of per-connector runtime dirs (config, certs, compose file).
  pub runtime_path: PathBuf,
  /// Shared config dir holding init.sql.
  pub config_path: PathBuf,
  /// Docker network the connectors and the http-logger join.
  pub network_name: String,
  pub deployment: Deployment,
  /// Image used for managed connector containers.
  pub connector_image: String,
  pub postgres: PostgresConfig,
  /// Host port the http-request-logger container is published on.
  pub logger_port: u16,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      port: 8000,
      mongodb_uri: "mongodb://localhost:27017".into(),
      mongodb_db: "edc_backend".into(),
      runtime_path: PathBuf::from("runtime"),
      config_path: PathBuf::from("config"),
      network_name: "edc-network".into(),
      deployment: Deployment::Localhost,
      connector_image: "itziarmensaupc/connector:0.0.6".into(),
      postgres: PostgresConfig {
        host: "localhost".into(),
        port: 5432,
        user: "postgres".into(),
        password: "admin".into(),
      },
      logger_port: 4000,
    }
  }
}

impl Config {
  pub fn from_env() -> Self {
    let defaults = Config::default();

    Self {
      port: parse_port("PORT", defaults.port),
      mongodb_uri: env_or("MONGODB_URI", defaults.mongodb_uri),
      mongodb_db: env_or("MONGODB_DB", defaults.mongodb_db),
      runtime_path: env::var("RUNTIME_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.runtime_path),
      config_path: env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or(defaults.config_path),
      network_name: env_or("NETWORK_NAME", defaults.network_name),
      deployment: match env_or("DEPLOYMENT", "localhost".into()).as_str() {
        "localhost" => Deployment::Localhost,
        _ => Deployment::Docker,
      },
      connector_image: env_or("CONNECTOR_IMAGE", defaults.connector_image),
      postgres: PostgresConfig {
        host: env_or("POSTGRES_HOST", defaults.postgres.host),
        port: parse_port("POSTGRES_PORT", defaults.postgres.port),
        user: env_or("POSTGRES_USER", defaults.postgres.user),
        password: env_or("POSTGRES_PASS", defaults.postgres.password),
      },
      logger_port: parse_port("LOGGER_PORT", defaults.logger_port),
    }
  }
}

fn env_or(key: &str, default: String) -> String {
  env::var(key).unwrap_or(default)
}

fn parse_port(key: &str, default: u16) -> u16 {
  match env::var(key) {
    Ok(raw) => raw
      .parse()
      .unwrap_or_else(|_| panic!("{} must be a valid u16", key)),
    Err(_) => default,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_match_documented_values() {
    let config = Config::default();
    assert_eq!(config.port, 8000);
    assert_eq!(config.mongodb_uri, "mongodb://localhost:27017");
    assert_eq!(config.mongodb_db, "edc_backend");
    assert_eq!(config.network_name, "edc-network");
    assert_eq!(config.deployment, Deployment::Localhost);
    assert_eq!(config.logger_port, 4000);
  }

  #[test]
  fn postgres_url_includes_credentials_and_database() {
    let postgres = PostgresConfig {
      host: "db".into(),
      port: 5433,
      user: "postgres".into(),
      password: "admin".into(),
    };
    assert_eq!(
      postgres.url("edc_provider_abc"),
      "postgres://postgres:admin@db:5433/edc_provider_abc"
    );
  }
}
