//! Local lifecycle of managed connectors: runtime files, certificates,
//! Postgres bootstrap and Docker Compose orchestration.
//!
//! Each managed connector gets a runtime dir `{RUNTIME_PATH}/{id}` holding
//! `resources/configuration/config.properties`, `resources/certs/cert.pfx`
//! and a `docker-compose.yml`; start renders all three, prepares the
//! connector's Postgres database and brings the stack up.

use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{Connection, PgConnection};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::ExitStatus;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::{sleep, Duration, Instant};

use crate::config::Config;
use crate::types::{Connector, ConnectorType};

/// Build context of the http-request-logger image, relative to the backend's
/// working directory.
const LOGGER_BUILD_CONTEXT: &str = "util/http-request-logger";

/// Seconds to wait for PostgreSQL before giving up.
const POSTGRES_WAIT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum LauncherError {
  #[error("io: {0}")]
  Io(#[from] std::io::Error),

  #[error("connector ports not configured")]
  MissingPorts,

  #[error("connector API key not configured")]
  MissingApiKey,

  #[error("keytool failed: {0}")]
  Keytool(String),

  #[error("{what} exited with {status}: {stderr}")]
  Command {
    what: String,
    status: ExitStatus,
    stderr: String,
  },

  #[error("postgres: {0}")]
  Postgres(#[from] sqlx::Error),

  #[error("PostgreSQL not available after {0} seconds")]
  PostgresTimeout(u64),

  #[error("init script not found: {}", .0.display())]
  InitScriptMissing(PathBuf),
}

// ---------------------------------------------------------------------------
// Start / stop
// ---------------------------------------------------------------------------

/// Full start sequence for a managed connector.
pub async fn launch(connector: &Connector, config: &Config) -> Result<(), LauncherError> {
  let id = connector.hex_id();
  let base = config.runtime_path.join(&id);

  generate_files(connector, &base, config).await?;
  ensure_network(&config.network_name).await?;

  let db_name = connector_database(connector.kind, &id);
  prepare_database(config, &db_name).await?;

  compose_up(&base).await?;
  Ok(())
}

/// Stop sequence: compose down and wipe the runtime dir.
pub async fn shutdown(base: &Path) -> Result<(), LauncherError> {
  compose_down(base).await?;
  tokio::fs::remove_dir_all(base).await?;
  Ok(())
}

/// Database name the connector's default datasource points at.
pub fn connector_database(kind: ConnectorType, id: &str) -> String {
  format!("edc_{}_{}", kind, id)
}

// ---------------------------------------------------------------------------
// Runtime file generation
// ---------------------------------------------------------------------------

/// Render `config.properties` for a connector runtime.
pub fn render_config_properties(
  connector: &Connector,
  id: &str,
  config: &Config,
) -> Result<String, LauncherError> {
  let ports = connector.ports.ok_or(LauncherError::MissingPorts)?;
  let api_key = connector
    .api_key
    .as_deref()
    .filter(|key| !key.is_empty())
    .ok_or(LauncherError::MissingApiKey)?;
  let kind = connector.kind;

  let mut out = format!(
    r#"edc.hostname=localhost
edc.participant.id={kind}
edc.dsp.callback.address=http://edc-{kind}-{id}:{protocol}/protocol
web.http.port={http}
web.http.path=/api
web.http.management.port={management}
web.http.management.path=/management
web.http.protocol.port={protocol}
web.http.protocol.path=/protocol
edc.transfer.proxy.token.signer.privatekey.alias=private-key
edc.transfer.proxy.token.verifier.publickey.alias=public-key
web.http.public.port={public}
web.http.public.path=/public
web.http.control.port={control}
web.http.control.path=/control
web.http.version.port={version}
web.http.version.path=/version

# --- Datasource: default (used by SqlAssetIndex and SqlDataPlaneStore) ---
edc.datasource.default.url=jdbc:postgresql://edc_postgres:{pg_port}/edc_{kind}_{id}
edc.datasource.default.user={pg_user}
edc.datasource.default.password={pg_password}
edc.datasource.default.driver=org.postgresql.Driver
edc.datasource.default.name=default

web.http.management.auth.type=tokenbased
web.http.management.auth.key={api_key}
"#,
    kind = kind,
    id = id,
    http = ports.http,
    management = ports.management,
    protocol = ports.protocol,
    public = ports.public,
    control = ports.control,
    version = ports.version,
    pg_port = config.postgres.port,
    pg_user = config.postgres.user,
    pg_password = config.postgres.password,
    api_key = api_key,
  );

  // Providers additionally expose the data-plane public endpoint.
  if kind == ConnectorType::Provider {
    out.push_str(&format!(
      "\nedc.dataplane.proxy.public.endpoint=http://edc-{}-{}:{}/public\n",
      kind, id, ports.public
    ));
  }

  Ok(out)
}

/// Render the per-connector `docker-compose.yml`.
pub fn render_compose(
  connector: &Connector,
  id: &str,
  keystore_password: &str,
  config: &Config,
) -> Result<String, LauncherError> {
  let ports = connector.ports.ok_or(LauncherError::MissingPorts)?;
  let kind = connector.kind;
  let runtime_path = config.runtime_path.display();
  let virtual_host = connector.domain.as_deref().unwrap_or_default();

  Ok(format!(
    r#"services:
  {kind}:
    image: {image}
    platform: linux/amd64
    container_name: edc-{kind}-{id}
    ports:
      - "{http}:{http}"
      - "{management}:{management}"
      - "{protocol}:{protocol}"
      - "{public}:{public}"
      - "{control}:{control}"
      - "{version}:{version}"
    volumes:
      - {runtime_path}/{id}/resources/configuration:/app/configuration
      - {runtime_path}/{id}/resources/certs:/app/certs
    environment:
      - EDC_KEYSTORE_PASSWORD={keystore_password}
      - VIRTUAL_HOST={virtual_host}
      - VIRTUAL_PORT={http}
    networks:
      - {network}

networks:
  {network}:
    external: true
"#,
    kind = kind,
    id = id,
    image = config.connector_image,
    http = ports.http,
    management = ports.management,
    protocol = ports.protocol,
    public = ports.public,
    control = ports.control,
    version = ports.version,
    runtime_path = runtime_path,
    keystore_password = keystore_password,
    virtual_host = virtual_host,
    network = config.network_name,
  ))
}

/// Write config.properties and docker-compose.yml under `base`.
pub async fn write_runtime_files(
  connector: &Connector,
  base: &Path,
  keystore_password: &str,
  config: &Config,
) -> Result<(), LauncherError> {
  let id = connector.hex_id();
  let config_dir = base.join("resources").join("configuration");
  let certs_dir = base.join("resources").join("certs");
  tokio::fs::create_dir_all(&config_dir).await?;
  tokio::fs::create_dir_all(&certs_dir).await?;

  let properties = render_config_properties(connector, &id, config)?;
  tokio::fs::write(config_dir.join("config.properties"), properties).await?;

  let compose = render_compose(connector, &id, keystore_password, config)?;
  tokio::fs::write(base.join("docker-compose.yml"), compose).await?;

  Ok(())
}

/// Render all runtime files and generate the keystore.
async fn generate_files(
  connector: &Connector,
  base: &Path,
  config: &Config,
) -> Result<(), LauncherError> {
  let keystore_password = random_password();
  write_runtime_files(connector, base, &keystore_password, config).await?;
  generate_keystore(
    &base.join("resources").join("certs"),
    &connector.hex_id(),
    &keystore_password,
  )
  .await?;
  Ok(())
}

fn random_password() -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(22)
    .map(char::from)
    .collect()
}

/// Generate the PKCS#12 keystore via keytool.
async fn generate_keystore(
  certs_dir: &Path,
  id: &str,
  password: &str,
) -> Result<(), LauncherError> {
  let cert_path = certs_dir.join("cert.pfx");
  if let Err(e) = tokio::fs::remove_file(&cert_path).await {
    if e.kind() != std::io::ErrorKind::NotFound {
      return Err(e.into());
    }
  }

  let output = Command::new("keytool")
    .args([
      "-genkeypair",
      "-alias",
      "private-key",
      "-keyalg",
      "RSA",
      "-keysize",
      "2048",
      "-keystore",
    ])
    .arg(&cert_path)
    .args(["-storetype", "PKCS12", "-storepass"])
    .arg(password)
    .arg("-keypass")
    .arg(password)
    .arg("-dname")
    .arg(format!("CN={}", id))
    .output()
    .await?;

  if !output.status.success() {
    return Err(LauncherError::Keytool(format!(
      "stdout: {} stderr: {}",
      String::from_utf8_lossy(&output.stdout).trim(),
      String::from_utf8_lossy(&output.stderr).trim()
    )));
  }
  Ok(())
}

// ---------------------------------------------------------------------------
// Postgres bootstrap
// ---------------------------------------------------------------------------

/// Wait for Postgres, create the connector database if absent, run init.sql.
async fn prepare_database(config: &Config, db_name: &str) -> Result<(), LauncherError> {
  wait_for_postgres(config).await?;

  let mut admin = PgConnection::connect(&config.postgres.url("postgres")).await?;
  let exists = database_exists(&mut admin, db_name).await?;

  if exists {
    tracing::info!("database '{}' already exists", db_name);
  } else {
    create_database(&mut admin, db_name).await?;
    tracing::info!("database '{}' created", db_name);
  }
  admin.close().await.ok();

  run_init_script(config, db_name).await
}

// The three helpers below return an explicitly `Send`-boxed future. Boxing at a
// concrete-lifetime call site sidesteps a rustc higher-ranked-lifetime
// limitation (`Executor is not general enough`) that otherwise makes the
// enclosing handler future fail axum's `Send` bound.
type DbFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, sqlx::Error>> + Send + 'a>>;

/// Whether a database named `db_name` already exists.
fn database_exists<'a>(conn: &'a mut PgConnection, db_name: &'a str) -> DbFuture<'a, bool> {
  Box::pin(async move {
    Ok(
      sqlx::query("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(db_name)
        .fetch_optional(conn)
        .await?
        .is_some(),
    )
  })
}

/// Create a database named `db_name`.
fn create_database<'a>(conn: &'a mut PgConnection, db_name: &'a str) -> DbFuture<'a, ()> {
  Box::pin(async move {
    sqlx::raw_sql(&format!("CREATE DATABASE \"{}\"", db_name))
      .execute(&mut *conn)
      .await?;
    Ok(())
  })
}

/// Execute a single SQL statement, ignoring its result set.
fn exec_statement<'a>(conn: &'a mut PgConnection, sql: &'a str) -> DbFuture<'a, ()> {
  Box::pin(async move {
    sqlx::raw_sql(sql).execute(&mut *conn).await?;
    Ok(())
  })
}

async fn wait_for_postgres(config: &Config) -> Result<(), LauncherError> {
  let deadline = Instant::now() + Duration::from_secs(POSTGRES_WAIT_SECS);
  loop {
    match PgConnection::connect(&config.postgres.url("postgres")).await {
      Ok(conn) => {
        conn.close().await.ok();
        return Ok(());
      }
      Err(_) if Instant::now() < deadline => sleep(Duration::from_secs(1)).await,
      Err(_) => return Err(LauncherError::PostgresTimeout(POSTGRES_WAIT_SECS)),
    }
  }
}

/// Execute the statements of `{CONFIG_PATH}/init.sql` against the connector
/// database. Individual statement failures are logged and skipped.
async fn run_init_script(config: &Config, db_name: &str) -> Result<(), LauncherError> {
  let script_path = config.config_path.join("init.sql");
  if !script_path.exists() {
    return Err(LauncherError::InitScriptMissing(script_path));
  }
  let script = tokio::fs::read_to_string(&script_path).await?;

  let mut conn = PgConnection::connect(&config.postgres.url(db_name)).await?;
  for statement in script.split(';') {
    let statement = statement.trim();
    if statement.is_empty() {
      continue;
    }
    if let Err(e) = exec_statement(&mut conn, statement).await {
      tracing::warn!("init.sql statement failed: {}", e);
    }
  }
  conn.close().await.ok();

  tracing::info!("init.sql executed for '{}'", db_name);
  Ok(())
}

// ---------------------------------------------------------------------------
// Docker plumbing
// ---------------------------------------------------------------------------

async fn run(command: &mut Command, what: &str) -> Result<std::process::Output, LauncherError> {
  let output = command.output().await?;
  if !output.status.success() {
    return Err(LauncherError::Command {
      what: what.into(),
      status: output.status,
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    });
  }
  Ok(output)
}

async fn compose_up(dir: &Path) -> Result<(), LauncherError> {
  run(
    Command::new("docker").args(["compose", "up", "-d"]).current_dir(dir),
    "docker compose up",
  )
  .await?;
  Ok(())
}

async fn compose_down(dir: &Path) -> Result<(), LauncherError> {
  run(
    Command::new("docker").args(["compose", "down"]).current_dir(dir),
    "docker compose down",
  )
  .await?;
  Ok(())
}

/// Create the connector network unless it already exists.
pub async fn ensure_network(name: &str) -> Result<(), LauncherError> {
  let output = run(
    Command::new("docker").args(["network", "ls", "--format", "{{.Name}}"]),
    "docker network ls",
  )
  .await?;

  let names = String::from_utf8_lossy(&output.stdout);
  if names.lines().any(|line| line.trim() == name) {
    return Ok(());
  }

  run(
    Command::new("docker").args(["network", "create", name]),
    "docker network create",
  )
  .await?;
  Ok(())
}

/// Start or reuse the http-logger container on the connector network.
pub async fn start_logger(config: &Config) -> Result<(), LauncherError> {
  let running = Command::new("docker")
    .args([
      "ps",
      "--filter",
      "name=http-logger",
      "--filter",
      "status=running",
      "-q",
    ])
    .output()
    .await;
  if let Ok(output) = running {
    if output.status.success() && !output.stdout.is_empty() {
      tracing::info!("http-logger container already running");
      return Ok(());
    }
  }

  let exited = Command::new("docker")
    .args([
      "ps",
      "-a",
      "--filter",
      "name=http-logger",
      "--filter",
      "status=exited",
      "-q",
    ])
    .output()
    .await;
  if let Ok(output) = exited {
    if output.status.success() && !output.stdout.is_empty() {
      run(
        Command::new("docker").args(["start", "http-logger"]),
        "docker start",
      )
      .await?;
      tracing::info!("http-logger container restarted");
      return Ok(());
    }
  }

  run(
    Command::new("docker").args(["build", "-t", "http-request-logger", LOGGER_BUILD_CONTEXT]),
    "docker build",
  )
  .await?;
  run(
    Command::new("docker").args([
      "run",
      "-d",
      "--name",
      "http-logger",
      "--network",
      &config.network_name,
      "-p",
      &format!("{}:4000", config.logger_port),
      "http-request-logger",
    ]),
    "docker run",
  )
  .await?;
  tracing::info!("http-logger container created");
  Ok(())
}

/// Remove the http-logger container (force).
pub async fn stop_logger() -> Result<(), LauncherError> {
  run(
    Command::new("docker").args(["rm", "-f", "http-logger"]),
    "docker rm",
  )
  .await?;
  Ok(())
}
