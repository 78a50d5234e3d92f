//! HTTP request logger: stores the last received request body, any path.
//!
//! Push transfers point their data destination here; whatever the provider
//! delivers is kept as the "last body" and can be read back on GET /data.
//! State lives in a shared read-write cell so concurrent deliveries never
//! tear a value: readers always observe one complete body.

use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use tracing_subscriber::EnvFilter;

const DEFAULT_BODY: &str = "No data received yet.";

type LastBody = Arc<RwLock<String>>;

fn app(last_body: LastBody) -> Router {
  Router::new()
    .route("/data", get(data))
    .fallback(receive)
    .with_state(last_body)
}

/// Catch-all: accept any method/path, store the body, respond 200 empty.
async fn receive(
  State(last_body): State<LastBody>,
  method: Method,
  uri: Uri,
  body: String,
) -> StatusCode {
  tracing::info!("incoming request: {} {}", method, uri);
  tracing::info!("body:\n{}", body);

  match last_body.write() {
    Ok(mut guard) => *guard = body,
    Err(poisoned) => *poisoned.into_inner() = body,
  }

  StatusCode::OK
}

/// Return the stored last body as plain text.
async fn data(State(last_body): State<LastBody>) -> impl IntoResponse {
  let body = match last_body.read() {
    Ok(guard) => guard.clone(),
    Err(poisoned) => poisoned.into_inner().clone(),
  };
  ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .compact()
    .init();

  let port: u16 = std::env::var("HTTP_SERVER_PORT")
    .unwrap_or_else(|_| "4000".into())
    .parse()
    .expect("HTTP_SERVER_PORT must be a valid u16");

  let last_body: LastBody = Arc::new(RwLock::new(DEFAULT_BODY.to_string()));
  let app = app(last_body);

  let addr = SocketAddr::from(([0, 0, 0, 0], port));
  tracing::info!("http request logger listening on http://{}", addr);

  let listener = tokio::net::TcpListener::bind(addr).await?;
  axum::serve(listener, app).await?;

  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fresh_state() -> LastBody {
    Arc::new(RwLock::new(DEFAULT_BODY.to_string()))
  }

  #[tokio::test]
  async fn data_returns_placeholder_before_any_request() {
    let state = fresh_state();
    let response = data(State(state)).await.into_response();
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert_eq!(content_type, "text/plain; charset=utf-8");

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    assert_eq!(&bytes[..], DEFAULT_BODY.as_bytes());
  }

  #[tokio::test]
  async fn receive_stores_body_verbatim() {
    let state = fresh_state();
    let status = receive(
      State(state.clone()),
      Method::POST,
      Uri::from_static("/api/consumer/store"),
      "{\"temperature\": 21}".to_string(),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let response = data(State(state)).await.into_response();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
      .await
      .unwrap();
    assert_eq!(&bytes[..], b"{\"temperature\": 21}");
  }

  #[tokio::test]
  async fn later_body_replaces_earlier_one() {
    let state = fresh_state();
    for body in ["first", "second"] {
      receive(
        State(state.clone()),
        Method::POST,
        Uri::from_static("/"),
        body.to_string(),
      )
      .await;
    }
    assert_eq!(*state.read().unwrap(), "second");
  }

  #[tokio::test]
  async fn concurrent_writers_leave_one_of_the_written_values() {
    let state = fresh_state();
    let mut handles = Vec::new();
    for i in 0..16 {
      let state = state.clone();
      handles.push(tokio::spawn(async move {
        receive(
          State(state),
          Method::POST,
          Uri::from_static("/"),
          format!("payload-{}", i),
        )
        .await
      }));
    }
    for handle in handles {
      handle.await.unwrap();
    }

    let stored = state.read().unwrap().clone();
    assert!(stored.starts_with("payload-"), "got: {}", stored);
  }
}
