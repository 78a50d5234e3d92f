//! Shared application state.

use crate::config::Config;
use crate::store::Store;

pub struct AppState {
  pub config: Config,
  pub store: Store,
  pub http: reqwest::Client,
}
