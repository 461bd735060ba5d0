pub mod query;

use std::sync::Arc;

use crate::config::Config;
use crate::services::QueryEndpoint;

/// Application state
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub endpoint: Arc<dyn QueryEndpoint>,
}
