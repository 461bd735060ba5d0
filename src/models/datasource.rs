use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection info of a configured datasource, shared by all of its executors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSourceInfo {
    /// Instance id, attached to the logs of every endpoint built for it
    pub id: String,
    pub name: String,
    /// Registry key of the datasource type
    pub plugin_id: String,
    /// Base URL of the executor endpoints; empty when none are configured
    pub url: String,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl DataSourceInfo {
    pub fn new(name: impl Into<String>, plugin_id: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            plugin_id: plugin_id.into(),
            url: url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|key| !key.is_empty());
        self
    }

    pub fn has_url(&self) -> bool {
        !self.url.trim().is_empty()
    }
}
