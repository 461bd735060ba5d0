use std::collections::HashMap;
use std::sync::Arc;

use crate::api::middleware::AppError;
use crate::models::{AggregatedResponse, DataSourceInfo, QueryBatch, QueryContext};

/// Something that answers a whole query batch for one datasource
#[async_trait::async_trait]
pub trait QueryEndpoint: Send + Sync {
    async fn query(
        &self,
        ctx: &QueryContext,
        batch: QueryBatch,
    ) -> Result<AggregatedResponse, AppError>;
}

/// Builds the query endpoint of a configured datasource
pub type EndpointFactory =
    Arc<dyn Fn(&DataSourceInfo) -> Result<Arc<dyn QueryEndpoint>, AppError> + Send + Sync>;

/// Datasource plugin registry
///
/// Owned by the composition root. Plugins are registered once during
/// bootstrap and looked up by plugin id when a datasource is instantiated.
#[derive(Default)]
pub struct EndpointRegistry {
    factories: HashMap<String, EndpointFactory>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, plugin_id: impl Into<String>, factory: F) -> Result<(), AppError>
    where
        F: Fn(&DataSourceInfo) -> Result<Arc<dyn QueryEndpoint>, AppError> + Send + Sync + 'static,
    {
        let plugin_id = plugin_id.into();
        if self.factories.contains_key(&plugin_id) {
            return Err(AppError::Config(format!(
                "Plugin {} is already registered",
                plugin_id
            )));
        }

        tracing::info!("Registered query endpoint for plugin {}", plugin_id);
        self.factories.insert(plugin_id, Arc::new(factory));
        Ok(())
    }

    pub fn contains(&self, plugin_id: &str) -> bool {
        self.factories.contains_key(plugin_id)
    }

    pub fn plugin_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Instantiate the query endpoint for a datasource
    pub fn create(&self, datasource: &DataSourceInfo) -> Result<Arc<dyn QueryEndpoint>, AppError> {
        let factory = self.factories.get(&datasource.plugin_id).ok_or_else(|| {
            AppError::NotFound(format!(
                "No query endpoint registered for plugin {}",
                datasource.plugin_id
            ))
        })?;

        tracing::info!(
            datasource_id = %datasource.id,
            "Creating query endpoint for datasource {} ({})",
            datasource.name,
            datasource.plugin_id
        );
        factory(datasource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptyEndpoint;

    #[async_trait::async_trait]
    impl QueryEndpoint for EmptyEndpoint {
        async fn query(
            &self,
            _ctx: &QueryContext,
            _batch: QueryBatch,
        ) -> Result<AggregatedResponse, AppError> {
            Ok(AggregatedResponse::default())
        }
    }

    fn empty_factory(_: &DataSourceInfo) -> Result<Arc<dyn QueryEndpoint>, AppError> {
        Ok(Arc::new(EmptyEndpoint))
    }

    #[test]
    fn test_register_and_create() {
        let mut registry = EndpointRegistry::new();
        registry.register("test-plugin", empty_factory).unwrap();

        assert!(registry.contains("test-plugin"));
        assert_eq!(registry.plugin_ids(), vec!["test-plugin"]);

        let datasource = DataSourceInfo::new("test", "test-plugin", "");
        assert!(registry.create(&datasource).is_ok());
    }

    #[test]
    fn test_duplicate_registration_is_rejected() {
        let mut registry = EndpointRegistry::new();
        registry.register("test-plugin", empty_factory).unwrap();

        assert!(matches!(
            registry.register("test-plugin", empty_factory),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_unknown_plugin_is_not_found() {
        let registry = EndpointRegistry::new();
        let datasource = DataSourceInfo::new("test", "missing-plugin", "");
        assert!(matches!(
            registry.create(&datasource),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn test_registries_are_independent() {
        let mut first = EndpointRegistry::new();
        first.register("test-plugin", empty_factory).unwrap();

        let second = EndpointRegistry::new();
        assert!(!second.contains("test-plugin"));
    }
}
