// Backend executors, one per Azure service family
pub mod executor;
pub mod relay;
pub mod unavailable;

pub use executor::BackendExecutor;
pub use relay::RelayExecutor;
pub use unavailable::UnavailableExecutor;

use crate::api::middleware::AppError;
use crate::models::{DataSourceInfo, ServiceType};
use reqwest::Client;
use std::sync::Arc;

/// Factory function to create the executor of a service family
///
/// Every executor of a datasource shares the same HTTP client and connection
/// info. Without a datasource URL the family gets an executor that only
/// accepts empty buckets.
pub fn create_executor(
    service: ServiceType,
    datasource: &DataSourceInfo,
    client: Client,
) -> Result<Arc<dyn BackendExecutor>, AppError> {
    if !datasource.has_url() {
        return Ok(Arc::new(UnavailableExecutor::new(service)));
    }

    Ok(Arc::new(RelayExecutor::new(
        service,
        &datasource.url,
        datasource.api_key.clone(),
        client,
    )?))
}

/// The four executors of a datasource, addressed by service type
#[derive(Clone)]
pub struct ExecutorSet {
    executors: [Arc<dyn BackendExecutor>; 4],
}

impl ExecutorSet {
    pub fn new(
        azure_monitor: Arc<dyn BackendExecutor>,
        application_insights: Arc<dyn BackendExecutor>,
        azure_log_analytics: Arc<dyn BackendExecutor>,
        insights_analytics: Arc<dyn BackendExecutor>,
    ) -> Result<Self, AppError> {
        let executors = [
            azure_monitor,
            application_insights,
            azure_log_analytics,
            insights_analytics,
        ];

        for (expected, executor) in ServiceType::ALL.iter().zip(executors.iter()) {
            if executor.service_type() != *expected {
                return Err(AppError::Config(format!(
                    "{} executor registered in the {} slot",
                    executor.service_type(),
                    expected
                )));
            }
        }

        Ok(Self { executors })
    }

    /// Build all four executors for a datasource
    pub fn for_datasource(datasource: &DataSourceInfo, client: Client) -> Result<Self, AppError> {
        Self::new(
            create_executor(ServiceType::AzureMonitor, datasource, client.clone())?,
            create_executor(ServiceType::ApplicationInsights, datasource, client.clone())?,
            create_executor(ServiceType::AzureLogAnalytics, datasource, client.clone())?,
            create_executor(ServiceType::InsightsAnalytics, datasource, client)?,
        )
    }

    pub fn get(&self, service: ServiceType) -> Arc<dyn BackendExecutor> {
        Arc::clone(&self.executors[service.index()])
    }
}
