use crate::api::middleware::AppError;
use crate::models::{Query, QueryContext, ResultSet, ServiceType, TimeRange};
use crate::services::executors::executor::BackendExecutor;

/// Stand-in for a service family with no executor endpoint configured
pub struct UnavailableExecutor {
    service: ServiceType,
}

impl UnavailableExecutor {
    pub fn new(service: ServiceType) -> Self {
        Self { service }
    }
}

#[async_trait::async_trait]
impl BackendExecutor for UnavailableExecutor {
    fn service_type(&self) -> ServiceType {
        self.service
    }

    async fn execute_time_series_query(
        &self,
        _ctx: &QueryContext,
        queries: &[Query],
        _time_range: &TimeRange,
    ) -> Result<ResultSet, AppError> {
        if queries.is_empty() {
            return Ok(ResultSet::new());
        }

        Err(AppError::backend(
            self.service,
            "no executor endpoint is configured for this datasource",
        ))
    }
}
