// Backend executor trait for the Azure service families
use crate::api::middleware::AppError;
use crate::models::{Query, QueryContext, ResultSet, ServiceType, TimeRange};

/// Backend executor trait - one implementation per service family
///
/// Executors own everything vendor specific: building and authenticating the
/// HTTP calls, translating query models and parsing the responses. The
/// dispatcher only sees keyed results or an error.
#[async_trait::async_trait]
pub trait BackendExecutor: Send + Sync {
    /// Service family this executor serves
    fn service_type(&self) -> ServiceType;

    /// Execute a bucket of queries over the batch time range
    ///
    /// Must accept an empty bucket and return an empty result set for it.
    /// Must stop work once `ctx` is cancelled.
    async fn execute_time_series_query(
        &self,
        ctx: &QueryContext,
        queries: &[Query],
        time_range: &TimeRange,
    ) -> Result<ResultSet, AppError>;
}
