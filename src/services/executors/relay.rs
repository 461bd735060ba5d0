// Relay executor over HTTP
//
// Forwards a bucket of queries to the executor endpoint of its service family
// and reads back keyed results. Translation to the Azure REST APIs and parsing
// of their payloads happen behind that endpoint.
use crate::api::middleware::AppError;
use crate::models::{Query, QueryContext, QueryResult, ResultSet, ServiceType, TimeRange};
use crate::services::executors::executor::BackendExecutor;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;
use url::Url;

pub struct RelayExecutor {
    service: ServiceType,
    endpoint: Url,
    api_key: Option<String>,
    client: Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayRequest<'a> {
    queries: &'a [Query],
    time_range: &'a TimeRange,
}

#[derive(Debug, Deserialize)]
struct RelayResponse {
    #[serde(default)]
    results: BTreeMap<String, QueryResult>,
}

impl RelayExecutor {
    pub fn new(
        service: ServiceType,
        base_url: &str,
        api_key: Option<String>,
        client: Client,
    ) -> Result<Self, AppError> {
        let mut base = Url::parse(base_url)
            .map_err(|e| AppError::Validation(format!("Invalid datasource URL: {}", e)))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(AppError::Validation(
                "Datasource URL must use http:// or https:// scheme".to_string(),
            ));
        }

        // Url::join replaces the last segment unless the path ends in '/'
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let endpoint = base
            .join(service.path())
            .map_err(|e| AppError::Validation(format!("Invalid executor endpoint: {}", e)))?;

        Ok(Self {
            service,
            endpoint,
            api_key,
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post(&self, queries: &[Query], time_range: &TimeRange) -> Result<ResultSet, AppError> {
        let request = RelayRequest {
            queries,
            time_range,
        };

        let mut builder = self.client.post(self.endpoint.clone()).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::backend(self.service, format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::backend(
                self.service,
                format!("executor endpoint returned {}: {}", status, error_body),
            ));
        }

        let body = response
            .json::<RelayResponse>()
            .await
            .map_err(|e| AppError::backend(self.service, format!("Failed to parse executor response: {}", e)))?;

        // Results are keyed by the map key; a body refId that disagrees with it is a relay bug
        let mut set = ResultSet::new();
        for (ref_id, mut result) in body.results {
            if !result.ref_id.is_empty() && result.ref_id != ref_id {
                return Err(AppError::backend(
                    self.service,
                    format!(
                        "executor endpoint returned result {} under refId {}",
                        result.ref_id, ref_id
                    ),
                ));
            }
            result.ref_id = ref_id;
            set.insert(result);
        }
        Ok(set)
    }
}

#[async_trait::async_trait]
impl BackendExecutor for RelayExecutor {
    fn service_type(&self) -> ServiceType {
        self.service
    }

    async fn execute_time_series_query(
        &self,
        ctx: &QueryContext,
        queries: &[Query],
        time_range: &TimeRange,
    ) -> Result<ResultSet, AppError> {
        if queries.is_empty() {
            return Ok(ResultSet::new());
        }

        let start = Instant::now();
        tracing::debug!(
            service = %self.service,
            endpoint = %self.endpoint,
            queries = queries.len(),
            "Relaying queries to executor endpoint"
        );

        let set = ctx.run(self.post(queries, time_range)).await?;

        tracing::debug!(
            service = %self.service,
            results = set.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Executor endpoint responded"
        );

        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        extract::Json,
        http::{HeaderMap, StatusCode},
        routing::post,
        Router,
    };
    use serde_json::{json, Value};
    use std::time::Duration;

    /// Serve `router` on an ephemeral local port and return its base URL
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/api", addr)
    }

    async fn echo(headers: HeaderMap, Json(body): Json<Value>) -> Json<Value> {
        let authorization = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut results = serde_json::Map::new();
        for query in body["queries"].as_array().unwrap() {
            let ref_id = query["refId"].as_str().unwrap().to_string();
            results.insert(
                ref_id,
                json!({
                    "meta": {
                        "authorization": authorization,
                        "from": body["timeRange"]["from"],
                    }
                }),
            );
        }
        Json(json!({ "results": results }))
    }

    fn time_range() -> TimeRange {
        TimeRange::new("now-3h", "now")
    }

    #[test]
    fn test_endpoint_joins_service_path() {
        let executor = RelayExecutor::new(
            ServiceType::AzureLogAnalytics,
            "http://relay.local:8080/api",
            None,
            Client::new(),
        )
        .unwrap();
        assert_eq!(
            executor.endpoint().as_str(),
            "http://relay.local:8080/api/loganalytics"
        );
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let result = RelayExecutor::new(
            ServiceType::AzureMonitor,
            "ftp://relay.local",
            None,
            Client::new(),
        );
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_empty_bucket_sends_no_request() {
        // Nothing listens on the discard port; any request would fail
        let executor = RelayExecutor::new(
            ServiceType::AzureMonitor,
            "http://127.0.0.1:9",
            None,
            Client::new(),
        )
        .unwrap();

        let set = executor
            .execute_time_series_query(&QueryContext::new(), &[], &time_range())
            .await
            .unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_relays_bucket_and_keys_results() {
        let base = serve(Router::new().route("/api/appinsights", post(echo))).await;
        let executor = RelayExecutor::new(
            ServiceType::ApplicationInsights,
            &base,
            Some("token-123".to_string()),
            Client::new(),
        )
        .unwrap();

        let queries = vec![
            Query::new("A", "Application Insights", json!({ "appInsights": {} })),
            Query::new("B", "Application Insights", json!({ "appInsights": {} })),
        ];
        let set = executor
            .execute_time_series_query(&QueryContext::new(), &queries, &time_range())
            .await
            .unwrap();

        assert_eq!(set.len(), 2);
        let a = set.get("A").unwrap();
        assert_eq!(a.ref_id, "A");
        assert_eq!(a.meta.as_ref().unwrap()["authorization"], "Bearer token-123");
        assert_eq!(a.meta.as_ref().unwrap()["from"], "now-3h");
    }

    #[tokio::test]
    async fn test_error_status_is_backend_error() {
        async fn unauthorized() -> (StatusCode, &'static str) {
            (StatusCode::UNAUTHORIZED, "invalid client secret")
        }

        let base = serve(Router::new().route("/api/azuremonitor", post(unauthorized))).await;
        let executor =
            RelayExecutor::new(ServiceType::AzureMonitor, &base, None, Client::new()).unwrap();

        let queries = vec![Query::new("A", "Azure Monitor", json!({}))];
        let err = executor
            .execute_time_series_query(&QueryContext::new(), &queries, &time_range())
            .await
            .unwrap_err();

        match err {
            AppError::BackendExecution { service, message } => {
                assert_eq!(service, ServiceType::AzureMonitor);
                assert!(message.contains("401"));
                assert!(message.contains("invalid client secret"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_mismatched_result_ref_id_is_backend_error() {
        async fn mislabelled() -> Json<Value> {
            Json(json!({ "results": { "A": { "refId": "B" } } }))
        }

        let base = serve(Router::new().route("/api/loganalytics", post(mislabelled))).await;
        let executor =
            RelayExecutor::new(ServiceType::AzureLogAnalytics, &base, None, Client::new()).unwrap();

        let queries = vec![Query::new("A", "Azure Log Analytics", json!({}))];
        let err = executor
            .execute_time_series_query(&QueryContext::new(), &queries, &time_range())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::BackendExecution { service: ServiceType::AzureLogAnalytics, .. }
        ));
    }

    #[tokio::test]
    async fn test_honors_cancellation() {
        async fn slow() -> Json<Value> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({ "results": {} }))
        }

        let base = serve(Router::new().route("/api/insightsanalytics", post(slow))).await;
        let executor =
            RelayExecutor::new(ServiceType::InsightsAnalytics, &base, None, Client::new()).unwrap();

        let ctx = QueryContext::new();
        let canceller = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            canceller.cancel();
        });

        let queries = vec![Query::new("A", "Insights Analytics", json!({}))];
        let result = tokio::time::timeout(
            Duration::from_secs(5),
            executor.execute_time_series_query(&ctx, &queries, &time_range()),
        )
        .await
        .expect("executor did not stop after cancellation");

        assert!(matches!(result, Err(AppError::Cancelled(_))));
    }
}
