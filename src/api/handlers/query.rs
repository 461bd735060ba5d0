use axum::{extract::State, Json};
use serde::Deserialize;

use crate::api::handlers::AppState;
use crate::api::middleware::AppError;
use crate::models::{AggregatedResponse, Query, QueryBatch, QueryContext, TimeRange};

/// Query request as sent by the dashboard frontend
#[derive(Debug, Deserialize)]
pub struct DataQueryRequest {
    #[serde(default = "default_from")]
    pub from: String,
    #[serde(default = "default_to")]
    pub to: String,
    #[serde(default)]
    pub queries: Vec<serde_json::Value>,
}

fn default_from() -> String {
    "now-6h".to_string()
}

fn default_to() -> String {
    "now".to_string()
}

/// Execute a batch of frontend queries against the configured datasource
pub async fn query_data(
    State(state): State<AppState>,
    Json(payload): Json<DataQueryRequest>,
) -> Result<Json<AggregatedResponse>, AppError> {
    if payload.queries.is_empty() {
        return Err(AppError::Validation("At least one query is required".to_string()));
    }

    let queries = payload
        .queries
        .into_iter()
        .map(Query::from_model)
        .collect::<Result<Vec<_>, _>>()?;

    let batch = QueryBatch::new(queries, TimeRange::new(payload.from, payload.to));
    let ctx = QueryContext::new();

    tracing::info!(
        request_id = ctx.request_id(),
        datasource = %state.config.datasource.name,
        "Executing {} queries",
        batch.queries.len()
    );

    // The handler future is dropped when the client disconnects
    let _guard = ctx.token().clone().drop_guard();
    let response = state.endpoint.query(&ctx, batch).await?;

    Ok(Json(response))
}
