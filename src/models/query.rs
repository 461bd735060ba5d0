use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::middleware::AppError;

/// A single frontend query
///
/// `model` is the raw query document as sent by the frontend. Only the
/// backend executor for the query's service family interprets it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Query {
    pub ref_id: String,
    /// Declared service family tag, e.g. "Azure Monitor"
    #[serde(default)]
    pub query_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_data_points: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<i64>,
    #[serde(default)]
    pub model: Value,
}

impl Query {
    pub fn new(ref_id: impl Into<String>, query_type: impl Into<String>, model: Value) -> Self {
        Self {
            ref_id: ref_id.into(),
            query_type: query_type.into(),
            max_data_points: None,
            interval_ms: None,
            model,
        }
    }

    /// Build a query from a frontend query document
    ///
    /// `refId` is required. A missing `queryType` yields an empty tag, which
    /// classification later rejects. The document is kept whole as the model.
    pub fn from_model(model: Value) -> Result<Self, AppError> {
        let object = model
            .as_object()
            .ok_or_else(|| AppError::Validation("Query must be a JSON object".to_string()))?;

        let ref_id = object
            .get("refId")
            .and_then(Value::as_str)
            .unwrap_or_default();
        if ref_id.trim().is_empty() {
            return Err(AppError::Validation("Query refId cannot be empty".to_string()));
        }

        let query_type = object
            .get("queryType")
            .and_then(Value::as_str)
            .unwrap_or_default();

        Ok(Self {
            ref_id: ref_id.to_string(),
            query_type: query_type.to_string(),
            max_data_points: object.get("maxDataPoints").and_then(Value::as_i64),
            interval_ms: object.get("intervalMs").and_then(Value::as_i64),
            model,
        })
    }
}

/// Time range shared by every query of a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeRange {
    /// Range start as sent by the frontend ("now-6h", epoch millis, ...)
    pub from: String,
    pub to: String,
    /// Instant the batch was received, used to resolve relative expressions
    pub now: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            now: Utc::now(),
        }
    }
}

/// Queries of one frontend request plus their time range
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryBatch {
    pub queries: Vec<Query>,
    pub time_range: TimeRange,
}

impl QueryBatch {
    pub fn new(queries: Vec<Query>, time_range: TimeRange) -> Self {
        Self {
            queries,
            time_range,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_model_lifts_routing_fields() {
        let doc = json!({
            "refId": "A",
            "queryType": "Azure Monitor",
            "maxDataPoints": 1200,
            "intervalMs": 60000,
            "azureMonitor": { "metricName": "Percentage CPU" }
        });

        let query = Query::from_model(doc.clone()).unwrap();
        assert_eq!(query.ref_id, "A");
        assert_eq!(query.query_type, "Azure Monitor");
        assert_eq!(query.max_data_points, Some(1200));
        assert_eq!(query.interval_ms, Some(60000));
        assert_eq!(query.model, doc);
    }

    #[test]
    fn test_from_model_keeps_ref_id_verbatim() {
        let query = Query::from_model(json!({ "refId": "A ", "queryType": "Azure Monitor" })).unwrap();
        assert_eq!(query.ref_id, "A ");
    }

    #[test]
    fn test_from_model_missing_query_type_is_empty_tag() {
        let query = Query::from_model(json!({ "refId": "B" })).unwrap();
        assert_eq!(query.query_type, "");
    }

    #[test]
    fn test_from_model_requires_ref_id() {
        assert!(matches!(
            Query::from_model(json!({ "queryType": "Azure Monitor" })),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Query::from_model(json!({ "refId": "  " })),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            Query::from_model(json!(["A"])),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_batch_serializes_camel_case() {
        let batch = QueryBatch::new(
            vec![Query::new("A", "Azure Monitor", json!({}))],
            TimeRange::new("now-6h", "now"),
        );
        let value = serde_json::to_value(&batch).unwrap();
        assert_eq!(value["timeRange"]["from"], "now-6h");
        assert_eq!(value["queries"][0]["refId"], "A");
        assert_eq!(value["queries"][0]["queryType"], "Azure Monitor");
    }
}
