use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of one query, as produced by a backend executor
///
/// The payload fields are opaque to the dispatcher. A query that failed on
/// its own, without failing the batch, carries `error`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    #[serde(default)]
    pub ref_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dataframes: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QueryResult {
    pub fn new(ref_id: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            ..Default::default()
        }
    }

    /// Per-query failure
    pub fn failed(ref_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            ref_id: ref_id.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn with_series(mut self, series: Vec<Value>) -> Self {
        self.series = series;
        self
    }

    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Keyed results of one backend executor
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ResultSet {
    #[serde(default)]
    pub results: BTreeMap<String, QueryResult>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a result under its own ref id, returning any result it replaced
    pub fn insert(&mut self, result: QueryResult) -> Option<QueryResult> {
        self.results.insert(result.ref_id.clone(), result)
    }

    pub fn get(&self, ref_id: &str) -> Option<&QueryResult> {
        self.results.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl FromIterator<QueryResult> for ResultSet {
    fn from_iter<I: IntoIterator<Item = QueryResult>>(iter: I) -> Self {
        let mut set = ResultSet::new();
        for result in iter {
            set.insert(result);
        }
        set
    }
}

/// Merged results of every executor for one batch
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregatedResponse {
    pub results: BTreeMap<String, QueryResult>,
}

impl AggregatedResponse {
    pub fn get(&self, ref_id: &str) -> Option<&QueryResult> {
        self.results.get(ref_id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
