use std::collections::HashSet;

use crate::api::middleware::AppError;
use crate::models::{Query, QueryBatch, ServiceType};

/// Queries of a batch grouped by service type
///
/// There is always one bucket per service type; most of them are usually
/// empty. Each bucket keeps the batch order of its queries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Buckets {
    buckets: [Vec<Query>; 4],
}

impl Buckets {
    pub fn get(&self, service: ServiceType) -> &[Query] {
        &self.buckets[service.index()]
    }

    /// Move a bucket out, leaving it empty
    pub fn take(&mut self, service: ServiceType) -> Vec<Query> {
        std::mem::take(&mut self.buckets[service.index()])
    }

    /// Total number of queries across buckets
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&mut self, service: ServiceType, query: Query) {
        self.buckets[service.index()].push(query);
    }
}

pub struct QueryClassifier;

impl QueryClassifier {
    /// Partition a batch by declared service type
    ///
    /// Fails on the first query whose type is not one of the four service
    /// families. Alert rule queries, for instance, end up here and must not be
    /// dropped silently. A refId repeated within the batch is rejected too,
    /// since one of the two results would otherwise be overwritten.
    pub fn classify(batch: &QueryBatch) -> Result<Buckets, AppError> {
        let mut buckets = Buckets::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(batch.queries.len());

        for query in &batch.queries {
            if !seen.insert(query.ref_id.as_str()) {
                return Err(AppError::Validation(format!(
                    "Duplicate refId in batch: {}",
                    query.ref_id
                )));
            }
            let service: ServiceType = query.query_type.parse()?;
            buckets.push(service, query.clone());
        }

        Ok(buckets)
    }
}
