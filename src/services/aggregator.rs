use std::collections::BTreeMap;

use crate::models::{AggregatedResponse, ResultSet, ServiceType};

/// Output of a merge: the response plus every ref id that more than one
/// service returned
#[derive(Debug, Clone, Default)]
pub struct MergedResults {
    pub response: AggregatedResponse,
    pub collisions: Vec<String>,
}

impl MergedResults {
    pub fn has_collisions(&self) -> bool {
        !self.collisions.is_empty()
    }
}

pub struct ResultAggregator;

impl ResultAggregator {
    /// Fold result sets into one response, in the order given
    ///
    /// Ref ids are expected to be unique across services. When they are not,
    /// the later result set wins and the ref id is reported in `collisions`.
    pub fn merge<I>(results: I) -> MergedResults
    where
        I: IntoIterator<Item = (ServiceType, ResultSet)>,
    {
        let mut merged = MergedResults::default();
        let mut owners: BTreeMap<String, ServiceType> = BTreeMap::new();

        for (service, set) in results {
            for (ref_id, result) in set.results {
                if let Some(previous) = owners.insert(ref_id.clone(), service) {
                    tracing::warn!(
                        ref_id = %ref_id,
                        previous = %previous,
                        replacement = %service,
                        "Duplicate refId across services, keeping the later result"
                    );
                    if !merged.collisions.contains(&ref_id) {
                        merged.collisions.push(ref_id.clone());
                    }
                }
                merged.response.results.insert(ref_id, result);
            }
        }

        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryResult;
    use serde_json::json;

    fn set(entries: &[(&str, i64)]) -> ResultSet {
        entries
            .iter()
            .map(|(ref_id, marker)| QueryResult::new(*ref_id).with_meta(json!({ "marker": marker })))
            .collect()
    }

    #[test]
    fn test_merge_is_union_of_result_sets() {
        let merged = ResultAggregator::merge(vec![
            (ServiceType::AzureMonitor, set(&[("A", 1)])),
            (ServiceType::ApplicationInsights, ResultSet::new()),
            (ServiceType::AzureLogAnalytics, set(&[("B", 2), ("C", 3)])),
            (ServiceType::InsightsAnalytics, set(&[("D", 4)])),
        ]);

        assert!(!merged.has_collisions());
        let keys: Vec<&str> = merged.response.results.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["A", "B", "C", "D"]);
        assert_eq!(merged.response.get("C").unwrap().meta, Some(json!({ "marker": 3 })));
    }

    #[test]
    fn test_later_result_set_wins_on_collision() {
        let inputs = || {
            vec![
                (ServiceType::AzureMonitor, set(&[("X", 1), ("A", 1)])),
                (ServiceType::ApplicationInsights, set(&[("X", 2)])),
                (ServiceType::AzureLogAnalytics, ResultSet::new()),
                (ServiceType::InsightsAnalytics, set(&[("X", 4)])),
            ]
        };

        let merged = ResultAggregator::merge(inputs());
        assert_eq!(merged.collisions, vec!["X".to_string()]);
        assert_eq!(merged.response.len(), 2);
        assert_eq!(merged.response.get("X").unwrap().meta, Some(json!({ "marker": 4 })));

        for _ in 0..5 {
            assert_eq!(ResultAggregator::merge(inputs()).response, merged.response);
        }
    }

    #[test]
    fn test_merge_of_nothing_is_empty() {
        let merged = ResultAggregator::merge(Vec::<(ServiceType, ResultSet)>::new());
        assert!(merged.response.is_empty());
        assert!(!merged.has_collisions());
    }
}
