// Query dispatcher for the Azure Monitor datasource
//
// Splits a frontend batch by service family, runs the four backend executors
// and merges their results into one response keyed by refId. A batch fails as
// a whole: the first error of any step is returned and nothing partial is.
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinSet;

use crate::api::middleware::AppError;
use crate::models::{
    AggregatedResponse, DataSourceInfo, QueryBatch, QueryContext, ResultSet, ServiceType,
};
use crate::services::aggregator::ResultAggregator;
use crate::services::classifier::{Buckets, QueryClassifier};
use crate::services::executors::ExecutorSet;
use crate::services::registry::{EndpointRegistry, QueryEndpoint};

/// Plugin id the dispatcher is registered under
pub const AZURE_MONITOR_PLUGIN_ID: &str = "grafana-azure-monitor-datasource";

/// What to do when two services return the same refId
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Keep the result of the service dispatched last
    #[default]
    Overwrite,
    /// Fail the batch
    Reject,
}

impl FromStr for CollisionPolicy {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "overwrite" => Ok(CollisionPolicy::Overwrite),
            "reject" => Ok(CollisionPolicy::Reject),
            _ => Err(AppError::Config(format!("Unknown collision policy: {}", s))),
        }
    }
}

/// How the four executors are driven
///
/// With `Concurrent`, which error is reported when several services fail is
/// not deterministic. `Sequential` always reports the first failing service in
/// dispatch order and never starts the services after it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanOut {
    #[default]
    Concurrent,
    Sequential,
}

impl FromStr for FanOut {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "concurrent" => Ok(FanOut::Concurrent),
            "sequential" => Ok(FanOut::Sequential),
            _ => Err(AppError::Config(format!("Unknown fan-out mode: {}", s))),
        }
    }
}

/// Dispatcher settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSettings {
    /// Per-batch deadline, on top of whatever the caller's context carries
    pub timeout: Option<Duration>,
    pub collision_policy: CollisionPolicy,
    pub fan_out: FanOut,
}

pub struct Dispatcher {
    executors: ExecutorSet,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(executors: ExecutorSet) -> Self {
        Self {
            executors,
            settings: DispatchSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DispatchSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Register the dispatcher factory under the Azure Monitor plugin id
    ///
    /// Each datasource created through the registry gets its own dispatcher
    /// whose executors share `client`.
    pub fn register(
        registry: &mut EndpointRegistry,
        client: Client,
        settings: DispatchSettings,
    ) -> Result<(), AppError> {
        registry.register(AZURE_MONITOR_PLUGIN_ID, move |datasource: &DataSourceInfo| {
            let executors = ExecutorSet::for_datasource(datasource, client.clone())?;
            let dispatcher = Dispatcher::new(executors).with_settings(settings);
            Ok(Arc::new(dispatcher) as Arc<dyn QueryEndpoint>)
        })
    }

    /// Execute a batch: classify, run every executor, merge
    pub async fn execute(
        &self,
        ctx: &QueryContext,
        batch: QueryBatch,
    ) -> Result<AggregatedResponse, AppError> {
        let start = Instant::now();
        tracing::info!(
            request_id = ctx.request_id(),
            queries = batch.queries.len(),
            from = %batch.time_range.from,
            to = %batch.time_range.to,
            "Dispatching query batch"
        );

        let buckets = QueryClassifier::classify(&batch).map_err(|e| {
            tracing::warn!(request_id = ctx.request_id(), "Rejecting query batch: {}", e);
            e
        })?;

        // Cancelling the child stops the remaining executors without touching the caller
        let ctx = match self.settings.timeout {
            Some(timeout) => ctx.child().with_timeout(timeout),
            None => ctx.child(),
        };

        let outcome = match self.settings.fan_out {
            FanOut::Concurrent => self.run_concurrent(&ctx, buckets, &batch).await,
            FanOut::Sequential => self.run_sequential(&ctx, buckets, &batch).await,
        };

        let result_sets = match outcome {
            Ok(sets) => sets,
            Err(e) => {
                ctx.cancel();
                tracing::error!(
                    request_id = ctx.request_id(),
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Query batch failed: {}",
                    e
                );
                return Err(e);
            }
        };

        let merged = ResultAggregator::merge(ServiceType::ALL.into_iter().zip(result_sets));
        if merged.has_collisions() && self.settings.collision_policy == CollisionPolicy::Reject {
            return Err(AppError::RefIdCollision(merged.collisions));
        }

        tracing::info!(
            request_id = ctx.request_id(),
            results = merged.response.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Query batch completed"
        );

        Ok(merged.response)
    }

    /// Run the executors as concurrent tasks, returning on the first error
    async fn run_concurrent(
        &self,
        ctx: &QueryContext,
        mut buckets: Buckets,
        batch: &QueryBatch,
    ) -> Result<[ResultSet; 4], AppError> {
        let mut tasks = JoinSet::new();

        for service in ServiceType::ALL {
            let executor = self.executors.get(service);
            let queries = buckets.take(service);
            let time_range = batch.time_range.clone();
            let task_ctx = ctx.clone();

            tracing::debug!(
                request_id = ctx.request_id(),
                service = %service,
                queries = queries.len(),
                "Starting backend executor"
            );

            tasks.spawn(async move {
                let outcome = task_ctx
                    .run(executor.execute_time_series_query(&task_ctx, &queries, &time_range))
                    .await;
                (service, outcome)
            });
        }

        let mut result_sets: [ResultSet; 4] = Default::default();

        // Dropping the JoinSet on an early return aborts whatever is still running
        loop {
            let joined = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                joined = tasks.join_next() => joined,
            };

            let Some(joined) = joined else { break };
            let (service, outcome) = joined
                .map_err(|e| AppError::Internal(format!("Executor task failed: {}", e)))?;

            let set = outcome.map_err(|e| {
                tracing::error!(service = %service, "Backend executor failed: {}", e);
                e
            })?;

            tracing::debug!(service = %service, results = set.len(), "Backend executor finished");
            result_sets[service.index()] = set;
        }

        Ok(result_sets)
    }

    /// Run the executors one after another in dispatch order
    async fn run_sequential(
        &self,
        ctx: &QueryContext,
        mut buckets: Buckets,
        batch: &QueryBatch,
    ) -> Result<[ResultSet; 4], AppError> {
        let mut result_sets: [ResultSet; 4] = Default::default();

        for service in ServiceType::ALL {
            let executor = self.executors.get(service);
            let queries = buckets.take(service);

            let set = ctx
                .run(executor.execute_time_series_query(ctx, &queries, &batch.time_range))
                .await
                .map_err(|e| {
                    tracing::error!(service = %service, "Backend executor failed: {}", e);
                    e
                })?;

            tracing::debug!(service = %service, results = set.len(), "Backend executor finished");
            result_sets[service.index()] = set;
        }

        Ok(result_sets)
    }
}

#[async_trait::async_trait]
impl QueryEndpoint for Dispatcher {
    async fn query(
        &self,
        ctx: &QueryContext,
        batch: QueryBatch,
    ) -> Result<AggregatedResponse, AppError> {
        self.execute(ctx, batch).await
    }
}
