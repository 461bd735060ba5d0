// Request-scoped cancellation and deadline
//
// A QueryContext travels with a batch through the dispatcher into every
// backend executor. Child contexts share the deadline and are cancelled with
// their parent, but cancelling a child leaves the parent untouched.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::middleware::AppError;

#[derive(Debug, Clone)]
pub struct QueryContext {
    request_id: String,
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            token: CancellationToken::new(),
            deadline: None,
        }
    }

    /// Bound the context by `timeout` from now, keeping any earlier deadline
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Derive a context that is cancelled whenever this one is
    pub fn child(&self) -> Self {
        Self {
            request_id: self.request_id.clone(),
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the context is cancelled or its deadline passes
    pub async fn done(&self) -> AppError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => self.cancelled_error(),
                _ = tokio::time::sleep_until(deadline) => AppError::DeadlineExceeded(
                    format!("request {} ran past its deadline", self.request_id),
                ),
            },
            None => {
                self.token.cancelled().await;
                self.cancelled_error()
            }
        }
    }

    /// Drive `fut` to completion unless the context ends first
    pub async fn run<F, T>(&self, fut: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        if self.is_cancelled() {
            return Err(self.cancelled_error());
        }

        tokio::select! {
            biased;
            err = self.done() => Err(err),
            result = fut => result,
        }
    }

    fn cancelled_error(&self) -> AppError {
        AppError::Cancelled(format!("request {} was cancelled", self.request_id))
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::new()
    }
}
