use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

use crate::config::default_parallelism;
use crate::error::{BatchFailure, CoordinatorError};

/// Runs a function over a batch of items with bounded concurrency.
#[derive(Debug, Clone)]
pub struct BoundedTaskPool {
    limit: usize,
}

impl Default for BoundedTaskPool {
    fn default() -> Self {
        Self::new(default_parallelism())
    }
}

impl BoundedTaskPool {
    /// Creates a pool admitting at most `limit` items at once (minimum 1).
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Applies `f` to every item and waits for all of them.
    ///
    /// The returned vector has one slot per input item, in input order.
    /// Errors do not short-circuit the batch.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, f: F) -> Vec<Result<T, CoordinatorError>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, CoordinatorError>>,
    {
        if items.is_empty() {
            return Vec::new();
        }

        let semaphore = Arc::new(Semaphore::new(self.limit));
        let f = &f;
        let futures = items.into_iter().map(|item| {
            let sem = semaphore.clone();
            async move {
                // The semaphore is local and never closed, so acquire cannot fail.
                let _permit = sem.acquire().await.ok();
                f(item).await
            }
        });

        futures::future::join_all(futures).await
    }
}

/// Splits batch results into values or the aggregated failures.
pub fn collect_batch<T>(results: Vec<Result<T, CoordinatorError>>) -> Result<Vec<T>, BatchFailure> {
    let mut values = Vec::with_capacity(results.len());
    let mut failure = BatchFailure::default();
    for result in results {
        match result {
            Ok(value) => values.push(value),
            Err(e) => failure.errors.push(e),
        }
    }
    failure.into_result(values)
}
