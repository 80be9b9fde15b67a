//! Detached execution of mutations.
//!
//! A mutation is its repository write plus the cache invalidation that follows it.
//! Both run on a spawned task, so dropping the caller's future (a disconnected
//! client, a timeout) cannot stop the cascade between the write and the eviction.

use std::future::Future;

use tracing::error;

use super::error::AppError;

/// Run `task` to completion on the runtime and await its outcome.
pub async fn run_to_completion<T, F>(operation: &'static str, task: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(task).await {
        Ok(outcome) => outcome,
        Err(join_error) => {
            error!(operation, error = %join_error, "Mutation task did not complete");
            Err(AppError::infrastructure(format!(
                "{operation} did not complete: {join_error}"
            )))
        }
    }
}
