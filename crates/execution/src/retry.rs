//! Timed, retried record store calls.

use std::future::Future;
use std::time::Duration;

use staffline_storage::StoreError;
use tracing::warn;

use crate::config::RetryPolicy;
use crate::error::AssignError;

/// Run a store call under `timeout`, retrying transient failures with backoff.
///
/// Timeouts count as transient failures. Once `policy.max_attempts` is used
/// up the last failure is returned as [`AssignError::FatalIo`]; permanent
/// store errors are classified immediately without retrying.
pub async fn call_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    timeout: Duration,
    operation: &'static str,
    mut call: F,
) -> Result<T, AssignError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let failure = match tokio::time::timeout(timeout, call()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) if e.is_transient() => AssignError::TransientIo {
                operation,
                message: e.to_string(),
            },
            Ok(Err(e)) => return Err(AssignError::from_store(e, operation, attempt)),
            Err(_) => AssignError::TransientIo {
                operation,
                message: format!("timed out after {timeout:?}"),
            },
        };

        if attempt >= policy.max_attempts {
            let message = match failure {
                AssignError::TransientIo { message, .. } => message,
                other => other.to_string(),
            };
            return Err(AssignError::FatalIo {
                operation,
                attempts: attempt,
                message,
            });
        }

        let delay = policy.delay_for(attempt);
        warn!(operation, attempt, delay_ms = delay.as_millis() as u64, error = %failure, "Retrying store call");
        tokio::time::sleep(delay).await;
    }
}
