use crate::error::AppError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Runs `op` up to `max_retries` times, sleeping `base_delay * 2^(attempt-1)`
/// between attempts. Authentication and authorization failures are returned
/// immediately.
pub async fn with_retry<T, F, Fut>(
    mut op: F,
    max_retries: u32,
    base_delay: Duration,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let max_retries = max_retries.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt >= max_retries || !err.is_retryable() => return Err(err),
            Err(err) => {
                let delay = base_delay * 2u32.saturating_pow(attempt - 1);
                warn!(
                    "Attempt {}/{} failed: {}, retrying in {:?}",
                    attempt, max_retries, err, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
