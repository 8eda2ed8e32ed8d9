//! Bounded retry over a fallible async operation.

use std::future::Future;

use tokio::time::{sleep, Duration};

use nimbus_core::{NimbusError, Result};

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAY_MS: u64 = 5_000;

/// Runs `op` up to `attempts` times with `delay` between attempts,
/// surfacing the last error when every attempt fails. `op` receives
/// the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    label: &str,
    attempts: u32,
    delay: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut last_error = NimbusError::Http(format!("{}: no attempts were made", label));

    for attempt in 1..=attempts {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(error) => {
                tracing::warn!(
                    "{}: attempt {}/{} failed: {}",
                    label,
                    attempt,
                    attempts,
                    error
                );
                last_error = error;
                if attempt < attempts {
                    sleep(delay).await;
                }
            }
        }
    }

    Err(last_error)
}
