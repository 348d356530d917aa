use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::LlmError;

const MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 1000;

/// Run `f` with exponential backoff, retrying only retryable errors
pub async fn with_retry<F, Fut, T>(f: F) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    with_retry_delay(f, Duration::from_millis(BASE_DELAY_MS)).await
}

pub(crate) async fn with_retry_delay<F, Fut, T>(f: F, base_delay: Duration) -> Result<T, LlmError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt + 1 < MAX_ATTEMPTS => {
                let delay = base_delay * 2u32.pow(attempt);
                warn!(
                    attempt = attempt + 1,
                    max_attempts = MAX_ATTEMPTS,
                    ?delay,
                    error = %e,
                    "Provider request failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicU32::new(0);
        let result = with_retry_delay(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(LlmError::Transport("reset".into()))
                } else {
                    Ok(n)
                }
            },
            Duration::from_millis(1),
        )
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry_delay(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Api {
                    status: 500,
                    body: "boom".into(),
                })
            },
            Duration::from_millis(1),
        )
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_does_not_retry_client_errors() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry_delay(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(LlmError::Api {
                    status: 401,
                    body: "unauthorized".into(),
                })
            },
            Duration::from_millis(1),
        )
        .await;
        assert!(matches!(result, Err(LlmError::Api { status: 401, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
