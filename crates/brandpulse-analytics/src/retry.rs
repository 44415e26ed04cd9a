//! Exponential back-off with jitter for completion requests.

use std::future::Future;
use std::time::Duration;

use crate::llm::CompletionError;

const MAX_DELAY_MS: u64 = 60_000;

/// Timeouts, connect failures, 429 and 5xx are worth another attempt.
pub(crate) fn is_retriable(err: &CompletionError) -> bool {
    match err {
        CompletionError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status()
                    .is_some_and(|s| s.is_server_error() || s.as_u16() == 429)
        }
        CompletionError::Status { status, .. } => *status == 429 || (500..600).contains(status),
        CompletionError::Decode { .. }
        | CompletionError::EmptyResponse
        | CompletionError::InvalidBaseUrl(_) => false,
    }
}

/// Delay before retry number `attempt` (1-based), before jitter.
pub(crate) fn backoff_delay_ms(backoff_base_ms: u64, attempt: u32) -> u64 {
    backoff_base_ms
        .saturating_mul(1u64 << attempt.saturating_sub(1).min(10))
        .min(MAX_DELAY_MS)
}

/// Runs `operation`, retrying transient failures up to `max_retries` times.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, CompletionError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CompletionError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = backoff_delay_ms(backoff_base_ms, attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "completion request failed, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;

    fn status(code: u16) -> CompletionError {
        CompletionError::Status {
            status: code,
            body: String::new(),
        }
    }

    #[test]
    fn rate_limit_and_server_errors_are_retriable() {
        assert!(is_retriable(&status(429)));
        assert!(is_retriable(&status(503)));
        assert!(!is_retriable(&status(400)));
        assert!(!is_retriable(&status(401)));
        assert!(!is_retriable(&CompletionError::EmptyResponse));
    }

    #[test]
    fn delay_doubles_and_caps() {
        assert_eq!(backoff_delay_ms(1_000, 1), 1_000);
        assert_eq!(backoff_delay_ms(1_000, 2), 2_000);
        assert_eq!(backoff_delay_ms(1_000, 3), 4_000);
        assert_eq!(backoff_delay_ms(1_000, 30), MAX_DELAY_MS);
    }

    #[tokio::test]
    async fn gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = retry_with_backoff(2, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(status(502))
            }
        })
        .await;
        assert!(matches!(result, Err(CompletionError::Status { status: 502, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result: Result<(), _> = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err(status(400))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = Arc::clone(&calls);
        let result = retry_with_backoff(3, 0, || {
            let c = Arc::clone(&c);
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(status(429))
                } else {
                    Ok(7)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
