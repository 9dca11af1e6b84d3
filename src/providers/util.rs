use crate::core::error::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retries an async operation while it fails with a transient error
///
/// # Parameters
/// - `operation`: Closure returning a future
/// - `retries`: Number of retry attempts (total runs = 1 initial + retries)
/// - `delay_ms`: Milliseconds between retry attempts
///
/// # Returns
/// Either the successful result or the last error. Non-transient errors
/// are returned immediately.
pub async fn with_retry<F, Fut, T>(mut operation: F, retries: usize, delay_ms: u64) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(err) => {
                if attempt > retries || !err.is_transient() {
                    return Err(err);
                }
                debug!(
                    "Attempt {}/{} failed: {}. Retrying...",
                    attempt, retries, err
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}

/// Classifies a non-success upstream HTTP status.
pub fn status_error(status: reqwest::StatusCode, what: &str) -> Error {
    if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        Error::UpstreamUnavailable(format!("HTTP error: {status} for {what}"))
    } else {
        Error::UpstreamDataError(format!("HTTP error: {status} for {what}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_retries_transient_errors() {
        let calls = AtomicUsize::new(0);
        let result = with_retry(
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::UpstreamUnavailable("down".into()))
                } else {
                    Ok(n)
                }
            },
            3,
            1,
        )
        .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_retries() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamUnavailable("down".into()))
            },
            2,
            1,
        )
        .await;

        assert!(matches!(result, Err(Error::UpstreamUnavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let calls = AtomicUsize::new(0);
        let result: Result<()> = with_retry(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::UpstreamDataError("garbage".into()))
            },
            5,
            1,
        )
        .await;

        assert!(matches!(result, Err(Error::UpstreamDataError(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_status_error_classification() {
        assert!(status_error(reqwest::StatusCode::BAD_GATEWAY, "x").is_transient());
        assert!(status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "x").is_transient());
        assert!(!status_error(reqwest::StatusCode::BAD_REQUEST, "x").is_transient());
    }
}
