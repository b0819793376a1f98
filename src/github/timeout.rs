//! Per-call timeout for remote operations.

use std::future::Future;
use std::time::Duration;

use crate::types::{GuardError, Result};

/// Execute an async operation with a timeout
///
/// Returns `GuardError::Timeout` if the operation doesn't complete within the
/// specified duration. The timed-out future is dropped.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(GuardError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, GuardError>(42) },
            "fetch files",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_secs(30),
            async {
                tokio::time::sleep(Duration::from_secs(120)).await;
                Ok::<_, GuardError>(42)
            },
            "fetch content",
        )
        .await;
        match result {
            Err(GuardError::Timeout { operation, duration }) => {
                assert_eq!(operation, "fetch content");
                assert_eq!(duration, Duration::from_secs(30));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }
}
