//! Timeout helpers
//!
//! Wraps async operations in `tokio::time::timeout` and reports expiry as
//! [`LensError::Timeout`].
//!
//! ```ignore
//! let reply = with_timeout(
//!     config.timeout(),
//!     async { model.generate(&prompt).await },
//!     "Gemini generateContent",
//! )
//! .await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{LensError, Result};

/// Execute an async operation with a timeout
///
/// Returns a timeout error if the operation doesn't complete within the
/// specified duration.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(LensError::timeout(operation_name, timeout)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_timeout_success() {
        let result = with_timeout(
            Duration::from_secs(1),
            async { Ok::<_, LensError>(42) },
            "test operation",
        )
        .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout_expires() {
        let result = with_timeout(
            Duration::from_millis(10),
            async {
                tokio::time::sleep(Duration::from_secs(1)).await;
                Ok::<_, LensError>(42)
            },
            "slow operation",
        )
        .await;
        match result {
            Err(LensError::Timeout { operation, duration }) => {
                assert_eq!(operation, "slow operation");
                assert_eq!(duration, Duration::from_millis(10));
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_with_timeout_passes_inner_error() {
        let result: Result<()> = with_timeout(
            Duration::from_secs(1),
            async { Err(LensError::Config("bad".into())) },
            "failing operation",
        )
        .await;
        assert!(matches!(result, Err(LensError::Config(_))));
    }
}
