//! Timeout helpers for collaborator calls
//!
//! ## Usage
//!
//! ```ignore
//! use crate::ai::timeout::with_timeout;
//!
//! let response = with_timeout(
//!     Duration::from_secs(30),
//!     async { provider.generate(&prompt, &schema).await },
//!     "LLM request",
//! ).await?;
//! ```

use std::future::Future;
use std::time::Duration;

use crate::types::{AiServiceError, DocGenError, Result};

/// Execute an async operation with a timeout
///
/// Returns `DocGenError::Timeout` if the operation doesn't complete in time.
pub async fn with_timeout<T, F>(timeout: Duration, future: F, operation_name: &str) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(DocGenError::timeout(operation_name, timeout)),
    }
}

/// Apply an optional per-item timeout to a collaborator call.
///
/// `None` runs the future to completion. An elapsed timeout becomes an
/// item-level `AiServiceError` with the `Timeout` category.
pub async fn with_item_timeout<T, F>(
    timeout: Option<Duration>,
    future: F,
    operation_name: &str,
) -> std::result::Result<T, AiServiceError>
where
    F: Future<Output = std::result::Result<T, AiServiceError>>,
{
    let Some(timeout) = timeout else {
        return future.await;
    };
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(AiServiceError::timeout(operation_name, timeout)),
    }
}
