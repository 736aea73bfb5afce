//! Per-call timeout for collaborator calls.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{Result, SymError};

/// Await `fut`, failing with [`SymError::Timeout`] if it does not complete
/// within `limit`.
pub async fn bounded<F, T>(operation: &str, limit: Duration, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            let limit_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX);
            warn!(operation, limit_ms, "Collaborator call timed out");
            Err(SymError::Timeout {
                operation: operation.to_string(),
                limit_ms,
            })
        }
    }
}
