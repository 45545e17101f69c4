//! Bounded store calls

use std::future::Future;
use std::time::Duration;

use crate::storage::StoreError;

/// Await a store call, failing with [`StoreError::Timeout`] once `limit` elapses.
///
/// The inner future is dropped on timeout, so an in-flight write may or may
/// not have been applied.
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
