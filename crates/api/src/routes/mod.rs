//! HTTP handlers, one module per resource.

pub mod customers;
pub mod health;
pub mod inventory;
pub mod metrics;
pub mod orders;
pub mod products;
pub mod reports;

use std::sync::Arc;

use crate::AppState;
use crate::error::ApiError;

/// Runs an engine call on the blocking pool.
///
/// Engine writes hold locks across durable store I/O, so they stay off the
/// async workers.
pub(crate) async fn blocking<T, F>(state: &Arc<AppState>, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&AppState) -> domain::Result<T> + Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| ApiError::Internal(format!("engine task failed: {e}")))?
        .map_err(ApiError::from)
}
