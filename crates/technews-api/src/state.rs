use std::sync::Arc;

use tracing::error;

use technews_db::{Database, StoreResult};

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self { db })
    }
}

/// Run a store operation off the async runtime. Queries and password hashing
/// are both blocking, so every handler goes through here.
pub async fn run_blocking<F, T>(state: &AppState, op: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || op(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })?
        .map_err(ApiError::from)
}
