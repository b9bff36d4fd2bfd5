use std::sync::Arc;

use tracing::error;

use playground_db::{PlaygroundStore, StoreResult};
use playground_geo::Geocoder;

use crate::error::ApiError;
use crate::session::SessionKeys;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub store: Arc<dyn PlaygroundStore>,
    pub geocoder: Arc<dyn Geocoder>,
    pub sessions: SessionKeys,
    /// Mounts `/auth/dev/{username}`. Never enable in production.
    pub dev_login: bool,
}

impl AppStateInner {
    /// Runs a store call on the blocking pool.
    pub(crate) async fn blocking<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&dyn PlaygroundStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(e.into())
            })?
            .map_err(ApiError::from)
    }
}
