use std::sync::Arc;

use tracing::error;

use navi_db::Database;

use crate::config::{Config, JWT_EXPIRE_MINUTES_MAX};
use crate::credentials::Credentials;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub credentials: Credentials,
    pub config: Config,
}

impl AppStateInner {
    pub fn new(db: Database, config: Config) -> AppState {
        // `from_lookup` enforces the range; configs built by hand are clamped.
        let ttl_minutes = config.jwt_expire_minutes.clamp(1, JWT_EXPIRE_MINUTES_MAX);
        let credentials =
            Credentials::new(&config.jwt_secret, chrono::Duration::minutes(ttl_minutes));
        Arc::new(Self {
            db,
            credentials,
            config,
        })
    }
}

/// Run blocking database work off the async runtime.
pub async fn run_blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
}
