use std::sync::Arc;

use tracing::error;

use bloodbridge_db::Database;
use bloodbridge_notify::Notifier;

use crate::error::ApiError;
use crate::presence::Presence;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub notifier: Notifier,
    pub jwt_secret: String,
    /// How long a login session (and its token) stays valid.
    pub session_ttl: chrono::Duration,
    pub presence: Presence,
}

impl AppStateInner {
    pub fn new(db: Database, notifier: Notifier, jwt_secret: String, session_ttl: chrono::Duration) -> AppState {
        Arc::new(Self {
            db,
            notifier,
            jwt_secret,
            session_ttl,
            presence: Presence::default(),
        })
    }
}

/// Run blocking DB work off the async runtime.
pub async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed"))
        })?
        .map_err(ApiError::from)
}
