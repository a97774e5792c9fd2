pub mod auth;
pub mod channels;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod provider;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::{
    Json, Router,
    middleware::from_fn_with_state,
    routing::{delete, get},
};
use tracing::error;

use feedwatch_db::Database;

use crate::provider::IdentityProvider;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub provider: Arc<dyn IdentityProvider>,
    pub jwt_secret: String,
    /// Where a successful login lands when no usable `redirect_to` is given.
    pub landing_path: String,
    pub session_ttl: chrono::Duration,
}

/// All routes, with the session guard applied to everything but the login
/// callback and health check. Transport layers (CORS, tracing) are added by
/// the server binary.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/auth/callback", get(auth::callback))
        .route("/health", get(health));

    let protected_routes = Router::new()
        .route("/auth/session", get(auth::current_session))
        .route("/channels", get(channels::list_channels).post(channels::add_channel))
        .route("/channels/{channel_id}", delete(channels::delete_channel))
        .route("/messages/search", get(messages::search_messages))
        .route_layer(from_fn_with_state(state.clone(), middleware::require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Run a blocking store call off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> anyhow::Result<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!("spawn_blocking join error: {}", e)
        })?
}
