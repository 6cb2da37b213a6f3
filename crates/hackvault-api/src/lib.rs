pub mod admin;
pub mod auth;
pub mod categories;
pub mod content;
pub mod error;
pub mod middleware;

use axum::{
    Json, Router, middleware as axum_middleware,
    routing::{get, patch, post},
};
use serde_json::json;
use tracing::error;

use hackvault_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;

/// All routes of the data service. Auth is resolved once per request by
/// `resolve_viewer`; handlers pick the level they need through the
/// `CurrentUser` / `MaybeUser` / `AdminUser` extractors.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/categories", get(categories::list_categories))
        .route(
            "/content/{kind}",
            get(content::list_content).post(content::create_content),
        )
        .route(
            "/content/{kind}/{id}",
            get(content::get_content).delete(content::delete_content),
        )
        .route("/content/{kind}/{id}/visibility", patch(content::set_visibility))
        .route("/posts/{id}/thread", get(content::get_thread))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/users/pending", get(admin::list_pending))
        .route("/admin/users/{id}/approve", post(admin::approve_user))
        .route("/admin/users/{id}/reject", post(admin::reject_user))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::resolve_viewer,
        ))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Run a database call off the async runtime.
pub(crate) async fn blocking<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal("database task failed".into())
        })?
        .map_err(ApiError::Database)
}
