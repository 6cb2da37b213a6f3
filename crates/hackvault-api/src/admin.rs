use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use hackvault_access::{account_status, approve, reject};
use hackvault_types::api::ApprovalResponse;
use hackvault_types::models::ApprovalOutcome;

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;
use crate::middleware::AdminUser;

pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = blocking(&state, |db| db.list_profiles(false)).await?;
    Ok(Json(users))
}

pub async fn list_pending(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let users = blocking(&state, |db| db.list_profiles(true)).await?;
    Ok(Json(users))
}

pub async fn approve_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| db.get_profile(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    let mut outcome = approve(account_status(&row.profile));
    if outcome == ApprovalOutcome::Approved {
        // A concurrent approval may have won; the UPDATE only counts once.
        let changed = blocking(&state, move |db| db.approve_profile(id)).await?;
        if !changed {
            outcome = ApprovalOutcome::AlreadyApproved;
        }
        info!("{} approved {}", admin.username, row.profile.username);
    }

    let user = blocking(&state, move |db| db.get_profile(id))
        .await?
        .map(|row| row.profile)
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    Ok(Json(ApprovalResponse { user, outcome }))
}

pub async fn reject_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    AdminUser(admin): AdminUser,
) -> Result<impl IntoResponse, ApiError> {
    let row = blocking(&state, move |db| db.get_profile(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("user not found".into()))?;

    reject(account_status(&row.profile)).map_err(|e| ApiError::Conflict(e.to_string()))?;

    let removed = blocking(&state, move |db| db.delete_pending_profile(id)).await?;
    if !removed {
        return Err(ApiError::Conflict("user is no longer pending".into()));
    }

    info!("{} rejected {}", admin.username, row.profile.username);
    Ok(StatusCode::NO_CONTENT)
}
