use axum::{Json, extract::State, response::IntoResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

pub async fn list_categories(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let categories = blocking(&state, |db| db.list_categories()).await?;
    Ok(Json(categories))
}
