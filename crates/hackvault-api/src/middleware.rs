use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::headers::{Authorization, HeaderMapExt, authorization::Bearer};
use jsonwebtoken::{DecodingKey, Validation, decode};

use hackvault_access::Viewer;
use hackvault_types::api::Claims;

use crate::auth::AppState;
use crate::error::ApiError;

pub fn decode_token(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| ApiError::Unauthorized("invalid or expired token".into()))?;

    Ok(token_data.claims)
}

/// Validate the bearer token when one is sent and stash its claims in the
/// request extensions. Requests without a token pass through as anonymous;
/// a bad token is rejected outright.
pub async fn resolve_viewer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.headers().contains_key(header::AUTHORIZATION) {
        let bearer = req
            .headers()
            .typed_get::<Authorization<Bearer>>()
            .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".into()))?;

        let claims = decode_token(&state.jwt_secret, bearer.token())?;
        req.extensions_mut().insert(claims);
    }

    Ok(next.run(req).await)
}

/// Any signed-in user.
pub struct CurrentUser(pub Claims);

impl CurrentUser {
    pub fn viewer(&self) -> Viewer {
        Viewer::from(&self.0)
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| ApiError::Unauthorized("authentication required".into()))
    }
}

/// Signed-in user or anonymous visitor.
pub struct MaybeUser(pub Option<Claims>);

impl MaybeUser {
    pub fn viewer(&self) -> Option<Viewer> {
        self.0.as_ref().map(Viewer::from)
    }
}

impl<S> FromRequestParts<S> for MaybeUser
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(parts.extensions.get::<Claims>().cloned()))
    }
}

/// Signed-in admin.
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;
        if !claims.is_admin {
            return Err(ApiError::Forbidden("admin access required".into()));
        }
        Ok(AdminUser(claims))
    }
}
