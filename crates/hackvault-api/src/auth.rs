use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use hackvault_access::can_authenticate;
use hackvault_db::Database;
use hackvault_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};
use hackvault_types::models::Profile;

use crate::blocking;
use crate::error::ApiError;
use crate::middleware::CurrentUser;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub admin_credentials: Vec<AdminCredential>,
}

/// An `email:password` pair that is made admin on registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredential {
    pub email: String,
    pub password: String,
}

impl AdminCredential {
    /// Parse a comma-separated `email:password` list. Malformed entries are
    /// skipped.
    pub fn parse_list(raw: &str) -> Vec<AdminCredential> {
        raw.split(',')
            .filter_map(|entry| {
                let (email, password) = entry.trim().split_once(':')?;
                if email.is_empty() || password.is_empty() {
                    return None;
                }
                Some(AdminCredential {
                    email: email.to_lowercase(),
                    password: password.to_string(),
                })
            })
            .collect()
    }

    fn matches(&self, email: &str, password: &str) -> bool {
        self.email == email && self.password == password
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(mut req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;
    req.email = req.email.to_lowercase();

    let (email, username) = (req.email.clone(), req.username.clone());
    let (email_taken, username_taken) = blocking(&state, move |db| {
        Ok((
            db.get_profile_by_email(&email)?.is_some(),
            db.get_profile_by_username(&username)?.is_some(),
        ))
    })
    .await?;
    if email_taken {
        return Err(ApiError::Conflict("email already registered".into()));
    }
    if username_taken {
        return Err(ApiError::Conflict("username already taken".into()));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))?
        .to_string();

    let is_admin = state
        .admin_credentials
        .iter()
        .any(|c| c.matches(&req.email, &req.password));

    let profile = Profile {
        id: Uuid::new_v4(),
        username: req.username,
        email: req.email,
        is_admin,
        is_approved: is_admin,
        created_at: chrono::Utc::now(),
    };

    let stored = profile.clone();
    // A concurrent registration can still win between the check and the insert.
    let created = blocking(&state, move |db| db.create_profile(&stored, &password_hash)).await?;
    if !created {
        return Err(ApiError::Conflict("username or email already registered".into()));
    }

    let token = if can_authenticate(&profile) {
        Some(create_token(&state, &profile)?)
    } else {
        None
    };

    info!(
        "Registered {} ({})",
        profile.username,
        if profile.is_admin { "admin" } else { "pending approval" }
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user: profile,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    req.validate()?;

    let email = req.email.to_lowercase();
    let row = blocking(&state, move |db| db.get_profile_by_email(&email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized("invalid email or password".into()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&row.password_hash)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized("invalid email or password".into()))?;

    if !can_authenticate(&row.profile) {
        return Err(ApiError::Forbidden("account is awaiting admin approval".into()));
    }

    let token = create_token(&state, &row.profile)?;

    Ok(Json(LoginResponse {
        user: row.profile,
        token,
    }))
}

/// The signed-in user's current profile.
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<impl IntoResponse, ApiError> {
    let id = claims.sub;
    let row = blocking(&state, move |db| db.get_profile(id))
        .await?
        .ok_or_else(|| ApiError::NotFound("profile no longer exists".into()))?;

    Ok(Json(row.profile))
}

fn create_token(state: &AppStateInner, profile: &Profile) -> Result<String, ApiError> {
    let claims = Claims {
        sub: profile.id,
        username: profile.username.clone(),
        is_admin: profile.is_admin,
        exp: (chrono::Utc::now() + state.token_ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(state.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))
}
