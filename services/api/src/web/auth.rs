//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user signup, login, and logout. These wrap
//! the `AuthStore` port; the workout endpoints only ever see the verified
//! user id that the middleware extracts from the session cookie.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::rest::{error_response, ErrorEnvelope};
use crate::web::state::AppState;

const SESSION_TTL_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub user_id: Uuid,
    pub email: String,
}

fn internal_error(message: &str) -> (StatusCode, Json<ErrorEnvelope>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorEnvelope {
            success: false,
            error: message.to_string(),
        }),
    )
}

fn session_cookie(auth_session_id: &str, max_age_seconds: i64) -> String {
    format!(
        "session={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        auth_session_id, max_age_seconds
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/signup - Create a new user account
#[utoipa::path(
    post,
    path = "/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created successfully", body = AuthResponse),
        (status = 400, description = "Email already registered", body = ErrorEnvelope),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn signup_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignupRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            internal_error("Failed to create user")
        })?
        .to_string();

    let user = state
        .auth
        .create_user_with_email(&req.email, &password_hash)
        .await
        .map_err(error_response)?;

    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
    state
        .auth
        .create_auth_session(&auth_session_id, user.user_id, expires_at)
        .await
        .map_err(error_response)?;

    let cookie = session_cookie(
        &auth_session_id,
        Duration::days(SESSION_TTL_DAYS).num_seconds(),
    );

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            user_id: user.user_id,
            email: user.email.unwrap_or_default(),
        }),
    ))
}

/// POST /auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials", body = ErrorEnvelope),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let invalid = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorEnvelope {
                success: false,
                error: "Invalid email or password".to_string(),
            }),
        )
    };

    let user_creds = state
        .auth
        .get_user_by_email(&req.email)
        .await
        .map_err(|_| invalid())?;

    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        internal_error("Authentication error")
    })?;

    let valid = Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_ok();
    if !valid {
        return Err(invalid());
    }

    let auth_session_id = Uuid::new_v4().to_string();
    let expires_at = Utc::now() + Duration::days(SESSION_TTL_DAYS);
    state
        .auth
        .create_auth_session(&auth_session_id, user_creds.user_id, expires_at)
        .await
        .map_err(error_response)?;

    let cookie = session_cookie(
        &auth_session_id,
        Duration::days(SESSION_TTL_DAYS).num_seconds(),
    );

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(AuthResponse {
            success: true,
            user_id: user_creds.user_id,
            email: user_creds.email,
        }),
    ))
}

/// POST /auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, Json<ErrorEnvelope>)> {
    let no_session = || {
        (
            StatusCode::UNAUTHORIZED,
            Json(ErrorEnvelope {
                success: false,
                error: "No session found".to_string(),
            }),
        )
    };

    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(no_session)?;

    let auth_session_id = cookie_header
        .split(';')
        .find_map(|c| c.trim().strip_prefix("session="))
        .ok_or_else(no_session)?;

    state
        .auth
        .delete_auth_session(auth_session_id)
        .await
        .map_err(error_response)?;

    // Clear cookie
    let cookie = session_cookie("", 0);

    Ok((StatusCode::OK, [(header::SET_COOKIE, cookie)]))
}
