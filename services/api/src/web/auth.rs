//! services/api/src/web/auth.rs
//!
//! Administrator login and token verification. A single administrator
//! account is configured through the environment; tokens are opaque and
//! live in the process session table.

use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use crate::config::Config;
use crate::web::state::AppState;

/// How long a login token stays valid.
const TOKEN_TTL_DAYS: i64 = 30;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AdminUser {
    pub username: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: AdminUser,
}

#[derive(Serialize, ToSchema)]
pub struct VerifyResponse {
    pub valid: bool,
    pub user: AdminUser,
}

//=========================================================================================
// Handlers
//=========================================================================================

fn credentials_match(config: &Config, username: &str, password: &str) -> Result<bool, String> {
    if username != config.admin_username {
        return Ok(false);
    }
    // A configured hash wins over the plaintext development credential.
    if let Some(hash) = &config.admin_password_hash {
        let parsed = PasswordHash::new(hash).map_err(|e| e.to_string())?;
        return Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok());
    }
    Ok(config.admin_password.as_deref() == Some(password))
}

/// POST /api/auth/login - Administrator login
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing credentials"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if req.username.is_empty() || req.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "username and password are required".to_string(),
        ));
    }

    let valid = credentials_match(&state.config, &req.username, &req.password).map_err(|e| {
        error!("Failed to verify admin credentials: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Authentication error".to_string(),
        )
    })?;
    if !valid {
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".to_string()));
    }

    let token = state.sessions.issue(Duration::days(TOKEN_TTL_DAYS));
    Ok(Json(LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: AdminUser {
            username: req.username,
        },
    }))
}

/// GET /api/auth/verify - Validate a bearer token
#[utoipa::path(
    get,
    path = "/api/auth/verify",
    responses(
        (status = 200, description = "Token is valid", body = VerifyResponse),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or((StatusCode::UNAUTHORIZED, "Not authorized".to_string()))?;

    if !state.sessions.validate(token) {
        return Err((StatusCode::UNAUTHORIZED, "Invalid token".to_string()));
    }

    Ok(Json(VerifyResponse {
        valid: true,
        user: AdminUser {
            username: state.config.admin_username.clone(),
        },
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    fn config(password: Option<&str>, hash: Option<String>) -> Config {
        Config {
            bind_address: "127.0.0.1:0".parse().unwrap(),
            database_url: "postgres://unused".to_string(),
            log_level: tracing::Level::INFO,
            cors_origin: "http://localhost:5173".to_string(),
            admin_username: "admin".to_string(),
            admin_password: password.map(str::to_string),
            admin_password_hash: hash,
        }
    }

    #[test]
    fn plaintext_credential_comparison() {
        let config = config(Some("secret"), None);
        assert!(credentials_match(&config, "admin", "secret").unwrap());
        assert!(!credentials_match(&config, "admin", "wrong").unwrap());
        assert!(!credentials_match(&config, "intruder", "secret").unwrap());
    }

    #[test]
    fn hashed_credential_takes_precedence() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"hunter2", &salt)
            .unwrap()
            .to_string();
        let config = config(Some("ignored"), Some(hash));
        assert!(credentials_match(&config, "admin", "hunter2").unwrap());
        assert!(!credentials_match(&config, "admin", "ignored").unwrap());
    }
}
