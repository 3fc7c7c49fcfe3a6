//! Public authentication routes: register, login, logout, own profile.
//! The service functions are plain and synchronous so the integration suites
//! can drive full scenarios without a socket; the axum handlers are thin
//! wrappers over them.

use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::info;

use crate::email::Notification;
use crate::error::{AppError, AppResult};
use crate::model::{Role, User};
use crate::security;
use crate::validate;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RegisterBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginBody {
    pub identifier: Option<String>,
    pub password: Option<String>,
}

/// Self-registration. Always creates a USER principal; the welcome email is
/// fire-and-forget.
pub fn register(state: &AppState, body: &RegisterBody) -> AppResult<(StatusCode, Value)> {
    let creds = validate::validate_credentials(
        body.username.as_deref(),
        body.email.as_deref(),
        body.password.as_deref(),
    )?;
    if state.users.username_taken(&creds.username)? {
        return Err(AppError::duplicate("Username already exists"));
    }
    if state.users.email_taken(&creds.email)? {
        return Err(AppError::duplicate("Email already exists"));
    }
    let hash = security::hash_password(&creds.password)?;
    let user = User::new(creds.username, creds.email, hash, Role::User);
    let summary = user.summary();
    let (to, username) = (user.email.clone(), user.username.clone());
    state.users.insert(user)?;
    info!(username = %username, "principal registered");
    state.notify(Notification::Welcome { to, username });
    Ok((
        StatusCode::CREATED,
        json!({
            "status": "success",
            "message": "User registered successfully",
            "data": {"user": summary},
        }),
    ))
}

/// Login. Throttled per client address; the same invalid-credentials answer
/// covers unknown identifiers and wrong passwords.
pub fn login(state: &AppState, client: &str, body: &LoginBody) -> AppResult<(StatusCode, Value)> {
    if !state.login_limiter.check(client) {
        return Err(AppError::rate_limited(
            "Too many login attempts, please try again after 15 minutes",
        ));
    }
    let identifier = body.identifier.as_deref().map(str::trim).unwrap_or("");
    let password = body.password.as_deref().unwrap_or("");
    if identifier.is_empty() || password.is_empty() {
        return Err(AppError::credentials());
    }
    let user = state
        .users
        .find_by_identifier(identifier)?
        .ok_or_else(AppError::credentials)?;
    if !security::verify_password(&user.password_hash, password) {
        return Err(AppError::credentials());
    }
    let token = state.vault.issue(user.id, user.role);
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "Login successful",
            "data": {"token": token, "user": user.summary()},
        }),
    ))
}

/// Revoke the caller's current token. After the response returns the token
/// is rejected by every subsequent authenticator call.
pub fn logout(state: &AppState, headers: &HeaderMap) -> AppResult<(StatusCode, Value)> {
    let (_, token) = state.authenticate(headers)?;
    state.vault.revoke(&token);
    Ok((
        StatusCode::OK,
        json!({"status": "success", "message": "Logout successful"}),
    ))
}

pub fn profile(state: &AppState, headers: &HeaderMap) -> AppResult<(StatusCode, Value)> {
    let (user, _) = state.authenticate(headers)?;
    Ok((
        StatusCode::OK,
        json!({"status": "success", "data": {"user": user.profile()}}),
    ))
}

async fn register_h(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    register(&state, &body).map(|(s, v)| (s, Json(v)))
}

async fn login_h(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(body): Json<LoginBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    login(&state, &addr.ip().to_string(), &body).map(|(s, v)| (s, Json(v)))
}

async fn logout_h(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    logout(&state, &headers).map(|(s, v)| (s, Json(v)))
}

async fn profile_h(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    profile(&state, &headers).map(|(s, v)| (s, Json(v)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_h))
        .route("/login", post(login_h))
        .route("/logout", post(logout_h))
        .route("/profile", get(profile_h))
}
