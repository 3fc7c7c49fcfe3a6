//! First-run seeding. A single public endpoint creates the default
//! administrator, and only while the credential store is still empty, so it
//! cannot be used to mint extra admins later.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::model::{Role, User};
use crate::security;

use super::AppState;

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@taskmanagement.com";
pub const ADMIN_PASSWORD: &str = "Admin@1234";

/// Create the first administrator. Fails once any principal exists.
pub fn seed_admin(state: &AppState) -> AppResult<(StatusCode, Value)> {
    if state.users.count()? > 0 {
        return Err(AppError::validation(
            "Users already exist. Seed can only be used on empty database.",
            vec![],
        ));
    }
    let hash = security::hash_password(ADMIN_PASSWORD)?;
    let mut admin = User::new(ADMIN_USERNAME.into(), ADMIN_EMAIL.into(), hash, Role::Admin);
    admin.email_confirmed = true;
    let summary = admin.summary();
    state.users.insert(admin)?;
    info!("default administrator seeded");
    Ok((
        StatusCode::CREATED,
        json!({
            "status": "success",
            "message": "Admin user created successfully",
            "data": {
                "user": summary,
                "credentials": {
                    "email": ADMIN_EMAIL,
                    "password": ADMIN_PASSWORD,
                },
            },
        }),
    ))
}

async fn seed_admin_h(State(state): State<AppState>) -> AppResult<(StatusCode, Json<Value>)> {
    seed_admin(&state).map(|(s, v)| (s, Json(v)))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/admin", post(seed_admin_h))
}
