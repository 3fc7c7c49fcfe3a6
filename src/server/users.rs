//! User administration routes. Everything here sits behind a role gate;
//! self-action restrictions still apply to admins (no self role change, no
//! self delete through these paths).

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::identity::{can_view_profile, require_role};
use crate::model::{Role, User};
use crate::security;
use crate::validate;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateBody {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub role: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RoleBody {
    pub role: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignManagerBody {
    pub user_id: Option<String>,
    pub manager_id: Option<String>,
}

fn pagination(total: usize, page: usize, limit: usize) -> Value {
    json!({
        "total": total,
        "page": page,
        "limit": limit,
        "totalPages": total.div_ceil(limit),
    })
}

/// Admin-created principal: caller picks the role, email starts confirmed.
pub fn create_user(state: &AppState, headers: &HeaderMap, body: &CreateBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let creds = validate::validate_credentials(
        body.username.as_deref(),
        body.email.as_deref(),
        body.password.as_deref(),
    )?;
    let role = validate::parse_filter::<Role>(body.role.as_deref(), "role", "Role must be user, manager, or admin")?
        .unwrap_or(Role::User);
    if state.users.username_taken(&creds.username)? {
        return Err(AppError::duplicate("Username already exists"));
    }
    if state.users.email_taken(&creds.email)? {
        return Err(AppError::duplicate("Email already exists"));
    }
    let hash = security::hash_password(&creds.password)?;
    let mut user = User::new(creds.username, creds.email, hash, role);
    user.email_confirmed = true;
    let profile = user.profile();
    state.users.insert(user)?;
    info!(role = %role, "principal created by admin");
    Ok((
        StatusCode::CREATED,
        json!({
            "status": "success",
            "message": "User created successfully",
            "data": {"user": profile},
        }),
    ))
}

pub fn list_users(state: &AppState, headers: &HeaderMap, q: &ListQuery) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let role = validate::parse_filter::<Role>(q.role.as_deref(), "role", "Role must be user, manager, or admin")?;
    let page = validate::parse_page(q.page.as_deref())?;
    let limit = validate::parse_limit(q.limit.as_deref())?;
    let (users, total) = state.users.list(role, page, limit)?;
    let views: Vec<Value> = users.iter().map(User::profile).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "pagination": pagination(total, page, limit),
            "data": {"users": views},
        }),
    ))
}

pub fn list_managers(state: &AppState, headers: &HeaderMap) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let managers = state.users.by_role(Role::Manager)?;
    if managers.is_empty() {
        return Err(AppError::not_found("No managers found. Please create a manager first."));
    }
    let views: Vec<Value> = managers.iter().map(User::profile).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "data": {"managers": views},
        }),
    ))
}

/// Change a principal's role. Self-demotion is blocked even for admins;
/// existing manager back-references are left as data (the engine re-checks
/// current roles at decision time).
pub fn change_role(state: &AppState, headers: &HeaderMap, id_raw: &str, body: &RoleBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let id = validate::parse_id(id_raw, "id", "Invalid user ID")?;
    let role = validate::parse_filter::<Role>(body.role.as_deref(), "role", "Role must be user, manager, or admin")?
        .ok_or_else(|| {
            AppError::validation(
                "Validation failed",
                vec![crate::error::FieldError::new("role", "Role is required")],
            )
        })?;
    let mut target = state
        .users
        .get(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if target.id == actor.id {
        return Err(AppError::role_transition("You cannot change your own role"));
    }
    target.role = role;
    let profile = target.profile();
    state.users.update(target)?;
    info!(user = %id, role = %role, "role changed");
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "User role updated successfully",
            "data": {"user": profile},
        }),
    ))
}

/// Put a USER under a MANAGER. Any populated `managerId` is rejected, the
/// current manager's included; re-assignment requires a manual unassign
/// first.
pub fn assign_to_manager(state: &AppState, headers: &HeaderMap, body: &AssignManagerBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let user_id = validate::parse_id(body.user_id.as_deref().unwrap_or(""), "userId", "Invalid user ID")?;
    let manager_id = validate::parse_id(body.manager_id.as_deref().unwrap_or(""), "managerId", "Invalid manager ID")?;
    let mut target = state
        .users
        .get(user_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if target.role != Role::User {
        return Err(AppError::role_transition("Only users can be assigned to a manager"));
    }
    let manager = state
        .users
        .get(manager_id)?
        .ok_or_else(|| AppError::not_found("Manager not found"))?;
    if manager.role != Role::Manager {
        return Err(AppError::role_transition("Assigned manager must have manager role"));
    }
    if target.manager_id.is_some() {
        return Err(AppError::role_transition(
            "This user is already assigned to another manager. Please unassign first.",
        ));
    }
    target.manager_id = Some(manager.id);
    let profile = target.profile();
    state.users.update(target)?;
    info!(user = %user_id, manager = %manager_id, "user assigned to manager");
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "User assigned to manager successfully",
            "data": {"user": profile},
        }),
    ))
}

/// Remove a principal. Their tasks and any back-references held by others
/// remain; the engine reads dangling ids as "no relation".
pub fn delete_user(state: &AppState, headers: &HeaderMap, id_raw: &str) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Admin])?;
    let id = validate::parse_id(id_raw, "id", "Invalid user ID")?;
    if id == actor.id {
        return Err(AppError::role_transition("You cannot delete your own account"));
    }
    if !state.users.remove(id)? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user = %id, "principal deleted");
    Ok((
        StatusCode::OK,
        json!({"status": "success", "message": "User deleted successfully"}),
    ))
}

/// A manager's direct reports. Admins get the symmetric answer for their own
/// id, which is almost always empty.
pub fn team(state: &AppState, headers: &HeaderMap) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Manager, Role::Admin])?;
    let members = state.users.team(actor.id)?;
    let views: Vec<Value> = members.iter().map(User::profile).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "data": {"team": views},
        }),
    ))
}

pub fn profile_by_id(state: &AppState, headers: &HeaderMap, id_raw: &str) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Manager, Role::Admin])?;
    let id = validate::parse_id(id_raw, "id", "Invalid user ID")?;
    let target = state
        .users
        .get(id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    if !can_view_profile(&actor, &target) {
        return Err(AppError::forbidden("You can only view your team members profiles"));
    }
    Ok((
        StatusCode::OK,
        json!({"status": "success", "data": {"user": target.profile()}}),
    ))
}

async fn create_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    create_user(&state, &headers, &body).map(|(s, v)| (s, Json(v)))
}

async fn list_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> AppResult<(StatusCode, Json<Value>)> {
    list_users(&state, &headers, &q).map(|(s, v)| (s, Json(v)))
}

async fn managers_h(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    list_managers(&state, &headers).map(|(s, v)| (s, Json(v)))
}

async fn role_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RoleBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    change_role(&state, &headers, &id, &body).map(|(s, v)| (s, Json(v)))
}

async fn assign_manager_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AssignManagerBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    assign_to_manager(&state, &headers, &body).map(|(s, v)| (s, Json(v)))
}

async fn delete_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    delete_user(&state, &headers, &id).map(|(s, v)| (s, Json(v)))
}

async fn team_h(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    team(&state, &headers).map(|(s, v)| (s, Json(v)))
}

async fn profile_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    profile_by_id(&state, &headers, &id).map(|(s, v)| (s, Json(v)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_h))
        .route("/", get(list_h))
        .route("/managers", get(managers_h))
        .route("/team", get(team_h))
        .route("/profile/{id}", get(profile_h))
        .route("/assign-to-manager", post(assign_manager_h))
        .route("/{id}/role", put(role_h))
        .route("/{id}", delete(delete_h))
}
