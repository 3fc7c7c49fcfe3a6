//! Task routes. Every operation resolves the caller first, then consults the
//! authorization engine over fresh snapshots of the task and its creator and
//! assignee before touching the store. Existence failures (404) precede
//! authorization failures (403) on the id-addressed routes.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::email::Notification;
use crate::error::{AppError, AppResult};
use crate::identity::{
    can_assign_task, can_delete_task, can_read_task, can_update_task, require_role, scope_for,
};
use crate::model::{Role, Task, User};
use crate::store::TaskQuery;
use crate::validate;

use super::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskBody {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignBody {
    pub user_id: Option<String>,
}

fn pagination(total: usize, page: usize, limit: usize) -> Value {
    json!({
        "total": total,
        "page": page,
        "limit": limit,
        "totalPages": total.div_ceil(limit),
    })
}

/// Snapshot of the principals a task references, for the decision functions.
/// Dangling ids resolve to `None` and read as "no such relation".
fn related(state: &AppState, task: &Task) -> AppResult<(Option<User>, Option<User>)> {
    let creator = state.users.get(task.created_by)?;
    let assignee = match task.assigned_to {
        Some(id) => state.users.get(id)?,
        None => None,
    };
    Ok((creator, assignee))
}

fn load_task(state: &AppState, id_raw: &str) -> AppResult<Task> {
    let id = validate::parse_id(id_raw, "id", "Invalid task ID")?;
    state
        .tasks
        .get(id)?
        .ok_or_else(|| AppError::not_found("Task not found"))
}

/// Create. Allowed for any authenticated principal; the caller becomes the
/// creator and the task starts unassigned.
pub fn create_task(state: &AppState, headers: &HeaderMap, body: &TaskBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let fields = validate::validate_task_fields(
        body.title.as_deref(),
        body.description.as_deref(),
        body.due_date.as_deref(),
        body.priority.as_deref(),
        body.status.as_deref(),
        true,
    )?;
    let mut task = Task::new(fields.title.unwrap_or_default(), actor.id);
    task.description = fields.description;
    task.due_date = fields.due_date;
    if let Some(p) = fields.priority {
        task.priority = p;
    }
    if let Some(s) = fields.status {
        task.status = s;
    }
    let view = task.view();
    state.tasks.insert(task)?;
    info!(creator = %actor.id, "task created");
    Ok((
        StatusCode::CREATED,
        json!({
            "status": "success",
            "message": "Task created successfully",
            "data": {"task": view},
        }),
    ))
}

/// List. The caller's visibility scope is compiled first and applied before
/// any filter, so pagination and totals never leak out-of-scope tasks.
pub fn list_tasks(state: &AppState, headers: &HeaderMap, q: &ListQuery) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let scope = scope_for(&actor, state.users.as_ref())?;
    let mut query = TaskQuery::new(scope);
    query.status = validate::parse_filter(q.status.as_deref(), "status", "Status must be pending, in-progress, or completed")?;
    query.priority = validate::parse_filter(q.priority.as_deref(), "priority", "Priority must be low, medium, or high")?;
    let (sort_by, order) = validate::parse_sort(q.sort_by.as_deref(), q.order.as_deref())?;
    query.sort_by = sort_by;
    query.order = order;
    query.page = validate::parse_page(q.page.as_deref())?;
    query.limit = validate::parse_limit(q.limit.as_deref())?;
    let (tasks, total) = state.tasks.query(&query)?;
    let views: Vec<Value> = tasks.iter().map(Task::view).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "pagination": pagination(total, query.page, query.limit),
            "data": {"tasks": views},
        }),
    ))
}

pub fn get_task(state: &AppState, headers: &HeaderMap, id_raw: &str) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let task = load_task(state, id_raw)?;
    let (creator, assignee) = related(state, &task)?;
    if !can_read_task(&actor, &task, creator.as_ref(), assignee.as_ref()) {
        return Err(AppError::forbidden("You do not have permission to access this task"));
    }
    Ok((
        StatusCode::OK,
        json!({"status": "success", "data": {"task": task.view()}}),
    ))
}

/// Partial update. Absent and empty fields are left unchanged; `assignedTo`
/// is never touched here, assignment has its own route.
pub fn update_task(state: &AppState, headers: &HeaderMap, id_raw: &str, body: &TaskBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let mut task = load_task(state, id_raw)?;
    let (creator, assignee) = related(state, &task)?;
    if !can_update_task(&actor, &task, creator.as_ref(), assignee.as_ref()) {
        return Err(AppError::forbidden("You do not have permission to update this task"));
    }
    let fields = validate::validate_task_fields(
        body.title.as_deref(),
        body.description.as_deref(),
        body.due_date.as_deref(),
        body.priority.as_deref(),
        body.status.as_deref(),
        false,
    )?;
    if let Some(t) = fields.title {
        task.title = t;
    }
    if let Some(d) = fields.description {
        task.description = Some(d);
    }
    if let Some(d) = fields.due_date {
        task.due_date = Some(d);
    }
    if let Some(p) = fields.priority {
        task.priority = p;
    }
    if let Some(s) = fields.status {
        task.status = s;
    }
    task.updated_at = Utc::now();
    let view = task.view();
    state.tasks.update(task)?;
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "Task updated successfully",
            "data": {"task": view},
        }),
    ))
}

pub fn delete_task(state: &AppState, headers: &HeaderMap, id_raw: &str) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let task = load_task(state, id_raw)?;
    let (creator, _) = related(state, &task)?;
    if !can_delete_task(&actor, &task, creator.as_ref()) {
        return Err(AppError::forbidden("You do not have permission to delete this task"));
    }
    state.tasks.remove(task.id)?;
    info!(task = %task.id, "task deleted");
    Ok((
        StatusCode::OK,
        json!({"status": "success", "message": "Task deleted successfully"}),
    ))
}

/// Assign. Both existence checks come before the authorization decision; the
/// target's current record is the one consulted, so stale team links do not
/// authorize. The assignment email is fire-and-forget.
pub fn assign_task(state: &AppState, headers: &HeaderMap, id_raw: &str, body: &AssignBody) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let mut task = load_task(state, id_raw)?;
    let target_id = validate::parse_id(body.user_id.as_deref().unwrap_or(""), "userId", "Invalid user ID")?;
    let target = state
        .users
        .get(target_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    can_assign_task(&actor, &target)?;
    task.assigned_to = Some(target.id);
    task.updated_at = Utc::now();
    let view = task.view();
    let (task_id, task_title) = (task.id, task.title.clone());
    state.tasks.update(task)?;
    info!(task = %task_id, assignee = %target_id, "task assigned");
    state.notify(Notification::TaskAssigned {
        to: target.email,
        task_title,
        assigned_by: actor.username,
    });
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "message": "Task assigned successfully",
            "data": {"task": view},
        }),
    ))
}

pub fn assigned_to_me(state: &AppState, headers: &HeaderMap) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    let tasks = state.tasks.assigned_to(actor.id)?;
    let views: Vec<Value> = tasks.iter().map(Task::view).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "data": {"tasks": views},
        }),
    ))
}

/// Tasks held by a specific principal. Gated on role only; the route does
/// not bound a manager to their own team.
pub fn assigned_to_user(state: &AppState, headers: &HeaderMap, id_raw: &str) -> AppResult<(StatusCode, Value)> {
    let (actor, _) = state.authenticate(headers)?;
    require_role(&actor, &[Role::Manager, Role::Admin])?;
    let target_id = validate::parse_id(id_raw, "id", "Invalid user ID")?;
    let target = state
        .users
        .get(target_id)?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    let tasks = state.tasks.assigned_to(target.id)?;
    let views: Vec<Value> = tasks.iter().map(Task::view).collect();
    Ok((
        StatusCode::OK,
        json!({
            "status": "success",
            "results": views.len(),
            "data": {"tasks": views},
        }),
    ))
}

async fn create_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<TaskBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    create_task(&state, &headers, &body).map(|(s, v)| (s, Json(v)))
}

async fn list_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(q): Query<ListQuery>,
) -> AppResult<(StatusCode, Json<Value>)> {
    list_tasks(&state, &headers, &q).map(|(s, v)| (s, Json(v)))
}

async fn get_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    get_task(&state, &headers, &id).map(|(s, v)| (s, Json(v)))
}

async fn update_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<TaskBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    update_task(&state, &headers, &id, &body).map(|(s, v)| (s, Json(v)))
}

async fn delete_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    delete_task(&state, &headers, &id).map(|(s, v)| (s, Json(v)))
}

async fn assign_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<AssignBody>,
) -> AppResult<(StatusCode, Json<Value>)> {
    assign_task(&state, &headers, &id, &body).map(|(s, v)| (s, Json(v)))
}

async fn assigned_me_h(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<(StatusCode, Json<Value>)> {
    assigned_to_me(&state, &headers).map(|(s, v)| (s, Json(v)))
}

async fn assigned_user_h(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<Value>)> {
    assigned_to_user(&state, &headers, &id).map(|(s, v)| (s, Json(v)))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_h).get(list_h))
        .route("/assigned/me", get(assigned_me_h))
        .route("/assigned/user/{id}", get(assigned_user_h))
        .route("/{id}", get(get_h).put(update_h).delete(delete_h))
        .route("/{id}/assign", post(assign_h))
}
