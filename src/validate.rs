//! Request validation. Collects field-level failures into the 400 envelope
//! instead of failing on the first bad field. Empty strings count as absent,
//! matching the partial-update semantics of the task endpoints.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{AppError, FieldError};
use crate::model::{Priority, SortField, SortOrder, TaskStatus};

static USERNAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9_]+$").expect("static regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").expect("static regex"));

const VALIDATION_FAILED: &str = "Validation failed";

fn bundle(errors: Vec<FieldError>) -> AppError {
    AppError::validation(VALIDATION_FAILED, errors)
}

/// Validated registration/creation credentials. Email is normalized to
/// lowercase here so every store comparison sees one canonical form.
#[derive(Debug, Clone)]
pub struct NewCredentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

pub fn validate_credentials(
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<NewCredentials, AppError> {
    let mut errors = Vec::new();

    let username = username.map(str::trim).unwrap_or("");
    if username.is_empty() {
        errors.push(FieldError::new("username", "Username is required"));
    } else if username.len() < 3 || username.len() > 30 {
        errors.push(FieldError::new("username", "Username must be between 3 and 30 characters"));
    } else if !USERNAME_RE.is_match(username) {
        errors.push(FieldError::new("username", "Username can only contain letters, numbers and underscores"));
    }

    let email = email.map(str::trim).unwrap_or("");
    if email.is_empty() {
        errors.push(FieldError::new("email", "Email is required"));
    } else if !EMAIL_RE.is_match(email) {
        errors.push(FieldError::new("email", "Please provide a valid email"));
    }

    let password = password.unwrap_or("");
    if password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    } else if password.len() < 8 {
        errors.push(FieldError::new("password", "Password must be at least 8 characters"));
    } else if !password_strong_enough(password) {
        errors.push(FieldError::new(
            "password",
            "Password must contain uppercase, lowercase, number and special character",
        ));
    }

    if !errors.is_empty() {
        return Err(bundle(errors));
    }
    Ok(NewCredentials {
        username: username.to_string(),
        email: email.to_lowercase(),
        password: password.to_string(),
    })
}

fn password_strong_enough(pw: &str) -> bool {
    let has_lower = pw.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = pw.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = pw.chars().any(|c| c.is_ascii_digit());
    let has_special = pw.chars().any(|c| "@$!%*?&#^_-".contains(c));
    has_lower && has_upper && has_digit && has_special
}

/// Parse an id path/body parameter, surfacing the resource-specific message.
pub fn parse_id(raw: &str, field: &str, message: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| bundle(vec![FieldError::new(field, message)]))
}

/// Validated (partial) task fields. `None` always means "leave unchanged".
#[derive(Debug, Clone, Default)]
pub struct TaskFields {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Option<Priority>,
    pub status: Option<TaskStatus>,
}

/// Validate task create/update fields. On create (`require_title`) the title
/// must be present; due dates must sit strictly in the future at the moment
/// of the write.
pub fn validate_task_fields(
    title: Option<&str>,
    description: Option<&str>,
    due_date: Option<&str>,
    priority: Option<&str>,
    status: Option<&str>,
    require_title: bool,
) -> Result<TaskFields, AppError> {
    let mut errors = Vec::new();
    let mut out = TaskFields::default();

    // Bounds count characters, not bytes; multibyte text gets the full limit.
    match title.map(str::trim).filter(|t| !t.is_empty()) {
        Some(t) if t.chars().count() > 100 => {
            errors.push(FieldError::new("title", "Title cannot exceed 100 characters"));
        }
        Some(t) => out.title = Some(t.to_string()),
        None if require_title => {
            errors.push(FieldError::new("title", "Task title is required"));
        }
        None => {}
    }

    if let Some(d) = description.map(str::trim).filter(|d| !d.is_empty()) {
        if d.chars().count() > 500 {
            errors.push(FieldError::new("description", "Description cannot exceed 500 characters"));
        } else {
            out.description = Some(d.to_string());
        }
    }

    if let Some(raw) = due_date.map(str::trim).filter(|d| !d.is_empty()) {
        match DateTime::parse_from_rfc3339(raw) {
            Ok(dt) => {
                let dt = dt.with_timezone(&Utc);
                if dt <= Utc::now() {
                    errors.push(FieldError::new("dueDate", "Due date must be in the future"));
                } else {
                    out.due_date = Some(dt);
                }
            }
            Err(_) => errors.push(FieldError::new("dueDate", "Due date must be a valid date")),
        }
    }

    if let Some(raw) = priority.map(str::trim).filter(|p| !p.is_empty()) {
        match raw.parse::<Priority>() {
            Ok(p) => out.priority = Some(p),
            Err(()) => errors.push(FieldError::new("priority", "Priority must be low, medium, or high")),
        }
    }

    if let Some(raw) = status.map(str::trim).filter(|s| !s.is_empty()) {
        match raw.parse::<TaskStatus>() {
            Ok(s) => out.status = Some(s),
            Err(()) => errors.push(FieldError::new("status", "Status must be pending, in-progress, or completed")),
        }
    }

    if !errors.is_empty() {
        return Err(bundle(errors));
    }
    Ok(out)
}

/// Parse an optional enum query filter; absent and empty mean no filter.
pub fn parse_filter<T: FromStr<Err = ()>>(
    raw: Option<&str>,
    field: &str,
    message: &str,
) -> Result<Option<T>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse::<T>()
            .map(Some)
            .map_err(|()| bundle(vec![FieldError::new(field, message)])),
    }
}

pub fn parse_sort(
    sort_by: Option<&str>,
    order: Option<&str>,
) -> Result<(SortField, SortOrder), AppError> {
    let field = parse_filter::<SortField>(sort_by, "sortBy", "Invalid sort field")?
        .unwrap_or(SortField::CreatedAt);
    // When no explicit field is requested the listing defaults to newest
    // first; an explicit field without an order sorts ascending.
    let default_order = if sort_by.map(str::trim).filter(|s| !s.is_empty()).is_some() {
        SortOrder::Asc
    } else {
        SortOrder::Desc
    };
    let order = parse_filter::<SortOrder>(order, "order", "Order must be asc or desc")?
        .unwrap_or(default_order);
    Ok((field, order))
}

pub fn parse_page(raw: Option<&str>) -> Result<usize, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(1),
        Some(s) => match s.parse::<usize>() {
            Ok(n) if n >= 1 => Ok(n),
            _ => Err(bundle(vec![FieldError::new("page", "Page must be a positive integer")])),
        },
    }
}

pub fn parse_limit(raw: Option<&str>) -> Result<usize, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(10),
        Some(s) => match s.parse::<usize>() {
            Ok(n) if (1..=100).contains(&n) => Ok(n),
            _ => Err(bundle(vec![FieldError::new("limit", "Limit must be between 1 and 100")])),
        },
    }
}
