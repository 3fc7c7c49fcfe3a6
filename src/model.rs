//! Domain records: principals (users) and tasks, plus the small enums the
//! authorization engine and task queries are built from. JSON views are kept
//! here so the password hash can never leak through a handler by accident.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role ladder: ADMIN ⊃ MANAGER ⊃ USER. Encoded as data, not inheritance;
/// the matrix in `identity::authorizer` is the single source of truth for
/// what each rung may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Manager,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

/// Task priority. Ordering is LOW < MEDIUM < HIGH so priority sorts rank by
/// urgency rather than alphabetically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl FromStr for Priority {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(()),
        }
    }
}

/// Task status. Ordering follows the workflow: pending, in-progress, completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl FromStr for TaskStatus {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            _ => Err(()),
        }
    }
}

/// A persisted principal. `password_hash` is a PHC string and never appears
/// in any JSON view below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    /// Back-reference to a MANAGER principal. Only USER principals carry one.
    pub manager_id: Option<Uuid>,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: String, email: String, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password_hash,
            role,
            manager_id: None,
            email_confirmed: false,
            created_at: Utc::now(),
        }
    }

    /// Short view used in register/login/create responses.
    pub fn summary(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "role": self.role,
        })
    }

    /// Full outward view used by profile and listing endpoints.
    pub fn profile(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "email": self.email,
            "role": self.role,
            "managerId": self.manager_id,
            "isEmailConfirmed": self.email_confirmed,
            "createdAt": self.created_at,
        })
    }
}

/// A unit of work. `created_by` is immutable after creation; `updated_at`
/// advances on every mutation. Back-references are never ownership: deleting
/// a principal leaves them dangling and the engine treats an unresolved id
/// as "no such relation".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: Priority,
    pub status: TaskStatus,
    pub created_by: Uuid,
    pub assigned_to: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(title: String, created_by: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description: None,
            due_date: None,
            priority: Priority::Medium,
            status: TaskStatus::Pending,
            created_by,
            assigned_to: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn view(&self) -> Value {
        json!({
            "id": self.id,
            "title": self.title,
            "description": self.description,
            "dueDate": self.due_date,
            "priority": self.priority,
            "status": self.status,
            "createdBy": self.created_by,
            "assignedTo": self.assigned_to,
            "createdAt": self.created_at,
            "updatedAt": self.updated_at,
        })
    }
}

/// Sortable task fields for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    DueDate,
    Priority,
    CreatedAt,
    Status,
}

impl FromStr for SortField {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dueDate" => Ok(SortField::DueDate),
            "priority" => Ok(SortField::Priority),
            "createdAt" => Ok(SortField::CreatedAt),
            "status" => Ok(SortField::Status),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl FromStr for SortOrder {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for r in [Role::User, Role::Manager, Role::Admin] {
            assert_eq!(r.as_str().parse::<Role>().unwrap(), r);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn priority_orders_by_urgency() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
    }

    #[test]
    fn status_serde_uses_kebab_case() {
        let s = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(s, "\"in-progress\"");
        assert_eq!("in-progress".parse::<TaskStatus>().unwrap(), TaskStatus::InProgress);
    }

    #[test]
    fn user_views_never_contain_password_hash() {
        let u = User::new("alice".into(), "alice@example.com".into(), "$argon2id$fake".into(), Role::User);
        for v in [u.summary(), u.profile()] {
            let text = v.to_string();
            assert!(!text.contains("argon2"), "hash leaked: {}", text);
        }
    }

    #[test]
    fn new_task_defaults() {
        let t = Task::new("write report".into(), Uuid::new_v4());
        assert_eq!(t.priority, Priority::Medium);
        assert_eq!(t.status, TaskStatus::Pending);
        assert!(t.assigned_to.is_none());
        assert_eq!(t.created_at, t.updated_at);
    }
}
