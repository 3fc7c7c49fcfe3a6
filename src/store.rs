//! Abstract stores for principals and tasks, plus the bundled in-memory
//! implementations. The traits are the persistence seam: handlers and the
//! authorization engine only ever see these operations, so a database-backed
//! implementation can slot in without touching the decision core.

pub mod tasks;
pub mod users;

use anyhow::Result;
use uuid::Uuid;

use crate::identity::TaskScope;
use crate::model::{Priority, Role, SortField, SortOrder, Task, TaskStatus, User};

/// Persistence operations for principals.
pub trait UserStore: Send + Sync {
    /// Insert a new principal. Fails if the username or email is taken.
    fn insert(&self, user: User) -> Result<()>;
    fn get(&self, id: Uuid) -> Result<Option<User>>;
    /// Lookup by username (exact) or email (lowercased).
    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>>;
    fn username_taken(&self, username: &str) -> Result<bool>;
    fn email_taken(&self, email: &str) -> Result<bool>;
    /// Replace the record with the same id. Fails if it does not exist.
    fn update(&self, user: User) -> Result<()>;
    /// Remove a principal. Back-references held by others are left dangling.
    fn remove(&self, id: Uuid) -> Result<bool>;
    fn count(&self) -> Result<usize>;
    /// Page through principals, newest first, optionally filtered by role.
    /// Returns the page plus the pre-pagination total.
    fn list(&self, role: Option<Role>, page: usize, limit: usize) -> Result<(Vec<User>, usize)>;
    fn by_role(&self, role: Role) -> Result<Vec<User>>;
    /// Direct reports of a manager, newest first.
    fn team(&self, manager_id: Uuid) -> Result<Vec<User>>;
}

/// A scoped, filtered, sorted and paginated task query.
#[derive(Debug, Clone)]
pub struct TaskQuery {
    pub scope: TaskScope,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub sort_by: SortField,
    pub order: SortOrder,
    pub page: usize,
    pub limit: usize,
}

impl TaskQuery {
    pub fn new(scope: TaskScope) -> Self {
        Self {
            scope,
            status: None,
            priority: None,
            sort_by: SortField::CreatedAt,
            order: SortOrder::Desc,
            page: 1,
            limit: 10,
        }
    }
}

/// Persistence operations for tasks.
pub trait TaskStore: Send + Sync {
    fn insert(&self, task: Task) -> Result<()>;
    fn get(&self, id: Uuid) -> Result<Option<Task>>;
    /// Replace the record with the same id. Fails if it does not exist.
    fn update(&self, task: Task) -> Result<()>;
    fn remove(&self, id: Uuid) -> Result<bool>;
    /// Run a scoped query. The visibility predicate is applied before the
    /// caller's filters; the returned total counts matches pre-pagination.
    fn query(&self, q: &TaskQuery) -> Result<(Vec<Task>, usize)>;
    /// All tasks assigned to the given principal, newest first.
    fn assigned_to(&self, user_id: Uuid) -> Result<Vec<Task>>;
}
