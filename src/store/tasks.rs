//! In-memory task store. Query evaluation applies the visibility scope
//! first, then caller filters, then sort and pagination, so the reported
//! total is always post-predicate and pre-pagination.

use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{SortField, SortOrder, Task};

use super::{TaskQuery, TaskStore};

#[derive(Default)]
pub struct MemTaskStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn compare(a: &Task, b: &Task, field: SortField) -> Ordering {
    match field {
        // None sorts first ascending, mirroring "no due date" as the least
        // urgent position at the top of an ascending scan.
        SortField::DueDate => a.due_date.cmp(&b.due_date),
        SortField::Priority => a.priority.cmp(&b.priority),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        SortField::Status => a.status.cmp(&b.status),
    }
}

impl TaskStore for MemTaskStore {
    fn insert(&self, task: Task) -> Result<()> {
        self.tasks.write().insert(task.id, task);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<Task>> {
        Ok(self.tasks.read().get(&id).cloned())
    }

    fn update(&self, task: Task) -> Result<()> {
        let mut map = self.tasks.write();
        if !map.contains_key(&task.id) {
            bail!("task not found: {}", task.id);
        }
        map.insert(task.id, task);
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        Ok(self.tasks.write().remove(&id).is_some())
    }

    fn query(&self, q: &TaskQuery) -> Result<(Vec<Task>, usize)> {
        let map = self.tasks.read();
        let mut matching: Vec<Task> = map
            .values()
            .filter(|t| q.scope.allows(t))
            .filter(|t| q.status.map_or(true, |s| t.status == s))
            .filter(|t| q.priority.map_or(true, |p| t.priority == p))
            .cloned()
            .collect();
        let total = matching.len();
        matching.sort_by(|a, b| {
            let ord = compare(a, b, q.sort_by).then(a.id.cmp(&b.id));
            match q.order {
                SortOrder::Asc => ord,
                SortOrder::Desc => ord.reverse(),
            }
        });
        // Page numbers are unbounded above; saturate instead of overflowing
        // into an arbitrary offset.
        let start = q.page.saturating_sub(1).saturating_mul(q.limit);
        let page = matching.into_iter().skip(start).take(q.limit).collect();
        Ok((page, total))
    }

    fn assigned_to(&self, user_id: Uuid) -> Result<Vec<Task>> {
        let map = self.tasks.read();
        let mut matching: Vec<Task> = map
            .values()
            .filter(|t| t.assigned_to == Some(user_id))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matching)
    }
}
