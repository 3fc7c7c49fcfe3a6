//! The authorization decision core. Pure functions over snapshots of the
//! acting principal, the target record and the resolved back-references;
//! every mutating endpoint consults these before touching a store.
//!
//! The role ladder is ADMIN ⊃ MANAGER ⊃ USER, but resource gates still apply
//! to admins (self-action restrictions override role power). Dangling
//! back-references resolve to `None` and read as "no such relation".

use std::collections::HashSet;
use uuid::Uuid;

use crate::error::AppError;
use crate::model::{Role, Task, User};
use crate::store::UserStore;

/// Role gate used by role-restricted routes. Mirrors the route table: the
/// caller names the allowed rungs explicitly instead of relying on implied
/// inheritance.
pub fn require_role(actor: &User, allowed: &[Role]) -> Result<(), AppError> {
    if allowed.contains(&actor.role) {
        Ok(())
    } else {
        Err(AppError::forbidden(format!(
            "Role '{}' is not allowed to access this route",
            actor.role
        )))
    }
}

fn managed_by(user: Option<&User>, manager_id: Uuid) -> bool {
    user.map_or(false, |u| u.manager_id == Some(manager_id))
}

/// ReadTask: admins see everything; managers see their own tasks and their
/// team's; users only what they created or hold.
pub fn can_read_task(actor: &User, task: &Task, creator: Option<&User>, assignee: Option<&User>) -> bool {
    if actor.role == Role::Admin {
        return true;
    }
    if task.created_by == actor.id || task.assigned_to == Some(actor.id) {
        return true;
    }
    actor.role == Role::Manager
        && (managed_by(creator, actor.id) || managed_by(assignee, actor.id))
}

/// UpdateTask: admin or creator always; a manager additionally when the
/// creator or assignee is on their team.
pub fn can_update_task(actor: &User, task: &Task, creator: Option<&User>, assignee: Option<&User>) -> bool {
    if actor.role == Role::Admin || task.created_by == actor.id {
        return true;
    }
    actor.role == Role::Manager
        && (managed_by(creator, actor.id) || managed_by(assignee, actor.id))
}

/// DeleteTask: deletion follows creation, not assignment. A manager may
/// delete only when the task's creator is on their team.
pub fn can_delete_task(actor: &User, task: &Task, creator: Option<&User>) -> bool {
    if actor.role == Role::Admin || task.created_by == actor.id {
        return true;
    }
    actor.role == Role::Manager && managed_by(creator, actor.id)
}

/// AssignTask: the target principal's record is the fresh one, so a manager
/// demoted since the team link was written no longer passes (the link points
/// at them, but their current role decides nothing here; their former
/// reports fall back to the self-assignment rule when they act themselves).
pub fn can_assign_task(actor: &User, target: &User) -> Result<(), AppError> {
    match actor.role {
        Role::Admin => Ok(()),
        Role::Manager => {
            if target.manager_id == Some(actor.id) {
                Ok(())
            } else {
                Err(AppError::forbidden("You can only assign tasks to your team members"))
            }
        }
        Role::User => {
            if target.id == actor.id {
                Ok(())
            } else {
                Err(AppError::forbidden("You can only assign tasks to yourself"))
            }
        }
    }
}

/// GetProfile(target): admins unrestricted, managers bounded to their team
/// (or themselves).
pub fn can_view_profile(actor: &User, target: &User) -> bool {
    match actor.role {
        Role::Admin => true,
        Role::Manager => target.manager_id == Some(actor.id) || target.id == actor.id,
        Role::User => false,
    }
}

/// The visibility predicate compiled from a querying principal. List queries
/// apply it before any status/priority filter so pagination and totals never
/// leak out-of-scope tasks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskScope {
    /// Admin: all tasks.
    All,
    /// Manager: tasks created by or assigned to the team (self included).
    Team(HashSet<Uuid>),
    /// User: own tasks only.
    Own(Uuid),
}

impl TaskScope {
    pub fn allows(&self, task: &Task) -> bool {
        match self {
            TaskScope::All => true,
            TaskScope::Team(ids) => {
                ids.contains(&task.created_by)
                    || task.assigned_to.map_or(false, |a| ids.contains(&a))
            }
            TaskScope::Own(id) => task.created_by == *id || task.assigned_to == Some(*id),
        }
    }
}

/// Compute the visibility scope for a principal. Manager team membership is
/// read fresh from the credential store at query time.
pub fn scope_for(actor: &User, users: &dyn UserStore) -> anyhow::Result<TaskScope> {
    Ok(match actor.role {
        Role::Admin => TaskScope::All,
        Role::Manager => {
            let mut ids: HashSet<Uuid> = users.team(actor.id)?.into_iter().map(|u| u.id).collect();
            ids.insert(actor.id);
            TaskScope::Team(ids)
        }
        Role::User => TaskScope::Own(actor.id),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Role, Task, User};

    fn user(role: Role) -> User {
        let name = uuid::Uuid::new_v4().simple().to_string();
        User::new(name.clone(), format!("{name}@example.com"), "h".into(), role)
    }

    fn report_of(manager: &User) -> User {
        let mut u = user(Role::User);
        u.manager_id = Some(manager.id);
        u
    }

    #[test]
    fn role_gate_names_the_rung() {
        let u = user(Role::User);
        let err = require_role(&u, &[Role::Manager, Role::Admin]).unwrap_err();
        assert_eq!(err.message(), "Role 'user' is not allowed to access this route");
        assert!(require_role(&user(Role::Admin), &[Role::Manager, Role::Admin]).is_ok());
    }

    #[test]
    fn user_reads_only_own_or_held_tasks() {
        let alice = user(Role::User);
        let bob = user(Role::User);
        let mut t = Task::new("t".into(), alice.id);
        assert!(can_read_task(&alice, &t, Some(&alice), None));
        assert!(!can_read_task(&bob, &t, Some(&alice), None));
        t.assigned_to = Some(bob.id);
        assert!(can_read_task(&bob, &t, Some(&alice), Some(&bob)));
    }

    #[test]
    fn manager_reads_team_tasks_but_not_strangers() {
        let m = user(Role::Manager);
        let report = report_of(&m);
        let stranger = user(Role::User);
        let team_task = Task::new("t".into(), report.id);
        let other_task = Task::new("t".into(), stranger.id);
        assert!(can_read_task(&m, &team_task, Some(&report), None));
        assert!(!can_read_task(&m, &other_task, Some(&stranger), None));
    }

    #[test]
    fn update_allows_creator_regardless_of_role() {
        let creator = user(Role::User);
        let t = Task::new("t".into(), creator.id);
        assert!(can_update_task(&creator, &t, Some(&creator), None));
    }

    #[test]
    fn manager_updates_via_assignee_membership_too() {
        let m = user(Role::Manager);
        let report = report_of(&m);
        let outsider = user(Role::User);
        let mut t = Task::new("t".into(), outsider.id);
        t.assigned_to = Some(report.id);
        assert!(can_update_task(&m, &t, Some(&outsider), Some(&report)));
    }

    #[test]
    fn deletion_follows_creation_not_assignment() {
        let m = user(Role::Manager);
        let report = report_of(&m);
        let outsider = user(Role::User);
        let mut t = Task::new("t".into(), outsider.id);
        t.assigned_to = Some(report.id);
        // Update is allowed through the assignee, deletion is not.
        assert!(can_update_task(&m, &t, Some(&outsider), Some(&report)));
        assert!(!can_delete_task(&m, &t, Some(&outsider)));
        let team_created = Task::new("t".into(), report.id);
        assert!(can_delete_task(&m, &team_created, Some(&report)));
    }

    #[test]
    fn dangling_references_read_as_no_relation() {
        let m = user(Role::Manager);
        let stranger = user(Role::User);
        let mut t = Task::new("t".into(), stranger.id);
        t.assigned_to = Some(uuid::Uuid::new_v4()); // assignee deleted since
        assert!(!can_read_task(&m, &t, Some(&stranger), None));
        assert!(!can_update_task(&m, &t, Some(&stranger), None));
    }

    #[test]
    fn assign_matrix() {
        let admin = user(Role::Admin);
        let m = user(Role::Manager);
        let report = report_of(&m);
        let other = user(Role::User);
        assert!(can_assign_task(&admin, &other).is_ok());
        assert!(can_assign_task(&m, &report).is_ok());
        assert!(can_assign_task(&m, &other).is_err());
        assert!(can_assign_task(&other, &other).is_ok());
        assert!(can_assign_task(&other, &report).is_err());
    }

    #[test]
    fn profile_visibility() {
        let admin = user(Role::Admin);
        let m = user(Role::Manager);
        let report = report_of(&m);
        let other = user(Role::User);
        assert!(can_view_profile(&admin, &other));
        assert!(can_view_profile(&m, &report));
        assert!(can_view_profile(&m, &m));
        assert!(!can_view_profile(&m, &other));
        assert!(!can_view_profile(&other, &report));
    }

    #[test]
    fn scope_allows_matches_read_rules() {
        let m = user(Role::Manager);
        let report = report_of(&m);
        let stranger = user(Role::User);
        let mut ids = HashSet::new();
        ids.insert(m.id);
        ids.insert(report.id);
        let scope = TaskScope::Team(ids);
        assert!(scope.allows(&Task::new("a".into(), report.id)));
        assert!(!scope.allows(&Task::new("b".into(), stranger.id)));
        let mut held = Task::new("c".into(), stranger.id);
        held.assigned_to = Some(report.id);
        assert!(scope.allows(&held));
    }
}
