//! In-memory credential store. A `parking_lot::RwLock` over a map, the same
//! shape the session and revocation tables use; uniqueness of username and
//! email is enforced at insert under the write lock.

use anyhow::{bail, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::model::{Role, User};

use super::UserStore;

#[derive(Default)]
pub struct MemUserStore {
    users: RwLock<HashMap<Uuid, User>>,
}

impl MemUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted_newest_first(mut users: Vec<User>) -> Vec<User> {
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        users
    }
}

impl UserStore for MemUserStore {
    fn insert(&self, user: User) -> Result<()> {
        let mut map = self.users.write();
        if map.values().any(|u| u.username == user.username) {
            bail!("username already exists: {}", user.username);
        }
        if map.values().any(|u| u.email == user.email) {
            bail!("email already exists: {}", user.email);
        }
        map.insert(user.id, user);
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.users.read().get(&id).cloned())
    }

    fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>> {
        let email_form = identifier.to_lowercase();
        let map = self.users.read();
        Ok(map
            .values()
            .find(|u| u.username == identifier || u.email == email_form)
            .cloned())
    }

    fn username_taken(&self, username: &str) -> Result<bool> {
        Ok(self.users.read().values().any(|u| u.username == username))
    }

    fn email_taken(&self, email: &str) -> Result<bool> {
        let email = email.to_lowercase();
        Ok(self.users.read().values().any(|u| u.email == email))
    }

    fn update(&self, user: User) -> Result<()> {
        let mut map = self.users.write();
        if !map.contains_key(&user.id) {
            bail!("user not found: {}", user.id);
        }
        map.insert(user.id, user);
        Ok(())
    }

    fn remove(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().remove(&id).is_some())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.users.read().len())
    }

    fn list(&self, role: Option<Role>, page: usize, limit: usize) -> Result<(Vec<User>, usize)> {
        let map = self.users.read();
        let matching: Vec<User> = map
            .values()
            .filter(|u| role.map_or(true, |r| u.role == r))
            .cloned()
            .collect();
        let total = matching.len();
        let sorted = Self::sorted_newest_first(matching);
        let start = page.saturating_sub(1).saturating_mul(limit);
        let page_items = sorted.into_iter().skip(start).take(limit).collect();
        Ok((page_items, total))
    }

    fn by_role(&self, role: Role) -> Result<Vec<User>> {
        let map = self.users.read();
        let matching: Vec<User> = map.values().filter(|u| u.role == role).cloned().collect();
        Ok(Self::sorted_newest_first(matching))
    }

    fn team(&self, manager_id: Uuid) -> Result<Vec<User>> {
        let map = self.users.read();
        let matching: Vec<User> = map
            .values()
            .filter(|u| u.manager_id == Some(manager_id))
            .cloned()
            .collect();
        Ok(Self::sorted_newest_first(matching))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, role: Role) -> User {
        User::new(name.into(), format!("{name}@example.com"), "h".into(), role)
    }

    #[test]
    fn insert_enforces_unique_username_and_email() {
        let s = MemUserStore::new();
        s.insert(user("alice", Role::User)).unwrap();
        assert!(s.insert(user("alice", Role::User)).is_err());
        let mut dup_email = user("alice2", Role::User);
        dup_email.email = "alice@example.com".into();
        assert!(s.insert(dup_email).is_err());
        assert_eq!(s.count().unwrap(), 1);
    }

    #[test]
    fn identifier_lookup_matches_username_or_lowercased_email() {
        let s = MemUserStore::new();
        s.insert(user("bob", Role::User)).unwrap();
        assert!(s.find_by_identifier("bob").unwrap().is_some());
        assert!(s.find_by_identifier("BOB@EXAMPLE.COM").unwrap().is_some());
        assert!(s.find_by_identifier("nobody").unwrap().is_none());
    }

    #[test]
    fn list_paginates_with_total() {
        let s = MemUserStore::new();
        for i in 0..7 {
            s.insert(user(&format!("u{i}"), Role::User)).unwrap();
        }
        s.insert(user("m", Role::Manager)).unwrap();
        let (page, total) = s.list(Some(Role::User), 2, 3).unwrap();
        assert_eq!(total, 7);
        assert_eq!(page.len(), 3);
        let (last, _) = s.list(Some(Role::User), 3, 3).unwrap();
        assert_eq!(last.len(), 1);
    }

    #[test]
    fn huge_page_numbers_yield_an_empty_page() {
        let s = MemUserStore::new();
        s.insert(user("alice", Role::User)).unwrap();
        let (page, total) = s.list(None, usize::MAX, 10).unwrap();
        assert!(page.is_empty());
        assert_eq!(total, 1);
    }

    #[test]
    fn team_lists_direct_reports_only() {
        let s = MemUserStore::new();
        let m = user("boss", Role::Manager);
        let m_id = m.id;
        s.insert(m).unwrap();
        let mut r = user("worker", Role::User);
        r.manager_id = Some(m_id);
        s.insert(r).unwrap();
        s.insert(user("loner", Role::User)).unwrap();
        let team = s.team(m_id).unwrap();
        assert_eq!(team.len(), 1);
        assert_eq!(team[0].username, "worker");
    }

    #[test]
    fn remove_leaves_back_references_dangling() {
        let s = MemUserStore::new();
        let m = user("boss", Role::Manager);
        let m_id = m.id;
        s.insert(m).unwrap();
        let mut r = user("worker", Role::User);
        r.manager_id = Some(m_id);
        let r_id = r.id;
        s.insert(r).unwrap();
        assert!(s.remove(m_id).unwrap());
        let orphan = s.get(r_id).unwrap().unwrap();
        assert_eq!(orphan.manager_id, Some(m_id));
        assert!(s.get(m_id).unwrap().is_none());
    }
}
