//! Storage seams: the role store and the user directory
//!
//! The engine itself is pure; these traits are how `RoleManager` reads roles,
//! persists mutated values and moves users between roles. `MemoryStore` backs
//! tests and embedders; `LmdbStore` (see `db`) is the durable backend.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{GrantmapError, Result};
use crate::role::Role;

/// Keyed collection of roles.
pub trait RoleStore: Send + Sync {
    fn get(&self, id: &str) -> Result<Option<Role>>;

    fn list(&self) -> Result<Vec<Role>>;

    /// Insert a new role. Returns `false` without writing if the id is taken.
    fn insert(&self, role: &Role) -> Result<bool>;

    /// Atomic read-modify-write of one role.
    ///
    /// Fails with `NotFound` when `id` is absent. If `f` fails nothing is
    /// written. The id of the returned role is forced back to `id`.
    fn modify(&self, id: &str, f: &mut dyn FnMut(Role) -> Result<Role>) -> Result<Role>;
}

/// Owner of user → role assignments.
pub trait UserDirectory: Send + Sync {
    fn count_users_by_role(&self, role_id: &str) -> Result<usize>;

    fn role_of(&self, user_id: &str) -> Result<Option<String>>;

    /// Assign `user_id` to `role_id`. Fails with `NotFound` when the role does
    /// not exist at the moment of the write.
    fn assign_user(&self, user_id: &str, role_id: &str) -> Result<()>;
}

/// A store owning both roles and assignments.
pub trait RoleDirectory: RoleStore + UserDirectory {
    /// Move every user of `id` to `to` and remove `id`, all or nothing.
    ///
    /// Runs [`check_delete`] against the state seen inside the same
    /// transaction. Returns the ids of the users that moved, sorted.
    fn delete_reassigning(&self, id: &str, to: &str) -> Result<Vec<String>>;
}

/// Preconditions of a delete with reassignment.
///
/// `NotFound` for a missing role, `Forbidden` for a system role, then
/// `Validation` for a self-reassignment or a missing target.
pub fn check_delete(id: &str, to: &str, role: Option<&Role>, target_exists: bool) -> Result<()> {
    let role = role.ok_or_else(|| GrantmapError::NotFound(id.to_string()))?;
    if role.is_system {
        return Err(GrantmapError::Forbidden(format!("system role '{}' cannot be deleted", id)));
    }
    if to == id {
        return Err(GrantmapError::Validation("cannot reassign users to the role being deleted".into()));
    }
    if !target_exists {
        return Err(GrantmapError::Validation(format!("reassignment target '{}' does not exist", to)));
    }
    Ok(())
}

/// In-memory store for both roles and users.
///
/// Not durable. Each map sits behind its own `RwLock`. Operations touching
/// both maps lock `roles` before `users`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    roles: RwLock<HashMap<String, Role>>,
    users: RwLock<HashMap<String, String>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|p| p.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|p| p.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: impl IntoIterator<Item = Role>) -> Self {
        let store = Self::new();
        write_lock(&store.roles).extend(roles.into_iter().map(|r| (r.id.clone(), r)));
        store
    }
}

impl RoleStore for MemoryStore {
    fn get(&self, id: &str) -> Result<Option<Role>> {
        Ok(read_lock(&self.roles).get(id).cloned())
    }

    fn list(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = read_lock(&self.roles).values().cloned().collect();
        roles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(roles)
    }

    fn insert(&self, role: &Role) -> Result<bool> {
        let mut roles = write_lock(&self.roles);
        if roles.contains_key(&role.id) {
            return Ok(false);
        }
        roles.insert(role.id.clone(), role.clone());
        Ok(true)
    }

    fn modify(&self, id: &str, f: &mut dyn FnMut(Role) -> Result<Role>) -> Result<Role> {
        let mut roles = write_lock(&self.roles);
        let current = roles.get(id).cloned().ok_or_else(|| GrantmapError::NotFound(id.to_string()))?;
        let mut next = f(current)?;
        next.id = id.to_string();
        roles.insert(id.to_string(), next.clone());
        Ok(next)
    }
}

impl UserDirectory for MemoryStore {
    fn count_users_by_role(&self, role_id: &str) -> Result<usize> {
        Ok(read_lock(&self.users).values().filter(|r| r.as_str() == role_id).count())
    }

    fn role_of(&self, user_id: &str) -> Result<Option<String>> {
        Ok(read_lock(&self.users).get(user_id).cloned())
    }

    fn assign_user(&self, user_id: &str, role_id: &str) -> Result<()> {
        let roles = read_lock(&self.roles);
        if !roles.contains_key(role_id) {
            return Err(GrantmapError::NotFound(role_id.to_string()));
        }
        write_lock(&self.users).insert(user_id.to_string(), role_id.to_string());
        Ok(())
    }
}

impl RoleDirectory for MemoryStore {
    fn delete_reassigning(&self, id: &str, to: &str) -> Result<Vec<String>> {
        let mut roles = write_lock(&self.roles);
        let mut users = write_lock(&self.users);
        check_delete(id, to, roles.get(id), roles.contains_key(to))?;

        let mut moved = Vec::new();
        for (user, role) in users.iter_mut() {
            if role.as_str() == id {
                *role = to.to_string();
                moved.push(user.clone());
            }
        }
        roles.remove(id);
        moved.sort();
        Ok(moved)
    }
}
