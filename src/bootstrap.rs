//! Bootstrap and built-in roles

use tracing::info;

use crate::constants::{STAFF_ROLE, SUPER_ADMIN_ROLE, UNIVERSAL};
use crate::error::Result;
use crate::role::Role;
use crate::store::RoleStore;

/// Roles the product always expects to exist
pub fn system_roles() -> Vec<Role> {
    vec![
        Role::new(SUPER_ADMIN_ROLE, "Super Admin")
            .with_description("Unrestricted access to every module")
            .with_permissions([UNIVERSAL])
            .system(),
        Role::new(STAFF_ROLE, "Staff")
            .with_description("Default role for new users")
            .system(),
    ]
}

/// True once every built-in role exists
pub fn is_bootstrapped(store: &impl RoleStore) -> Result<bool> {
    for role in system_roles() {
        if store.get(&role.id)?.is_none() {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Insert missing built-in roles. Existing ones are left untouched so edits
/// made to a system role survive restarts. Returns the ids inserted.
pub fn bootstrap(store: &impl RoleStore) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for role in system_roles() {
        if store.insert(&role)? {
            created.push(role.id);
        }
    }
    if !created.is_empty() {
        info!(roles = ?created, "bootstrapped system roles");
    }
    Ok(created)
}
