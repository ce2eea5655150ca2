//! Role lifecycle: create, edit, delete-with-reassignment and persisted toggles
//!
//! `RoleManager` is the only component that fails. Each operation either
//! completes or leaves the store as it was.

use tracing::{debug, info};

use crate::catalog::{build_catalog, CatalogFeeds, Group};
use crate::error::{GrantmapError, Result};
use crate::mutator;
use crate::resolver::{self, has_full_access};
use crate::role::{PermissionSet, Role, RoleChanges};
use crate::store::RoleDirectory;

/// Lifecycle operations over a store of roles and user assignments.
pub struct RoleManager<S> {
    store: S,
}

impl<S: RoleDirectory> RoleManager<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn role(&self, id: &str) -> Result<Role> {
        self.store.get(id)?.ok_or_else(|| GrantmapError::NotFound(id.to_string()))
    }

    pub fn roles(&self) -> Result<Vec<Role>> {
        self.store.list()
    }

    /// Resolve `permission` against the current value of role `role_id`
    pub fn is_granted(&self, role_id: &str, permission: &str) -> Result<bool> {
        Ok(resolver::is_granted(&self.role(role_id)?, permission))
    }

    pub fn user_count(&self, role_id: &str) -> Result<usize> {
        self.store.count_users_by_role(role_id)
    }

    /// Catalog over the current roles plus external feeds
    pub fn catalog(&self, feeds: &CatalogFeeds, search_query: &str) -> Result<Vec<Group>> {
        let roles = self.store.list()?;
        Ok(build_catalog(&feeds.sources(&roles), search_query))
    }

    // ========================================================================
    // Create / update / delete
    // ========================================================================

    /// Create a role, optionally copying another role's permissions.
    ///
    /// Returns the generated id: the label's slug, suffixed `-2`, `-3`, ... on
    /// collision.
    pub fn add_role(&self, label: &str, description: &str, clone_from: Option<&str>) -> Result<String> {
        let label = validate_label(label)?;
        let permissions: PermissionSet = match clone_from {
            Some(source) => self
                .store
                .get(source)?
                .map(|r| r.permissions)
                .ok_or_else(|| GrantmapError::Validation(format!("clone source '{}' does not exist", source)))?,
            None => PermissionSet::new(),
        };

        let slug = slugify(label);
        let mut n = 1u32;
        loop {
            let id = if n == 1 { slug.clone() } else { format!("{}-{}", slug, n) };
            let role = Role {
                id,
                label: label.to_string(),
                description: description.to_string(),
                is_system: false,
                permissions: permissions.clone(),
            };
            if self.store.insert(&role)? {
                info!(role = %role.id, cloned_from = ?clone_from, "created role");
                return Ok(role.id);
            }
            n += 1;
        }
    }

    /// Edit label, description and/or permissions. System roles are editable.
    pub fn update_role(&self, id: &str, changes: &RoleChanges) -> Result<Role> {
        if let Some(label) = &changes.label {
            validate_label(label)?;
        }
        let role = self.store.modify(id, &mut |role| Ok(changes.apply(role)))?;
        debug!(role = %id, "updated role");
        Ok(role)
    }

    /// Delete a role after moving its users to `reassign_to`.
    ///
    /// System roles cannot be deleted. Checks, user moves and removal happen
    /// in one store transaction.
    pub fn delete_role(&self, id: &str, reassign_to: &str) -> Result<()> {
        let moved = self.store.delete_reassigning(id, reassign_to)?;
        info!(role = %id, reassigned_to = %reassign_to, users = moved.len(), "deleted role");
        Ok(())
    }

    // ========================================================================
    // Persisted toggles
    // ========================================================================

    /// Toggle one action. Refused while the role holds `*`.
    pub fn toggle_action<A: AsRef<str>>(
        &self,
        role_id: &str,
        permission_key: &str,
        group_id: &str,
        subject_key: &str,
        subject_actions: &[A],
    ) -> Result<Role> {
        let role = self.store.modify(role_id, &mut |role| {
            if has_full_access(&role) {
                return Err(GrantmapError::Forbidden(format!(
                    "role '{}' has full access; clear it before editing single actions",
                    role.id
                )));
            }
            Ok(mutator::toggle_action(&role, permission_key, group_id, subject_key, subject_actions))
        })?;
        debug!(role = %role_id, permission = %permission_key, "toggled action");
        Ok(role)
    }

    pub fn toggle_group_access(&self, role_id: &str, group_id: &str) -> Result<Role> {
        let role = self.store.modify(role_id, &mut |role| Ok(mutator::toggle_group_access(&role, group_id)))?;
        debug!(role = %role_id, group = %group_id, "toggled group access");
        Ok(role)
    }

    /// Full access shortcut
    pub fn toggle_full_access(&self, role_id: &str) -> Result<Role> {
        let role = self.store.modify(role_id, &mut |role| Ok(mutator::toggle_full_access(&role)))?;
        debug!(role = %role_id, full = has_full_access(&role), "toggled full access");
        Ok(role)
    }
}

fn validate_label(label: &str) -> Result<&str> {
    let label = label.trim();
    if label.is_empty() {
        return Err(GrantmapError::Validation("label must not be empty".into()));
    }
    Ok(label)
}

/// `Ward Nurse (night)` → `ward_nurse_night`
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('_') && !slug.is_empty() {
            slug.push('_');
        }
    }
    let slug = slug.trim_end_matches('_');
    if slug.is_empty() { "role".to_string() } else { slug.to_string() }
}
