//! Roles and role edits

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::mutator::canonicalize;

/// Stored grant entries of a role. Unordered by meaning; sorted for stable output.
pub type PermissionSet = BTreeSet<String>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_system: bool,
    #[serde(default)]
    pub permissions: PermissionSet,
}

impl Role {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: String::new(),
            is_system: false,
            permissions: PermissionSet::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn system(mut self) -> Self {
        self.is_system = true;
        self
    }
}

/// Partial update applied by `RoleManager::update_role`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleChanges {
    pub label: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<PermissionSet>,
}

impl RoleChanges {
    pub fn is_empty(&self) -> bool {
        self.label.is_none() && self.description.is_none() && self.permissions.is_none()
    }

    /// Apply onto a role value, canonicalizing new permissions. Validation
    /// happens in the manager.
    pub(crate) fn apply(&self, mut role: Role) -> Role {
        if let Some(label) = &self.label {
            role.label = label.trim().to_string();
        }
        if let Some(description) = &self.description {
            role.description = description.clone();
        }
        if let Some(permissions) = &self.permissions {
            role.permissions = canonicalize(permissions);
        }
        role
    }
}
