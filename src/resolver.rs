//! Grant resolution
//!
//! Pure functions over a role snapshot. Safe to call from any number of
//! readers at once; nothing here locks or allocates beyond wildcard keys.

use serde::{Deserialize, Serialize};

use crate::constants::UNIVERSAL;
use crate::permission::{wildcard, Grant};
use crate::role::Role;

/// How a permission is granted, for tri-state matrix cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantState {
    Denied,
    /// Granted by the literal entry
    Explicit,
    /// Granted only through `*` or a `prefix.*` entry
    Inherited,
}

impl GrantState {
    pub fn is_granted(self) -> bool {
        self != GrantState::Denied
    }
}

/// Does `role` grant `permission`?
///
/// Checks, in order: the universal wildcard, the verbatim entry, then any
/// stored `prefix.*` whose non-empty prefix ends on a segment boundary of
/// `permission`.
pub fn is_granted(role: &Role, permission: &str) -> bool {
    let p = &role.permissions;
    if p.contains(UNIVERSAL) || p.contains(permission) {
        return true;
    }
    p.iter().map(|entry| Grant::parse(entry)).any(|g| g.is_wildcard() && g.covers(permission))
}

/// Like [`is_granted`], distinguishing literal grants from wildcard ones
pub fn grant_state(role: &Role, permission: &str) -> GrantState {
    if role.permissions.contains(permission) {
        GrantState::Explicit
    } else if is_granted(role, permission) {
        GrantState::Inherited
    } else {
        GrantState::Denied
    }
}

/// Literal membership of `group_id.*`
pub fn group_has_wildcard(role: &Role, group_id: &str) -> bool {
    role.permissions.contains(&wildcard(group_id))
}

/// Literal membership of `subject_key.*`
pub fn subject_has_wildcard(role: &Role, subject_key: &str) -> bool {
    role.permissions.contains(&wildcard(subject_key))
}

/// Literal membership of `*`
pub fn has_full_access(role: &Role) -> bool {
    role.permissions.contains(UNIVERSAL)
}
