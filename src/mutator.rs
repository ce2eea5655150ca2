//! Permission mutation
//!
//! Every toggle takes a role snapshot and returns a new role. The caller is
//! responsible for persisting the result atomically (see `RoleStore::modify`).
//!
//! Invariants kept by every function here:
//! - the returned set is canonical: no entry is covered by another wildcard
//!   in the same set;
//! - `toggle_action` flips exactly the targeted permission for the subject it
//!   names; sibling actions resolve the same before and after.

use std::collections::BTreeSet;

use crate::constants::{SEPARATOR, UNIVERSAL};
use crate::permission::{ancestors, leaf_key, wildcard, Grant};
use crate::resolver::{has_full_access, is_granted};
use crate::role::{PermissionSet, Role};

/// Toggle one action of one subject.
///
/// No-op while the role holds `*`. Any wildcard covering the target (the
/// subject wildcard, the group wildcard or an intermediate one) is replaced by
/// literal leaves for those of `subject_actions` it granted, then the target is
/// flipped.
pub fn toggle_action<S: AsRef<str>>(
    role: &Role,
    permission_key: &str,
    group_id: &str,
    subject_key: &str,
    subject_actions: &[S],
) -> Role {
    if has_full_access(role) {
        return role.clone();
    }
    let was_granted = is_granted(role, permission_key);
    let mut next = role.clone();

    let covering: BTreeSet<String> = ancestors(permission_key)
        .chain(std::iter::once(group_id))
        .filter(|prefix| Grant::Scoped(*prefix).covers(permission_key))
        .map(wildcard)
        .filter(|w| role.permissions.contains(w))
        .collect();

    if !covering.is_empty() {
        for w in &covering {
            next.permissions.remove(w);
        }
        for action in subject_actions {
            let leaf = leaf_key(subject_key, action.as_ref());
            if is_granted(role, &leaf) {
                next.permissions.insert(leaf);
            }
        }
    }

    if was_granted {
        next.permissions.remove(permission_key);
    } else {
        next.permissions.insert(permission_key.to_string());
    }

    next.permissions = canonicalize(&next.permissions);
    next
}

/// Toggle the `group_id.*` wildcard.
///
/// Enabling discards every finer entry inside the group; disabling removes
/// only the wildcard, so grants it superseded do not come back.
pub fn toggle_group_access(role: &Role, group_id: &str) -> Role {
    let mut next = role.clone();
    let group_wildcard = wildcard(group_id);
    if !next.permissions.remove(&group_wildcard) {
        let prefix = format!("{}{}", group_id, SEPARATOR);
        next.permissions.retain(|p| !p.starts_with(&prefix));
        next.permissions.insert(group_wildcard);
    }
    next.permissions = canonicalize(&next.permissions);
    next
}

/// `{"*"}` becomes empty; anything else becomes `{"*"}`.
pub fn toggle_full_access(role: &Role) -> Role {
    let mut next = role.clone();
    let full = next.permissions.len() == 1 && next.permissions.contains(UNIVERSAL);
    next.permissions = if full { PermissionSet::new() } else { PermissionSet::from([UNIVERSAL.to_string()]) };
    next
}

/// Drop every entry already granted by another wildcard in the set.
pub fn canonicalize(permissions: &PermissionSet) -> PermissionSet {
    if permissions.contains(UNIVERSAL) {
        return PermissionSet::from([UNIVERSAL.to_string()]);
    }
    let wildcards: Vec<Grant> = permissions.iter().map(|e| Grant::parse(e)).filter(Grant::is_wildcard).collect();
    permissions
        .iter()
        .filter(|entry| {
            let base = match Grant::parse(entry) {
                Grant::Scoped(prefix) => prefix,
                _ => entry.as_str(),
            };
            !wildcards.iter().any(|w| w.covers(base))
        })
        .cloned()
        .collect()
}
