//! Permission strings and stored grant entries
//!
//! A permission is a dotted path `group.subject....action`. Stored grant
//! entries are either concrete permissions, scoped wildcards (`prefix.*`) or
//! the universal wildcard (`*`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{SEPARATOR, UNIVERSAL, WILDCARD_SUFFIX};

/// A concrete permission leaf split into its parts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Permission {
    pub group: String,
    pub subjects: Vec<String>,
    pub action: String,
}

impl Permission {
    /// Parse a concrete permission.
    ///
    /// Returns `None` for wildcards, blank strings and paths with empty
    /// segments. A single segment parses as its own group and action.
    pub fn parse(value: &str) -> Option<Self> {
        if value.is_empty() || value == UNIVERSAL || value.ends_with(WILDCARD_SUFFIX) {
            return None;
        }
        let mut parts: Vec<&str> = value.split(SEPARATOR).collect();
        if parts.iter().any(|p| p.is_empty() || *p == UNIVERSAL) {
            return None;
        }
        if parts.len() == 1 {
            return Some(Self { group: value.to_string(), subjects: Vec::new(), action: value.to_string() });
        }
        let action = parts.pop().unwrap_or_default().to_string();
        let group = parts.remove(0).to_string();
        Some(Self { group, subjects: parts.into_iter().map(str::to_string).collect(), action })
    }

    /// Path minus the action; the group id when there are no subject segments
    pub fn subject_key(&self) -> String {
        if self.subjects.is_empty() {
            self.group.clone()
        } else {
            format!("{}{}{}", self.group, SEPARATOR, self.subjects.join("."))
        }
    }

    /// True for the degenerate single-segment form
    pub fn is_bare(&self) -> bool {
        self.subjects.is_empty() && self.group == self.action
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_bare() {
            return f.write_str(&self.group);
        }
        write!(f, "{}{}{}", self.subject_key(), SEPARATOR, self.action)
    }
}

/// Classification of a stored grant entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant<'a> {
    /// `*`
    All,
    /// `prefix.*`, holding the prefix
    Scoped(&'a str),
    /// Any other entry, matched verbatim
    Exact(&'a str),
}

impl<'a> Grant<'a> {
    pub fn parse(entry: &'a str) -> Self {
        if entry == UNIVERSAL {
            Grant::All
        } else if let Some(prefix) = entry.strip_suffix(WILDCARD_SUFFIX).filter(|p| !p.is_empty()) {
            Grant::Scoped(prefix)
        } else {
            Grant::Exact(entry)
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, Grant::Exact(_))
    }

    /// Does this entry grant `permission`?
    pub fn covers(&self, permission: &str) -> bool {
        match *self {
            Grant::All => true,
            Grant::Exact(p) => p == permission,
            Grant::Scoped(prefix) => {
                !prefix.is_empty()
                    && permission
                        .strip_prefix(prefix)
                        .is_some_and(|rest| rest.starts_with(SEPARATOR) && rest.len() > 1)
            }
        }
    }
}

impl fmt::Display for Grant<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grant::All => f.write_str(UNIVERSAL),
            Grant::Scoped(prefix) => write!(f, "{}{}", prefix, WILDCARD_SUFFIX),
            Grant::Exact(p) => f.write_str(p),
        }
    }
}

/// Build the wildcard entry for a prefix (`prefix.*`)
pub fn wildcard(prefix: &str) -> String {
    format!("{}{}", prefix, WILDCARD_SUFFIX)
}

/// Permission key of `action` under `subject_key`.
///
/// Bare single-segment leaves are catalogued with the key as their own
/// action and map back to the key itself.
pub fn leaf_key(subject_key: &str, action: &str) -> String {
    if action == subject_key {
        subject_key.to_string()
    } else {
        format!("{}{}{}", subject_key, SEPARATOR, action)
    }
}

/// Proper dotted prefixes of `permission`, longest first.
///
/// `a.b.c` yields `a.b` then `a`.
pub fn ancestors(permission: &str) -> impl Iterator<Item = &str> {
    permission.rmatch_indices(SEPARATOR).map(move |(i, _)| &permission[..i]).filter(|p| !p.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_nested_permission() {
        let p = Permission::parse("clinical.ambulatory.orders.read").unwrap();
        assert_eq!(p.group, "clinical");
        assert_eq!(p.subjects, vec!["ambulatory", "orders"]);
        assert_eq!(p.action, "read");
        assert_eq!(p.subject_key(), "clinical.ambulatory.orders");
        assert_eq!(p.to_string(), "clinical.ambulatory.orders.read");
    }

    #[test]
    fn parse_group_level_permission() {
        let p = Permission::parse("dashboard.read").unwrap();
        assert!(p.subjects.is_empty());
        assert_eq!(p.subject_key(), "dashboard");
        assert_eq!(p.to_string(), "dashboard.read");
    }

    #[test]
    fn parse_single_segment() {
        let p = Permission::parse("reports").unwrap();
        assert!(p.is_bare());
        assert_eq!(p.subject_key(), "reports");
        assert_eq!(p.to_string(), "reports");
    }

    #[test]
    fn parse_rejects_wildcards_and_malformed() {
        assert!(Permission::parse("*").is_none());
        assert!(Permission::parse("clinical.*").is_none());
        assert!(Permission::parse("").is_none());
        assert!(Permission::parse("clinical..read").is_none());
        assert!(Permission::parse(".read").is_none());
    }

    #[test]
    fn grant_classification() {
        assert_eq!(Grant::parse("*"), Grant::All);
        assert_eq!(Grant::parse("ipd.*"), Grant::Scoped("ipd"));
        assert_eq!(Grant::parse("ipd.beds.read"), Grant::Exact("ipd.beds.read"));
        assert_eq!(Grant::parse("ipd.beds.*").to_string(), "ipd.beds.*");
    }

    #[test]
    fn scoped_grant_respects_segment_boundaries() {
        let g = Grant::parse("ipd.*");
        assert!(g.covers("ipd.beds.read"));
        assert!(!g.covers("ipdx.beds.read"));
        assert!(!g.covers("ipd"));
        assert!(!g.covers("ipd."));
    }

    #[test]
    fn empty_prefix_is_not_a_wildcard() {
        assert_eq!(Grant::parse(".*"), Grant::Exact(".*"));
        assert!(!Grant::parse(".*").covers(".x"));
        assert!(!Grant::Scoped("").covers(".x"));
        assert!(Grant::parse(".*").covers(".*"));
    }

    #[test]
    fn leaf_keys() {
        assert_eq!(leaf_key("ipd.beds", "read"), "ipd.beds.read");
        assert_eq!(leaf_key("dashboard", "read"), "dashboard.read");
        assert_eq!(leaf_key("reports", "reports"), "reports");
    }

    #[test]
    fn ancestors_longest_first() {
        let a: Vec<&str> = ancestors("clinical.ambulatory.orders.read").collect();
        assert_eq!(a, vec!["clinical.ambulatory.orders", "clinical.ambulatory", "clinical"]);
        assert_eq!(ancestors("reports").count(), 0);
    }
}
