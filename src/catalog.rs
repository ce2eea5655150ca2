//! Permission catalog
//!
//! Builds the Group → Subject → Action taxonomy that drives the permission
//! matrix. The catalog is advisory: it decides what is displayed, never what
//! is authorized, so malformed input is catalogued rather than rejected.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::constants::{known_group_label, known_group_rank, EXTRA_PERMISSIONS, UNIVERSAL, WILDCARD_SUFFIX};
use crate::permission::{leaf_key, Permission};
use crate::role::Role;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub label: String,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub key: String,
    pub label: String,
    pub actions: BTreeSet<String>,
}

impl Subject {
    /// Full permission key of one of this subject's actions
    pub fn permission(&self, action: &str) -> String {
        leaf_key(&self.key, action)
    }
}

impl Group {
    pub fn subject(&self, key: &str) -> Option<&Subject> {
        self.subjects.iter().find(|s| s.key == key)
    }
}

/// Everything the catalog is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatalogSources<'a> {
    /// Current roles; every stored grant is a candidate leaf
    pub roles: &'a [Role],
    /// `requiredPermissions` of navigation entries
    pub navigation: &'a [String],
    /// `requiredPermissions` of clinical modules
    pub modules: &'a [String],
    /// Fixed extra list, see [`default_extra`]
    pub extra: &'a [String],
}

/// Owned permission feeds from outside the role store.
///
/// Deserializable so the feeds can come straight from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogFeeds {
    pub navigation: Vec<String>,
    pub modules: Vec<String>,
    pub extra: Vec<String>,
}

impl Default for CatalogFeeds {
    fn default() -> Self {
        Self { navigation: Vec::new(), modules: Vec::new(), extra: default_extra() }
    }
}

impl CatalogFeeds {
    pub fn sources<'a>(&'a self, roles: &'a [Role]) -> CatalogSources<'a> {
        CatalogSources { roles, navigation: &self.navigation, modules: &self.modules, extra: &self.extra }
    }
}

/// The built-in extra permission list as owned strings
pub fn default_extra() -> Vec<String> {
    EXTRA_PERMISSIONS.iter().map(|s| s.to_string()).collect()
}

/// One concrete leaf after classification
struct Leaf {
    key: String,
    group: String,
    subject_key: String,
    subject_label: String,
    action: String,
}

impl Leaf {
    fn classify(key: &str) -> Option<Leaf> {
        if key.is_empty() || key == UNIVERSAL || key.ends_with(WILDCARD_SUFFIX) {
            return None;
        }
        let leaf = match Permission::parse(key) {
            Some(p) if !p.is_bare() => {
                let subject_label = if p.subjects.is_empty() {
                    group_label(&p.group)
                } else {
                    p.subjects.iter().map(|s| title_case(s)).collect::<Vec<_>>().join(" / ")
                };
                Leaf { key: key.to_string(), subject_key: p.subject_key(), group: p.group, subject_label, action: p.action }
            }
            // Single segment or malformed: one group, no subject refinement
            _ => Leaf {
                key: key.to_string(),
                group: key.to_string(),
                subject_key: key.to_string(),
                subject_label: group_label(key),
                action: key.to_string(),
            },
        };
        Some(leaf)
    }

    fn label(&self) -> String {
        format!("{} {}", self.subject_label, title_case(&self.action))
    }

    fn matches(&self, query: &str) -> bool {
        query.is_empty() || self.key.to_lowercase().contains(query) || self.label().to_lowercase().contains(query)
    }
}

/// Build the catalog from `sources`, keeping only leaves matching `search_query`.
///
/// Known groups come first in declared order; unknown groups follow sorted by
/// id. Empty subjects and groups are omitted.
pub fn build_catalog(sources: &CatalogSources<'_>, search_query: &str) -> Vec<Group> {
    let query = search_query.trim().to_lowercase();

    let mut seen = HashSet::new();
    let keys = sources
        .roles
        .iter()
        .flat_map(|r| r.permissions.iter())
        .chain(sources.navigation)
        .chain(sources.modules)
        .chain(sources.extra)
        .map(|k| k.trim())
        .filter(|k| seen.insert(*k));

    // group -> subject key -> (label, actions)
    let mut tree: BTreeMap<String, BTreeMap<String, (String, BTreeSet<String>)>> = BTreeMap::new();
    for leaf in keys.filter_map(Leaf::classify).filter(|l| l.matches(&query)) {
        let subject = tree
            .entry(leaf.group)
            .or_default()
            .entry(leaf.subject_key)
            .or_insert_with(|| (leaf.subject_label, BTreeSet::new()));
        subject.1.insert(leaf.action);
    }

    let mut groups: Vec<Group> = tree
        .into_iter()
        .map(|(id, subjects)| Group {
            label: group_label(&id),
            subjects: subjects
                .into_iter()
                .map(|(key, (label, actions))| Subject { key, label, actions })
                .collect(),
            id,
        })
        .filter(|g| !g.subjects.is_empty())
        .collect();
    groups.sort_by(|a, b| {
        let ra = known_group_rank(&a.id).unwrap_or(usize::MAX);
        let rb = known_group_rank(&b.id).unwrap_or(usize::MAX);
        ra.cmp(&rb).then_with(|| a.id.cmp(&b.id))
    });
    groups
}

/// Declared label for known groups, title-cased id otherwise
pub fn group_label(id: &str) -> String {
    known_group_label(id).map(str::to_string).unwrap_or_else(|| title_case(id))
}

/// Human-readable label of a permission key, as matched by search
pub fn permission_label(key: &str) -> String {
    Leaf::classify(key).map(|l| l.label()).unwrap_or_else(|| key.to_string())
}

/// `lab_results` / `lab-results` → `Lab Results`
pub fn title_case(s: &str) -> String {
    s.split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
