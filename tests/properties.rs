//! Resolution and mutation properties
//!
//! These tests exercise the pure engine against a small hospital catalog and
//! check that every toggle changes exactly what it targets.

use grantmap::{
    build_catalog, canonicalize, is_granted, toggle_action, toggle_full_access, toggle_group_access, CatalogSources,
    Group, Role,
};

const ACTIONS: [&str; 3] = ["create", "read", "write"];

fn role(perms: &[&str]) -> Role {
    Role::new("r", "R").with_permissions(perms.iter().copied())
}

fn feed() -> Vec<String> {
    [
        "ipd.beds.create",
        "ipd.beds.read",
        "ipd.beds.write",
        "ipd.admissions.read",
        "clinical.orders.create",
        "clinical.orders.read",
        "clinical.orders.write",
        "clinical.ambulatory.notes.read",
        "clinical.ambulatory.notes.write",
        "billing.invoices.read",
        "dashboard.read",
        "reports",
        "reports.read",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn catalog() -> Vec<Group> {
    let nav = feed();
    build_catalog(&CatalogSources { navigation: &nav, ..Default::default() }, "")
}

fn all_leaves(catalog: &[Group]) -> Vec<String> {
    catalog
        .iter()
        .flat_map(|g| g.subjects.iter())
        .flat_map(|s| s.actions.iter().map(move |a| s.permission(a)))
        .collect()
}

fn same_resolution(a: &Role, b: &Role, leaves: &[String]) -> bool {
    leaves.iter().all(|p| is_granted(a, p) == is_granted(b, p))
}

// ============================================================================
// Resolution
// ============================================================================

/// `clinical.*` grants inside the group only
#[test]
fn wildcard_subsumption() {
    let r = role(&["clinical.*"]);
    assert!(is_granted(&r, "clinical.orders.read"));
    assert!(!is_granted(&r, "billing.invoices.read"));
}

/// `*` grants everything regardless of other entries
#[test]
fn universal_wildcard_dominance() {
    let r = role(&["*", "billing.invoices.read"]);
    for p in all_leaves(&catalog()).iter().chain(["unknown.thing".to_string()].iter()) {
        assert!(is_granted(&r, p));
    }
}

// ============================================================================
// Action toggles
// ============================================================================

/// Toggling one action off a subject wildcard keeps its siblings
#[test]
fn sibling_invariance_under_action_toggle() {
    let r = role(&["clinical.orders.*"]);
    let r2 = toggle_action(&r, "clinical.orders.write", "clinical", "clinical.orders", &ACTIONS);
    assert!(is_granted(&r2, "clinical.orders.read"));
    assert!(is_granted(&r2, "clinical.orders.create"));
    assert!(!is_granted(&r2, "clinical.orders.write"));
}

/// For every subject and action in the catalog, a toggle flips only its target
#[test]
fn toggle_flips_only_the_target_within_its_subject() {
    let cat = catalog();
    let starts = [role(&[]), role(&["clinical.orders.*", "ipd.beds.read"]), role(&["dashboard.read", "billing.*"])];
    for start in &starts {
        for group in &cat {
            for subject in &group.subjects {
                let actions: Vec<&str> = subject.actions.iter().map(String::as_str).collect();
                for action in &actions {
                    let target = subject.permission(action);
                    let next = toggle_action(start, &target, &group.id, &subject.key, &actions);
                    assert_ne!(is_granted(&next, &target), is_granted(start, &target), "{target}");
                    for sibling in actions.iter().filter(|a| *a != action) {
                        let p = subject.permission(sibling);
                        assert_eq!(is_granted(&next, &p), is_granted(start, &p), "{target} vs {p}");
                    }
                }
            }
        }
    }
}

/// Applying the same toggle twice restores resolution for the whole catalog
#[test]
fn toggle_is_self_inverse() {
    let cat = catalog();
    let leaves = all_leaves(&cat);
    let start = role(&["clinical.orders.*", "ipd.beds.read", "dashboard.read"]);
    for group in &cat {
        for subject in &group.subjects {
            let actions: Vec<&str> = subject.actions.iter().map(String::as_str).collect();
            for action in &actions {
                let target = subject.permission(action);
                let once = toggle_action(&start, &target, &group.id, &subject.key, &actions);
                let twice = toggle_action(&once, &target, &group.id, &subject.key, &actions);
                assert!(same_resolution(&start, &twice, &leaves), "{target}");
            }
        }
    }
}

/// `{"ipd.*"}` minus `ipd.beds.write` enumerates the remaining bed actions
#[test]
fn group_wildcard_action_toggle_scenario() {
    let r = role(&["ipd.*"]);
    assert!(is_granted(&r, "ipd.beds.write"));
    let r2 = toggle_action(&r, "ipd.beds.write", "ipd", "ipd.beds", &ACTIONS);
    assert_eq!(r2.permissions, ["ipd.beds.create", "ipd.beds.read"].iter().map(|s| s.to_string()).collect());
    assert!(!is_granted(&r2, "ipd.beds.write"));
    assert!(is_granted(&r2, "ipd.beds.read"));
}

/// Mutators never leave entries covered by another wildcard
#[test]
fn mutators_return_canonical_sets() {
    let cat = catalog();
    let mut r = role(&["clinical.orders.read"]);
    r = toggle_group_access(&r, "clinical");
    assert_eq!(r.permissions, canonicalize(&r.permissions));
    for group in &cat {
        for subject in &group.subjects {
            let actions: Vec<&str> = subject.actions.iter().map(String::as_str).collect();
            r = toggle_action(&r, &subject.permission(actions[0]), &group.id, &subject.key, &actions);
            assert_eq!(r.permissions, canonicalize(&r.permissions));
        }
    }
}

// ============================================================================
// Group and full access toggles
// ============================================================================

/// Enabling a group leaves only the group wildcard inside it
#[test]
fn group_wildcard_collapse() {
    let r = role(&["clinical.orders.read", "clinical.ambulatory.notes.*", "billing.invoices.read"]);
    let r2 = toggle_group_access(&r, "clinical");
    let inside: Vec<&String> = r2.permissions.iter().filter(|p| p.starts_with("clinical.")).collect();
    assert_eq!(inside, vec!["clinical.*"]);
    assert!(r2.permissions.contains("billing.invoices.read"));
}

/// Disabling the group wildcard does not bring back superseded grants
#[test]
fn group_toggle_off_is_lossy() {
    let r = role(&["clinical.orders.read"]);
    let r2 = toggle_group_access(&toggle_group_access(&r, "clinical"), "clinical");
    assert!(!is_granted(&r2, "clinical.orders.read"));
    assert!(r2.permissions.is_empty());
}

/// Full access toggled twice restores `{"*"}` and `{}` exactly
#[test]
fn full_access_toggle_idempotence() {
    for start in [role(&["*"]), role(&[])] {
        assert_eq!(toggle_full_access(&toggle_full_access(&start)).permissions, start.permissions);
    }
    let partial = role(&["ipd.beds.read"]);
    assert_eq!(toggle_full_access(&partial).permissions, ["*".to_string()].into_iter().collect());
}

/// Action toggles are refused while `*` is held
#[test]
fn action_toggle_is_noop_under_full_access() {
    let r = role(&["*"]);
    assert_eq!(toggle_action(&r, "ipd.beds.write", "ipd", "ipd.beds", &ACTIONS), r);
}
