//! Role lifecycle over the LMDB store
//!
//! Bootstraps a fresh environment and drives `RoleManager` through the same
//! calls the admin server makes.

use grantmap::{
    bootstrap, is_bootstrapped, CatalogFeeds, GrantmapError, LmdbStore, RoleChanges, RoleManager, RoleStore,
    UserDirectory, STAFF_ROLE, SUPER_ADMIN_ROLE,
};
use tempfile::TempDir;

const ACTIONS: [&str; 3] = ["create", "read", "write"];

fn setup() -> (TempDir, RoleManager<LmdbStore>) {
    let dir = TempDir::new().unwrap();
    let store = LmdbStore::open(dir.path()).unwrap();
    bootstrap(&store).unwrap();
    (dir, RoleManager::new(store))
}

// ============================================================================
// Bootstrap
// ============================================================================

/// Fresh stores get the system roles, and reseeding keeps edits
#[test]
fn bootstrap_seeds_once() {
    let (_dir, m) = setup();
    assert!(is_bootstrapped(m.store()).unwrap());
    assert!(m.is_granted(SUPER_ADMIN_ROLE, "anything.at.all").unwrap());
    assert!(m.role(STAFF_ROLE).unwrap().permissions.is_empty());

    m.toggle_group_access(STAFF_ROLE, "dashboard").unwrap();
    assert!(bootstrap(m.store()).unwrap().is_empty());
    assert!(m.is_granted(STAFF_ROLE, "dashboard.read").unwrap());
}

// ============================================================================
// Create / clone / update
// ============================================================================

/// A cloned role evolves independently of its source
#[test]
fn clone_then_diverge() {
    let (_dir, m) = setup();
    let nurse = m.add_role("Nurse", "", None).unwrap();
    m.toggle_group_access(&nurse, "ipd").unwrap();

    let night = m.add_role("Nurse", "Night shift", Some(&nurse)).unwrap();
    assert_eq!(night, "nurse-2");
    m.toggle_action(&night, "ipd.beds.write", "ipd", "ipd.beds", &ACTIONS).unwrap();

    assert!(m.is_granted(&nurse, "ipd.beds.write").unwrap());
    assert!(!m.is_granted(&night, "ipd.beds.write").unwrap());
    assert!(m.is_granted(&night, "ipd.beds.read").unwrap());
}

/// Updates replace only the fields they carry
#[test]
fn update_keeps_untouched_fields() {
    let (_dir, m) = setup();
    let id = m.add_role("Pharmacist", "Dispensing", None).unwrap();
    m.toggle_group_access(&id, "pharmacy").unwrap();

    let r = m.update_role(&id, &RoleChanges { label: Some("Senior Pharmacist".into()), ..Default::default() }).unwrap();
    assert_eq!(r.label, "Senior Pharmacist");
    assert_eq!(r.description, "Dispensing");
    assert!(r.permissions.contains("pharmacy.*"));
    assert_eq!(m.role(&id).unwrap(), r);
}

// ============================================================================
// Delete with reassignment
// ============================================================================

/// Every user of a deleted role ends up on the target role
#[test]
fn delete_moves_every_user() {
    let (_dir, m) = setup();
    let id = m.add_role("Temp", "", None).unwrap();
    for u in ["u1", "u2", "u3"] {
        m.store().assign_user(u, &id).unwrap();
    }
    m.store().assign_user("u4", SUPER_ADMIN_ROLE).unwrap();

    m.delete_role(&id, STAFF_ROLE).unwrap();
    assert!(m.store().get(&id).unwrap().is_none());
    assert_eq!(m.user_count(STAFF_ROLE).unwrap(), 3);
    assert_eq!(m.user_count(SUPER_ADMIN_ROLE).unwrap(), 1);
    assert_eq!(m.store().role_of("u2").unwrap().as_deref(), Some(STAFF_ROLE));
}

/// Rejected deletes leave roles and users untouched
#[test]
fn rejected_delete_changes_nothing() {
    let (_dir, m) = setup();
    m.store().assign_user("root", SUPER_ADMIN_ROLE).unwrap();

    assert!(matches!(m.delete_role(SUPER_ADMIN_ROLE, STAFF_ROLE), Err(GrantmapError::Forbidden(_))));
    assert!(matches!(m.delete_role("ghost", STAFF_ROLE), Err(GrantmapError::NotFound(_))));

    let id = m.add_role("Temp", "", None).unwrap();
    m.store().assign_user("u1", &id).unwrap();
    assert!(matches!(m.delete_role(&id, "ghost"), Err(GrantmapError::Validation(_))));
    assert!(matches!(m.delete_role(&id, &id), Err(GrantmapError::Validation(_))));

    assert_eq!(m.user_count(&id).unwrap(), 1);
    assert_eq!(m.user_count(SUPER_ADMIN_ROLE).unwrap(), 1);
    assert_eq!(m.roles().unwrap().len(), 3);
}

/// Assignments racing a delete either move with the other users or are refused
#[test]
fn racing_assignments_follow_the_delete() {
    let (_dir, m) = setup();
    let m = std::sync::Arc::new(m);
    let id = m.add_role("Temp", "", None).unwrap();
    m.store().assign_user("u0", &id).unwrap();

    let writer = {
        let (m, id) = (m.clone(), id.clone());
        std::thread::spawn(move || (1..40).filter(|i| m.store().assign_user(&format!("u{}", i), &id).is_ok()).count())
    };
    m.delete_role(&id, STAFF_ROLE).unwrap();
    let accepted = writer.join().unwrap();

    assert_eq!(m.user_count(&id).unwrap(), 0);
    assert_eq!(m.user_count(STAFF_ROLE).unwrap(), accepted + 1);
    assert!(matches!(m.store().assign_user("late", &id), Err(GrantmapError::NotFound(_))));
}

// ============================================================================
// Toggles and catalog
// ============================================================================

/// Full access replaces the set, and action edits are refused while it holds
#[test]
fn full_access_round_trip() {
    let (_dir, m) = setup();
    let id = m.add_role("Auditor", "", None).unwrap();
    m.toggle_full_access(&id).unwrap();
    assert!(m.is_granted(&id, "billing.refunds.write").unwrap());
    assert!(matches!(
        m.toggle_action(&id, "billing.refunds.write", "billing", "billing.refunds", &["write"]),
        Err(GrantmapError::Forbidden(_))
    ));
    m.toggle_full_access(&id).unwrap();
    assert!(m.role(&id).unwrap().permissions.is_empty());
}

/// Role grants show up in the catalog next to the default extras
#[test]
fn catalog_reflects_persisted_roles() {
    let (_dir, m) = setup();
    let id = m.add_role("Radiographer", "", None).unwrap();
    m.update_role(
        &id,
        &RoleChanges { permissions: Some(["radiology.scans.read".to_string()].into()), ..Default::default() },
    )
    .unwrap();

    let cat = m.catalog(&CatalogFeeds::default(), "").unwrap();
    let radiology = cat.iter().find(|g| g.id == "radiology").unwrap();
    assert!(radiology.subject("radiology.scans").unwrap().actions.contains("read"));
    assert!(cat.iter().any(|g| g.id == "settings"));
    assert!(cat.iter().all(|g| g.id != "*"));
}
