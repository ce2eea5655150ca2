//! Grantmap - hierarchical wildcard permissions for role-based access control
//!
//! Permissions are dotted paths (`group.subject.action`). A role stores a set
//! of grant entries: concrete paths, scoped wildcards (`clinical.*`,
//! `clinical.orders.*`) and the universal wildcard (`*`).
//!
//! - `resolver`: does a role grant a permission?
//! - `mutator`: toggle an action, a group or full access, returning a new role
//!   whose set stays canonical
//! - `catalog`: Group → Subject → Action taxonomy for the permission matrix
//! - `lifecycle`: create/clone, edit, delete-with-reassignment over a store
//!
//! Resolution and mutation are pure and never fail; only lifecycle operations
//! and stores return errors.

pub mod bootstrap;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod lifecycle;
pub mod mutator;
pub mod permission;
pub mod resolver;
pub mod role;
pub mod store;

pub use bootstrap::{bootstrap, is_bootstrapped, system_roles};
pub use catalog::{build_catalog, CatalogFeeds, CatalogSources, Group, Subject};
pub use config::ServerConfig;
pub use constants::*;
pub use db::LmdbStore;
pub use error::{GrantmapError, Result};
pub use lifecycle::RoleManager;
pub use mutator::{canonicalize, toggle_action, toggle_full_access, toggle_group_access};
pub use permission::{Grant, Permission};
pub use resolver::{grant_state, group_has_wildcard, has_full_access, is_granted, subject_has_wildcard, GrantState};
pub use role::{PermissionSet, Role, RoleChanges};
pub use store::{MemoryStore, RoleDirectory, RoleStore, UserDirectory};
