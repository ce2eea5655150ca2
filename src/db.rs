//! LMDB-backed role store and user directory
//!
//! Databases:
//! - `roles`: role id → JSON role
//! - `users`: user id → role id
//! - `members`: `role id \0 user id` → unit, prefix-scanned per role
//!
//! Every trait method runs in its own LMDB transaction. LMDB serializes
//! writers, so `modify` is a true read-modify-write and `delete_reassigning`
//! moves users and removes the role in a single commit.

use std::path::Path;

use heed::types::{Bytes, Str, Unit};
use heed::{Database, Env, EnvOpenOptions, RoTxn, RwTxn};
use tracing::debug;

use crate::error::{err, GrantmapError, Result};
use crate::role::Role;
use crate::store::{check_delete, RoleDirectory, RoleStore, UserDirectory};

/// Default LMDB map size (1 GiB)
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

#[inline]
fn member_key(role_id: &str, user_id: &str) -> String {
    format!("{}\0{}", role_id, user_id)
}

#[inline]
fn member_prefix(role_id: &str) -> String {
    format!("{}\0", role_id)
}

/// All database handles
#[derive(Clone, Copy)]
struct Dbs {
    roles: Database<Str, Bytes>,
    users: Database<Str, Str>,
    members: Database<Str, Unit>,
}

/// Durable store implementing both [`RoleStore`] and [`UserDirectory`].
#[derive(Clone)]
pub struct LmdbStore {
    env: Env,
    dbs: Dbs,
}

impl LmdbStore {
    /// Open (creating if needed) the environment at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_map_size(path, DEFAULT_MAP_SIZE)
    }

    pub fn open_with_map_size(path: impl AsRef<Path>, map_size: usize) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(err)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe { EnvOpenOptions::new().map_size(map_size).max_dbs(3).open(path).map_err(err)? };
        let mut tx = env.write_txn().map_err(err)?;
        let dbs = Dbs {
            roles: env.create_database(&mut tx, Some("roles")).map_err(err)?,
            users: env.create_database(&mut tx, Some("users")).map_err(err)?,
            members: env.create_database(&mut tx, Some("members")).map_err(err)?,
        };
        tx.commit().map_err(err)?;
        debug!(path = %path.display(), map_size, "opened role store");
        Ok(Self { env, dbs })
    }

    /// Execute a read-only operation
    #[inline]
    fn read<T, F: FnOnce(&Dbs, &RoTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        f(&self.dbs, &self.env.read_txn().map_err(err)?)
    }

    /// Execute a write operation, committing only if `f` succeeds
    #[inline]
    fn write<T, F: FnOnce(&Dbs, &mut RwTxn) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut txn = self.env.write_txn().map_err(err)?;
        let r = f(&self.dbs, &mut txn)?;
        txn.commit().map_err(err)?;
        Ok(r)
    }

    /// Clear all databases (for testing and dev resets)
    pub fn clear_all(&self) -> Result<()> {
        self.write(|d, tx| {
            d.roles.clear(tx).map_err(err)?;
            d.users.clear(tx).map_err(err)?;
            d.members.clear(tx).map_err(err)
        })
    }
}

fn decode(bytes: &[u8]) -> Result<Role> {
    serde_json::from_slice(bytes).map_err(err)
}

fn encode(role: &Role) -> Result<Vec<u8>> {
    serde_json::to_vec(role).map_err(err)
}

fn members_of(d: &Dbs, tx: &RoTxn, role_id: &str) -> Result<Vec<String>> {
    let prefix = member_prefix(role_id);
    let mut r = Vec::new();
    for item in d.members.prefix_iter(tx, &prefix).map_err(err)? {
        let (k, _) = item.map_err(err)?;
        if let Some(user) = k.strip_prefix(prefix.as_str()) {
            r.push(user.to_string());
        }
    }
    Ok(r)
}

fn role_in(d: &Dbs, tx: &RoTxn, id: &str) -> Result<Option<Role>> {
    d.roles.get(tx, id).map_err(err)?.map(decode).transpose()
}

fn assign_in(d: &Dbs, tx: &mut RwTxn, user_id: &str, role_id: &str) -> Result<()> {
    let old = d.users.get(tx, user_id).map_err(err)?.map(str::to_string);
    if let Some(old) = old {
        d.members.delete(tx, &member_key(&old, user_id)).map_err(err)?;
    }
    d.users.put(tx, user_id, role_id).map_err(err)?;
    d.members.put(tx, &member_key(role_id, user_id), &()).map_err(err)
}

impl RoleStore for LmdbStore {
    fn get(&self, id: &str) -> Result<Option<Role>> {
        self.read(|d, tx| role_in(d, tx, id))
    }

    fn list(&self) -> Result<Vec<Role>> {
        self.read(|d, tx| {
            let mut r = Vec::new();
            for item in d.roles.iter(tx).map_err(err)? {
                let (_, v) = item.map_err(err)?;
                r.push(decode(v)?);
            }
            Ok(r)
        })
    }

    fn insert(&self, role: &Role) -> Result<bool> {
        self.write(|d, tx| {
            if d.roles.get(tx, &role.id).map_err(err)?.is_some() {
                return Ok(false);
            }
            d.roles.put(tx, &role.id, &encode(role)?).map_err(err)?;
            debug!(role = %role.id, "inserted role");
            Ok(true)
        })
    }

    fn modify(&self, id: &str, f: &mut dyn FnMut(Role) -> Result<Role>) -> Result<Role> {
        self.write(|d, tx| {
            let current = role_in(d, tx, id)?.ok_or_else(|| GrantmapError::NotFound(id.to_string()))?;
            let mut next = f(current)?;
            next.id = id.to_string();
            d.roles.put(tx, id, &encode(&next)?).map_err(err)?;
            debug!(role = %id, permissions = next.permissions.len(), "updated role");
            Ok(next)
        })
    }
}

impl UserDirectory for LmdbStore {
    fn count_users_by_role(&self, role_id: &str) -> Result<usize> {
        self.read(|d, tx| Ok(d.members.prefix_iter(tx, &member_prefix(role_id)).map_err(err)?.count()))
    }

    fn role_of(&self, user_id: &str) -> Result<Option<String>> {
        self.read(|d, tx| Ok(d.users.get(tx, user_id).map_err(err)?.map(str::to_string)))
    }

    fn assign_user(&self, user_id: &str, role_id: &str) -> Result<()> {
        self.write(|d, tx| {
            if d.roles.get(tx, role_id).map_err(err)?.is_none() {
                return Err(GrantmapError::NotFound(role_id.to_string()));
            }
            assign_in(d, tx, user_id, role_id)
        })
    }
}

impl RoleDirectory for LmdbStore {
    fn delete_reassigning(&self, id: &str, to: &str) -> Result<Vec<String>> {
        self.write(|d, tx| {
            let role = role_in(d, tx, id)?;
            let target_exists = d.roles.get(tx, to).map_err(err)?.is_some();
            check_delete(id, to, role.as_ref(), target_exists)?;

            let moved = members_of(d, tx, id)?;
            for user in &moved {
                assign_in(d, tx, user, to)?;
            }
            d.roles.delete(tx, id).map_err(err)?;
            debug!(role = %id, to, moved = moved.len(), "deleted role");
            Ok(moved)
        })
    }
}
