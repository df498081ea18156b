//! Database handles and the store that owns them

use std::fs;

use heed::types::{Bytes, Str, U64};
use heed::{Database, Env, EnvOpenOptions, RoTxn};
use serde::de::DeserializeOwned;

use crate::config::Config;
use crate::error::{PermError, Result};
use crate::keys::{owner_prefix, parse_pair};
use crate::tx::{ReadTx, Tx};
use crate::types::{Page, Permission};

// Database type aliases
pub type DbRecord = Database<Str, Bytes>;
pub type DbIndex = Database<Bytes, Str>;
pub type DbMeta = Database<Str, U64<byteorder::BigEndian>>;

/// All database handles
pub struct Dbs {
    /// page id -> JSON page
    pub pages: DbRecord,
    /// [parent][child] -> child id
    pub children: DbIndex,
    /// [space][page] -> page id, for pages without a parent
    pub roots: DbIndex,
    /// permission id -> JSON permission
    pub permissions: DbRecord,
    /// [page][permission] -> permission id
    pub page_perms: DbIndex,
    /// [source permission][permission] -> permission id
    pub inheritors: DbIndex,
    pub meta: DbMeta,
}

impl Dbs {
    pub(crate) fn get_page(&self, tx: &RoTxn, id: &str) -> Result<Option<Page>> {
        decode(self.pages.get(tx, id)?)
    }

    pub(crate) fn get_permission(&self, tx: &RoTxn, id: &str) -> Result<Option<Permission>> {
        decode(self.permissions.get(tx, id)?)
    }

    /// Member ids stored under `owner` in a pair index
    pub(crate) fn list_members(&self, tx: &RoTxn, db: &DbIndex, owner: &str) -> Result<Vec<String>> {
        let mut r = Vec::new();
        for item in db.prefix_iter(tx, &owner_prefix(owner))? {
            let (k, v) = item?;
            match parse_pair(k) {
                Some((o, _)) if o == owner => r.push(v.to_string()),
                _ => return Err(PermError::Corrupt(format!("bad index key under {}", owner))),
            }
        }
        Ok(r)
    }

    /// Permission rows of a page, ordered by id
    pub(crate) fn list_page_permissions(&self, tx: &RoTxn, page_id: &str) -> Result<Vec<Permission>> {
        let mut r = Vec::new();
        for id in self.list_members(tx, &self.page_perms, page_id)? {
            match self.get_permission(tx, &id)? {
                Some(p) => r.push(p),
                None => {
                    return Err(PermError::Corrupt(format!(
                        "page {} indexes missing permission {}",
                        page_id, id
                    )))
                }
            }
        }
        Ok(r)
    }
}

fn decode<T: DeserializeOwned>(bytes: Option<&[u8]>) -> Result<Option<T>> {
    match bytes {
        Some(b) => Ok(Some(serde_json::from_slice(b)?)),
        None => Ok(None),
    }
}

/// An open LMDB environment holding pages and permissions
pub struct Store {
    env: Env,
    dbs: Dbs,
    config: Config,
}

impl Store {
    /// Open (or create) the store described by `config`
    pub fn open(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.path)?;
        // SAFETY: LMDB requires no other processes access this path concurrently during open.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(config.map_size)
                .max_dbs(config.max_dbs)
                .open(&config.path)?
        };
        let mut tx = env.write_txn()?;
        let dbs = Dbs {
            pages: env.create_database(&mut tx, Some("pages"))?,
            children: env.create_database(&mut tx, Some("children"))?,
            roots: env.create_database(&mut tx, Some("roots"))?,
            permissions: env.create_database(&mut tx, Some("permissions"))?,
            page_perms: env.create_database(&mut tx, Some("page_perms"))?,
            inheritors: env.create_database(&mut tx, Some("inheritors"))?,
            meta: env.create_database(&mut tx, Some("meta"))?,
        };
        tx.commit()?;
        tracing::debug!(path = %config.path.display(), map_size = config.map_size, "opened permission store");
        Ok(Store { env, dbs, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a write transaction; dropping it without commit rolls back
    pub fn begin(&self) -> Result<Tx<'_>> {
        Ok(Tx::new(self.env.write_txn()?, &self.dbs, self.config.max_tree_depth))
    }

    /// Run `f` in one write transaction: commit on `Ok`, roll back on `Err`
    pub fn transact<T, F: FnOnce(&mut Tx<'_>) -> Result<T>>(&self, f: F) -> Result<T> {
        let mut tx = self.begin()?;
        match f(&mut tx) {
            Ok(r) => {
                tx.commit()?;
                Ok(r)
            }
            Err(e) => {
                tracing::debug!(error = %e, "rolling back transaction");
                Err(e)
            }
        }
    }

    /// Run `f` against a read-only snapshot
    pub fn read<T, F: FnOnce(&ReadTx<'_, '_>) -> Result<T>>(&self, f: F) -> Result<T> {
        let txn = self.env.read_txn()?;
        f(&ReadTx::new(&txn, &self.dbs, self.config.max_tree_depth))
    }

    /// Clear all databases (for testing)
    pub fn clear_all(&self) -> Result<()> {
        let mut tx = self.env.write_txn()?;
        self.dbs.pages.clear(&mut tx)?;
        self.dbs.children.clear(&mut tx)?;
        self.dbs.roots.clear(&mut tx)?;
        self.dbs.permissions.clear(&mut tx)?;
        self.dbs.page_perms.clear(&mut tx)?;
        self.dbs.inheritors.clear(&mut tx)?;
        self.dbs.meta.clear(&mut tx)?;
        tx.commit()?;
        Ok(())
    }
}
