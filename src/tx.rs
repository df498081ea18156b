//! Transaction-scoped access to pages and permissions.
//!
//! Every algorithm in this crate takes a `PermissionRead` or `PermissionTx`
//! handle instead of reaching for a global database, so a whole repair or
//! propagation pass runs against one snapshot and commits (or rolls back)
//! as a unit.

use heed::{RoTxn, RwTxn};

use crate::db::Dbs;
use crate::error::{PermError, Result};
use crate::keys::{pair_key, validate_id};
use crate::types::{Page, Permission};

/// Read half of a transaction handle
pub trait PermissionRead {
    fn page(&self, id: &str) -> Result<Option<Page>>;

    /// Ids of the direct children of a page
    fn child_ids(&self, page_id: &str) -> Result<Vec<String>>;

    /// Ids of the pages without a parent in a space
    fn root_ids(&self, space_id: &str) -> Result<Vec<String>>;

    fn permission(&self, id: &str) -> Result<Option<Permission>>;

    fn page_permissions(&self, page_id: &str) -> Result<Vec<Permission>>;

    /// Ids of the permissions whose `inherited_from` is `source_id`
    fn inheritor_ids(&self, source_id: &str) -> Result<Vec<String>>;

    /// Bound on ancestor walks and subtree recursion
    fn max_tree_depth(&self) -> usize;

    fn require_page(&self, id: &str) -> Result<Page> {
        self.page(id)?.ok_or_else(|| PermError::PageNotFound(id.to_string()))
    }

    fn require_permission(&self, id: &str) -> Result<Permission> {
        self.permission(id)?
            .ok_or_else(|| PermError::PermissionNotFound(id.to_string()))
    }
}

/// Write half of a transaction handle
pub trait PermissionTx: PermissionRead {
    /// Allocate a fresh permission id
    fn allocate_id(&mut self) -> Result<String>;

    /// Insert or update a page, keeping the child and root indexes in sync
    fn put_page(&mut self, page: &Page) -> Result<()>;

    /// Insert or update a permission row, keeping its indexes in sync.
    /// Fails if another row on the page already targets the same grantee.
    fn put_permission(&mut self, permission: &Permission) -> Result<()>;

    /// Delete permission rows by id, returning how many existed
    fn delete_permissions(&mut self, ids: &[String]) -> Result<usize>;

    /// Insert many rows at once
    fn insert_permissions(&mut self, permissions: &[Permission]) -> Result<()> {
        for p in permissions {
            self.put_permission(p)?;
        }
        Ok(())
    }
}

/// Read-only snapshot
pub struct ReadTx<'a, 'e> {
    txn: &'a RoTxn<'e>,
    dbs: &'a Dbs,
    max_depth: usize,
}

impl<'a, 'e> ReadTx<'a, 'e> {
    pub(crate) fn new(txn: &'a RoTxn<'e>, dbs: &'a Dbs, max_depth: usize) -> Self {
        ReadTx { txn, dbs, max_depth }
    }
}

impl PermissionRead for ReadTx<'_, '_> {
    fn page(&self, id: &str) -> Result<Option<Page>> {
        self.dbs.get_page(self.txn, id)
    }

    fn child_ids(&self, page_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(self.txn, &self.dbs.children, page_id)
    }

    fn root_ids(&self, space_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(self.txn, &self.dbs.roots, space_id)
    }

    fn permission(&self, id: &str) -> Result<Option<Permission>> {
        self.dbs.get_permission(self.txn, id)
    }

    fn page_permissions(&self, page_id: &str) -> Result<Vec<Permission>> {
        self.dbs.list_page_permissions(self.txn, page_id)
    }

    fn inheritor_ids(&self, source_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(self.txn, &self.dbs.inheritors, source_id)
    }

    fn max_tree_depth(&self) -> usize {
        self.max_depth
    }
}

/// Write transaction over the LMDB store
pub struct Tx<'s> {
    txn: RwTxn<'s>,
    dbs: &'s Dbs,
    max_depth: usize,
}

impl<'s> Tx<'s> {
    pub(crate) fn new(txn: RwTxn<'s>, dbs: &'s Dbs, max_depth: usize) -> Self {
        Tx { txn, dbs, max_depth }
    }

    /// Commit every write made through this handle
    pub fn commit(self) -> Result<()> {
        self.txn.commit()?;
        Ok(())
    }

    /// Discard every write made through this handle
    pub fn abort(self) {
        self.txn.abort();
    }

    fn unindex_permission(&mut self, p: &Permission) -> Result<()> {
        self.dbs.page_perms.delete(&mut self.txn, &pair_key(&p.page_id, &p.id))?;
        if let Some(source) = &p.inherited_from {
            self.dbs.inheritors.delete(&mut self.txn, &pair_key(source, &p.id))?;
        }
        Ok(())
    }

    fn unindex_page(&mut self, page: &Page) -> Result<()> {
        match &page.parent_id {
            Some(parent) => self.dbs.children.delete(&mut self.txn, &pair_key(parent, &page.id))?,
            None => self.dbs.roots.delete(&mut self.txn, &pair_key(&page.space_id, &page.id))?,
        };
        Ok(())
    }
}

impl PermissionRead for Tx<'_> {
    fn page(&self, id: &str) -> Result<Option<Page>> {
        self.dbs.get_page(&self.txn, id)
    }

    fn child_ids(&self, page_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(&self.txn, &self.dbs.children, page_id)
    }

    fn root_ids(&self, space_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(&self.txn, &self.dbs.roots, space_id)
    }

    fn permission(&self, id: &str) -> Result<Option<Permission>> {
        self.dbs.get_permission(&self.txn, id)
    }

    fn page_permissions(&self, page_id: &str) -> Result<Vec<Permission>> {
        self.dbs.list_page_permissions(&self.txn, page_id)
    }

    fn inheritor_ids(&self, source_id: &str) -> Result<Vec<String>> {
        self.dbs.list_members(&self.txn, &self.dbs.inheritors, source_id)
    }

    fn max_tree_depth(&self) -> usize {
        self.max_depth
    }
}

impl PermissionTx for Tx<'_> {
    fn allocate_id(&mut self) -> Result<String> {
        let id = self.dbs.meta.get(&self.txn, "next_id")?.unwrap_or(1);
        self.dbs.meta.put(&mut self.txn, "next_id", &(id + 1))?;
        Ok(format!("perm-{}", id))
    }

    fn put_page(&mut self, page: &Page) -> Result<()> {
        validate_id(&page.id)?;
        validate_id(&page.space_id)?;
        if let Some(parent) = &page.parent_id {
            validate_id(parent)?;
        }
        if let Some(old) = self.page(&page.id)? {
            self.unindex_page(&old)?;
        }
        self.dbs.pages.put(&mut self.txn, &page.id, &serde_json::to_vec(page)?)?;
        match &page.parent_id {
            Some(parent) => self.dbs.children.put(&mut self.txn, &pair_key(parent, &page.id), &page.id)?,
            None => self.dbs.roots.put(&mut self.txn, &pair_key(&page.space_id, &page.id), &page.id)?,
        }
        Ok(())
    }

    fn put_permission(&mut self, permission: &Permission) -> Result<()> {
        validate_id(&permission.id)?;
        validate_id(&permission.page_id)?;
        if let Some(source) = &permission.inherited_from {
            validate_id(source)?;
        }
        let clash = self
            .page_permissions(&permission.page_id)?
            .into_iter()
            .any(|p| p.id != permission.id && p.grantee.matches(&permission.grantee));
        if clash {
            return Err(PermError::Corrupt(format!(
                "page {} already has a permission for {}",
                permission.page_id, permission.grantee
            )));
        }
        if let Some(old) = self.permission(&permission.id)? {
            self.unindex_permission(&old)?;
        }
        self.dbs
            .permissions
            .put(&mut self.txn, &permission.id, &serde_json::to_vec(permission)?)?;
        self.dbs.page_perms.put(
            &mut self.txn,
            &pair_key(&permission.page_id, &permission.id),
            &permission.id,
        )?;
        if let Some(source) = &permission.inherited_from {
            self.dbs
                .inheritors
                .put(&mut self.txn, &pair_key(source, &permission.id), &permission.id)?;
        }
        Ok(())
    }

    fn delete_permissions(&mut self, ids: &[String]) -> Result<usize> {
        let mut count = 0;
        for id in ids {
            if let Some(old) = self.permission(id)? {
                self.unindex_permission(&old)?;
                self.dbs.permissions.delete(&mut self.txn, id)?;
                count += 1;
            }
        }
        Ok(count)
    }
}
