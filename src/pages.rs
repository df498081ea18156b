//! Page lifecycle: creation with default permissions, and moves

use crate::compare::find_existing_permission_for_group;
use crate::db::Store;
use crate::error::{PermError, Result};
use crate::grants::upsert_permission_in;
use crate::keys::validate_id;
use crate::reposition::handle_page_repositioned_in;
use crate::tree::resolve_ancestors;
use crate::tx::PermissionTx;
use crate::types::{Grantee, Page, PageWithPermissions, Permission, PermissionAssignment, PermissionLevel};

/// Values for a page about to be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPage {
    pub id: String,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub index: i32,
    pub created_by: Option<String>,
    /// Level the space grants on new root pages; `None` means full access
    pub space_default: Option<PermissionLevel>,
}

impl NewPage {
    pub fn root(id: &str, space_id: &str) -> Self {
        NewPage {
            id: id.to_string(),
            space_id: space_id.to_string(),
            parent_id: None,
            index: 0,
            created_by: None,
            space_default: None,
        }
    }

    pub fn child(id: &str, space_id: &str, parent_id: &str) -> Self {
        NewPage {
            parent_id: Some(parent_id.to_string()),
            ..Self::root(id, space_id)
        }
    }

    pub fn created_by(mut self, user_id: &str) -> Self {
        self.created_by = Some(user_id.to_string());
        self
    }

    pub fn space_default(mut self, level: PermissionLevel) -> Self {
        self.space_default = Some(level);
        self
    }
}

/// Create a page and its initial permissions in one transaction
pub fn create_page(store: &Store, new: NewPage) -> Result<PageWithPermissions> {
    store.transact(|tx| create_page_in(tx, new))
}

pub fn create_page_in<T: PermissionTx + ?Sized>(tx: &mut T, new: NewPage) -> Result<PageWithPermissions> {
    validate_id(&new.id)?;
    if tx.page(&new.id)?.is_some() {
        return Err(PermError::PageExists(new.id));
    }
    if let Some(parent_id) = &new.parent_id {
        let parent = tx.require_page(parent_id)?;
        if parent.space_id != new.space_id {
            return Err(PermError::CrossSpaceParent { page: new.id, parent: parent.id });
        }
    }
    let space_default = new.space_default;
    let page = Page {
        id: new.id,
        space_id: new.space_id,
        parent_id: new.parent_id,
        index: new.index,
        created_by: new.created_by,
    };
    tx.put_page(&page)?;
    handle_page_created_in(tx, &page.id, space_default)
}

/// Assign the initial permissions of a stored page in its own transaction
pub fn handle_page_created(
    store: &Store,
    page_id: &str,
    space_default: Option<PermissionLevel>,
) -> Result<PageWithPermissions> {
    store.transact(|tx| handle_page_created_in(tx, page_id, space_default))
}

/// Assign the initial permissions of a freshly stored page.
///
/// A child page inherits a copy of every parent row. A root page receives a
/// local space row at `space_default` (full access when unset). The creator
/// always ends up with full access.
pub fn handle_page_created_in<T: PermissionTx + ?Sized>(
    tx: &mut T,
    page_id: &str,
    space_default: Option<PermissionLevel>,
) -> Result<PageWithPermissions> {
    let page = tx.require_page(page_id)?;

    match &page.parent_id {
        Some(parent_id) => {
            let copies = tx
                .page_permissions(parent_id)?
                .into_iter()
                .map(|parent_row| -> Result<Permission> {
                    Ok(Permission {
                        id: tx.allocate_id()?,
                        page_id: page.id.clone(),
                        grantee: parent_row.grantee.clone(),
                        level: parent_row.level,
                        inherited_from: Some(parent_row.source_id().to_string()),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            tx.insert_permissions(&copies)?;
        }
        None => {
            let level = space_default.unwrap_or(PermissionLevel::FullAccess);
            let row = Permission {
                id: tx.allocate_id()?,
                page_id: page.id.clone(),
                grantee: Grantee::Space(page.space_id.clone()),
                level,
                inherited_from: None,
            };
            tx.put_permission(&row)?;
        }
    }

    if let Some(creator) = &page.created_by {
        let grantee = Grantee::User(creator.clone());
        let full_access = PermissionAssignment::new(grantee, PermissionLevel::FullAccess);
        let rows = tx.page_permissions(&page.id)?;
        if find_existing_permission_for_group(&full_access, &rows, false).is_none() {
            upsert_permission_in(tx, &page.id, full_access)?;
        }
    }

    tracing::debug!(page_id, parent_id = ?page.parent_id, "page created");
    Ok(PageWithPermissions {
        permissions: tx.page_permissions(&page.id)?,
        page,
    })
}

/// Move a page under `new_parent` (or make it a root) in one transaction
pub fn move_page(store: &Store, page_id: &str, new_parent: Option<&str>) -> Result<PageWithPermissions> {
    store.transact(|tx| move_page_in(tx, page_id, new_parent))
}

/// Change a page's parent, then reconcile its permissions
pub fn move_page_in<T: PermissionTx + ?Sized>(
    tx: &mut T,
    page_id: &str,
    new_parent: Option<&str>,
) -> Result<PageWithPermissions> {
    let page = tx.require_page(page_id)?;
    if let Some(parent_id) = new_parent {
        no_cycle(&*tx, &page, parent_id)?;
    }
    let moved = Page {
        parent_id: new_parent.map(str::to_string),
        ..page
    };
    tx.put_page(&moved)?;
    tracing::debug!(page_id, parent_id = ?new_parent, "page moved");
    handle_page_repositioned_in(tx, page_id)
}

fn no_cycle<T: PermissionTx + ?Sized>(tx: &T, page: &Page, parent_id: &str) -> Result<()> {
    let cycle = || PermError::CircularReference {
        page: page.id.clone(),
        parent: parent_id.to_string(),
    };
    if page.id == parent_id {
        return Err(cycle());
    }
    let parent = tx.require_page(parent_id)?;
    if parent.space_id != page.space_id {
        return Err(PermError::CrossSpaceParent {
            page: page.id.clone(),
            parent: parent.id,
        });
    }
    if resolve_ancestors(tx, &parent)?.iter().any(|a| a.page.id == page.id) {
        return Err(cycle());
    }
    Ok(())
}
