//! Granting, revoking and evaluating page permissions

use std::collections::HashSet;

use crate::compare::{find_existing_permission_for_group, has_same_or_more_permissions};
use crate::db::Store;
use crate::error::{PermError, Result};
use crate::propagate::handle_page_permission_added_in;
use crate::tree::PageTree;
use crate::tx::{PermissionRead, PermissionTx};
use crate::types::{Grantee, OpSet, Page, Permission, PermissionAssignment};

/// Who is asking for access to a page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requester {
    pub user_id: Option<String>,
    pub role_ids: Vec<String>,
    /// Members of the page's space receive the space-wide row
    pub space_member: bool,
}

impl Requester {
    pub fn anonymous() -> Self {
        Requester::default()
    }

    pub fn member(user_id: &str) -> Self {
        Requester {
            user_id: Some(user_id.to_string()),
            role_ids: Vec::new(),
            space_member: true,
        }
    }

    pub fn with_roles(mut self, roles: &[&str]) -> Self {
        self.role_ids = roles.iter().map(|r| r.to_string()).collect();
        self
    }
}

fn validate_grantee(page: &Page, grantee: &Grantee) -> Result<()> {
    match grantee {
        Grantee::Space(space_id) if *space_id != page.space_id => Err(PermError::InvalidGrantee(format!(
            "space permissions on page {} must target space {}",
            page.id, page.space_id
        ))),
        Grantee::User(id) | Grantee::Role(id) | Grantee::Space(id) if id.is_empty() => {
            Err(PermError::InvalidGrantee(format!("empty {:?} id", grantee.group())))
        }
        _ => Ok(()),
    }
}

/// Write `row`, then refresh the rows on the page's subtree that copy it (or
/// the source it copied before): they take the new level and point at the
/// new source
fn store_row<T: PermissionTx + ?Sized>(tx: &mut T, row: &Permission, previous: Option<&Permission>) -> Result<usize> {
    tx.put_permission(row)?;
    let tree = PageTree::resolve(&*tx, &row.page_id)?;

    let mut copied = HashSet::from([row.id.as_str()]);
    if let Some(old_source) = previous.and_then(|p| p.inherited_from.as_deref()) {
        if Some(old_source) != row.inherited_from.as_deref() {
            copied.insert(old_source);
        }
    }

    let mut refreshed = 0;
    for node in tree.descendants() {
        for copy in &node.permissions {
            let Some(source) = copy.inherited_from.as_deref() else {
                continue;
            };
            if !copied.contains(source) || !copy.grantee.matches(&row.grantee) {
                continue;
            }
            let updated = Permission {
                level: row.level,
                inherited_from: Some(row.source_id().to_string()),
                ..copy.clone()
            };
            if updated != *copy {
                tx.put_permission(&updated)?;
                refreshed += 1;
            }
        }
    }
    Ok(refreshed)
}

/// Grant `assignment` on a page in one transaction
pub fn upsert_permission(store: &Store, page_id: &str, assignment: PermissionAssignment) -> Result<Permission> {
    store.transact(|tx| upsert_permission_in(tx, page_id, assignment))
}

/// Grant `assignment` on a page, replacing the value of any row the grantee
/// already has there. When the parent grants the same grantee the same level
/// the row inherits from the parent's source instead of being local. The new
/// value is then propagated down the tree.
pub fn upsert_permission_in<T: PermissionTx + ?Sized>(
    tx: &mut T,
    page_id: &str,
    assignment: PermissionAssignment,
) -> Result<Permission> {
    let page = tx.require_page(page_id)?;
    validate_grantee(&page, &assignment.grantee)?;

    let parent_rows = match &page.parent_id {
        Some(parent_id) => tx.page_permissions(parent_id)?,
        None => Vec::new(),
    };
    let inherited_from = find_existing_permission_for_group(&assignment, &parent_rows, false)
        .map(|p| p.source_id().to_string());

    let own_rows = tx.page_permissions(page_id)?;
    let existing = find_existing_permission_for_group(&assignment, &own_rows, true).cloned();
    let row = Permission {
        id: match &existing {
            Some(p) => p.id.clone(),
            None => tx.allocate_id()?,
        },
        page_id: page_id.to_string(),
        grantee: assignment.grantee,
        level: assignment.level,
        inherited_from,
    };
    if existing.as_ref() == Some(&row) {
        return Ok(row);
    }

    let refreshed = store_row(tx, &row, existing.as_ref())?;
    tracing::debug!(
        page_id,
        grantee = %row.grantee,
        level = %row.level,
        inherited = row.is_inherited(),
        refreshed,
        "permission upserted"
    );
    handle_page_permission_added_in(tx, &row.id)?;

    let rows = tx.page_permissions(page_id)?;
    find_existing_permission_for_group(&row.assignment(), &rows, true)
        .cloned()
        .ok_or(PermError::PermissionNotFound(row.id))
}

/// Make a page inherit the permission `source_id` in one transaction
pub fn inherit_permission(store: &Store, page_id: &str, source_id: &str) -> Result<Permission> {
    store.transact(|tx| inherit_permission_in(tx, page_id, source_id))
}

/// Copy the permission `source_id` onto a page.
///
/// The copy points at the source's authoritative row when the requested row
/// lives on an ancestor and the page, with the copy added, covers every
/// grantee of that ancestor with the same or more flags. Otherwise the copy
/// is local.
pub fn inherit_permission_in<T: PermissionTx + ?Sized>(tx: &mut T, page_id: &str, source_id: &str) -> Result<Permission> {
    let requested = tx.require_permission(source_id)?;
    let source = match &requested.inherited_from {
        Some(id) => tx.require_permission(id)?,
        None => requested.clone(),
    };
    if requested.page_id == page_id || source.page_id == page_id {
        return Err(PermError::SelfInheritance);
    }

    let page = tx.require_page(page_id)?;
    validate_grantee(&page, &source.grantee)?;
    let tree = PageTree::resolve(&*tx, page_id)?;
    let inherited_from = match tree.ancestor_position(&requested.page_id).map(|i| &tree.ancestors[i]) {
        Some(holder) => {
            let mut covered = tree.target().permissions.clone();
            covered.push(requested.clone());
            if has_same_or_more_permissions(&holder.permissions, &covered) {
                Some(source.id.clone())
            } else {
                tracing::debug!(
                    page_id,
                    holder = %holder.page.id,
                    "page does not cover the source page; copying as a local row"
                );
                None
            }
        }
        None => {
            let err = PermError::CannotInheritOutsideTree {
                source_page: requested.page_id.clone(),
                target_page: page_id.to_string(),
            };
            tracing::warn!(error = %err, "copying permission as a local row");
            None
        }
    };

    let existing = find_existing_permission_for_group(&source.assignment(), &tree.target().permissions, true).cloned();
    let row = Permission {
        id: match &existing {
            Some(p) => p.id.clone(),
            None => tx.allocate_id()?,
        },
        page_id: page_id.to_string(),
        grantee: source.grantee.clone(),
        level: source.level,
        inherited_from,
    };
    if existing.as_ref() != Some(&row) {
        store_row(tx, &row, existing.as_ref())?;
    }
    Ok(row)
}

/// Delete a permission and every row inheriting from it in one transaction
pub fn delete_permission(store: &Store, permission_id: &str) -> Result<usize> {
    store.transact(|tx| delete_permission_in(tx, permission_id))
}

/// Delete a permission and every row inheriting from it, returning the
/// number of rows removed
pub fn delete_permission_in<T: PermissionTx + ?Sized>(tx: &mut T, permission_id: &str) -> Result<usize> {
    tx.require_permission(permission_id)?;
    let mut doomed = vec![permission_id.to_string()];
    let mut i = 0;
    while i < doomed.len() {
        for id in tx.inheritor_ids(&doomed[i])? {
            if !doomed.contains(&id) {
                doomed.push(id);
            }
        }
        i += 1;
    }
    let count = tx.delete_permissions(&doomed)?;
    tracing::debug!(permission_id, count, "permission deleted");
    Ok(count)
}

/// Effective operations `requester` holds on a page
pub fn compute_page_permissions(store: &Store, page_id: &str, requester: &Requester) -> Result<OpSet> {
    store.read(|tx| compute_page_permissions_in(tx, page_id, requester))
}

/// Union of the requester's user row, role rows, the space row (members
/// only) and the public row
pub fn compute_page_permissions_in<R: PermissionRead + ?Sized>(
    tx: &R,
    page_id: &str,
    requester: &Requester,
) -> Result<OpSet> {
    let page = tx.require_page(page_id)?;
    let ops = tx
        .page_permissions(page_id)?
        .iter()
        .filter(|p| match &p.grantee {
            Grantee::User(id) => requester.user_id.as_deref() == Some(id.as_str()),
            Grantee::Role(id) => requester.role_ids.contains(id),
            Grantee::Space(id) => requester.space_member && *id == page.space_id,
            Grantee::Public => true,
        })
        .fold(OpSet::EMPTY, |acc, p| acc.union(p.operations()));
    Ok(ops)
}
