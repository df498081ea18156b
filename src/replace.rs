//! Illegal-permission replacement.
//!
//! An inherited row is legal while its source is a local row on one of the
//! page's ancestors granting the same flags to the same grantee. Illegal rows
//! are deleted and recreated: linked to the nearest ancestor row that grants
//! exactly the same flags, or else as a local row keeping the flags the page
//! had. Descendants that copied the lost source through this page follow the
//! replacement.

use std::collections::HashMap;

use crate::compare::{find_existing_permission_for_group, same_grant};
use crate::db::Store;
use crate::error::Result;
use crate::tree::{PageNode, PageTree};
use crate::tx::PermissionTx;
use crate::types::{Grantee, OpSet, Permission};

/// Where rows pointing at a retired source should point next
#[derive(Debug, Clone)]
pub(crate) struct Relink {
    pub grantee: Grantee,
    pub operations: OpSet,
    pub to: String,
}

impl Relink {
    pub(crate) fn towards(permission: &Permission) -> Self {
        Relink {
            grantee: permission.grantee.clone(),
            operations: permission.operations(),
            to: permission.source_id().to_string(),
        }
    }
}

/// True if `permission` is local, or inherits from a local row on one of
/// `ancestors` with the same grantee and flags
pub fn source_is_legal(ancestors: &[PageNode], permission: &Permission) -> bool {
    let Some(source_id) = permission.inherited_from.as_deref() else {
        return true;
    };
    ancestors
        .iter()
        .flat_map(|a| a.permissions.iter())
        .find(|s| s.id == source_id)
        .is_some_and(|s| !s.is_inherited() && same_grant(s, permission))
}

/// Source a row for `permission`'s grantee could inherit from: the nearest
/// ancestor row for that grantee, provided it grants exactly the same flags
pub fn find_ancestor_source(ancestors: &[PageNode], permission: &Permission) -> Option<String> {
    let assignment = permission.assignment();
    for ancestor in ancestors {
        let Some(r) = find_existing_permission_for_group(&assignment, &ancestor.permissions, true) else {
            continue;
        };
        if r.operations() != permission.operations() {
            return None;
        }
        return source_is_legal(ancestors, r).then(|| r.source_id().to_string());
    }
    None
}

/// Point rows copying a retired source at its successor. Rows whose grantee
/// or flags no longer match the successor become local.
pub(crate) fn relink_descendants<'a, T, I, F>(
    tx: &mut T,
    nodes: I,
    relinks: &HashMap<String, Relink>,
    is_stale: F,
) -> Result<usize>
where
    T: PermissionTx + ?Sized,
    I: IntoIterator<Item = &'a PageNode>,
    F: Fn(&Permission) -> bool,
{
    let mut count = 0;
    for node in nodes {
        for row in &node.permissions {
            let Some(relink) = row.inherited_from.as_ref().and_then(|s| relinks.get(s)) else {
                continue;
            };
            if !is_stale(row) {
                continue;
            }
            let inherited_from = (row.grantee.matches(&relink.grantee)
                && row.operations() == relink.operations)
                .then(|| relink.to.clone());
            if inherited_from == row.inherited_from {
                continue;
            }
            if inherited_from.is_none() {
                tracing::debug!(permission_id = %row.id, page_id = %row.page_id, "severed diverged inheritance");
            }
            tx.put_permission(&Permission { inherited_from, ..row.clone() })?;
            count += 1;
        }
    }
    Ok(count)
}

/// Repair the inherited rows of one page in its own transaction
pub fn replace_illegal_permissions(store: &Store, page_id: &str) -> Result<PageTree> {
    store.transact(|tx| replace_illegal_permissions_in(tx, page_id))
}

/// Repair the inherited rows of one page, returning the refreshed tree.
/// Running it again without intervening changes writes nothing.
pub fn replace_illegal_permissions_in<T: PermissionTx + ?Sized>(tx: &mut T, page_id: &str) -> Result<PageTree> {
    let tree = PageTree::resolve(&*tx, page_id)?;

    let mut retired = Vec::new();
    let mut replacements = Vec::new();
    let mut relinks = HashMap::new();
    for row in tree.target().permissions.iter().filter(|p| p.is_inherited()) {
        if source_is_legal(&tree.ancestors, row) {
            continue;
        }
        let replacement = Permission {
            id: tx.allocate_id()?,
            page_id: row.page_id.clone(),
            grantee: row.grantee.clone(),
            level: row.level,
            inherited_from: find_ancestor_source(&tree.ancestors, row),
        };
        tracing::debug!(
            page_id,
            grantee = %row.grantee,
            lost_source = ?row.inherited_from,
            new_source = ?replacement.inherited_from,
            "replacing illegal permission"
        );
        let relink = Relink::towards(&replacement);
        if let Some(lost) = &row.inherited_from {
            relinks.insert(lost.clone(), relink.clone());
        }
        relinks.insert(row.id.clone(), relink);
        retired.push(row.id.clone());
        replacements.push(replacement);
    }

    if retired.is_empty() {
        return Ok(tree);
    }

    tx.delete_permissions(&retired)?;
    tx.insert_permissions(&replacements)?;
    let relinked = relink_descendants(tx, tree.descendants(), &relinks, |row| {
        !source_is_legal(&tree.ancestors, row)
    })?;
    tracing::info!(page_id, replaced = retired.len(), relinked, "replaced illegal permissions");

    PageTree::resolve(&*tx, page_id)
}
