//! Propagation of a newly added permission down the page tree

use std::collections::{HashMap, HashSet};

use crate::compare::{find_existing_permission_for_group, has_same_or_more_permissions};
use crate::db::Store;
use crate::error::Result;
use crate::replace::{relink_descendants, replace_illegal_permissions_in, Relink};
use crate::tx::PermissionTx;
use crate::types::Permission;

/// Propagate a newly added permission in its own transaction
pub fn handle_page_permission_added(store: &Store, permission_id: &str) -> Result<bool> {
    store.transact(|tx| handle_page_permission_added_in(tx, permission_id))
}

/// Propagate the permissions of the page owning `permission_id` to every
/// descendant reachable through an unbroken chain of eligible pages.
///
/// A child is eligible when it covers the page's permissions as they were
/// before the addition and does not exceed them afterwards. Eligible children
/// lose their rows and receive inherited copies of the page's rows. The walk
/// does not pass an ineligible child. All deletes and inserts are issued in
/// one batch after the walk.
pub fn handle_page_permission_added_in<T: PermissionTx + ?Sized>(tx: &mut T, permission_id: &str) -> Result<bool> {
    let added = tx.require_permission(permission_id)?;
    let tree = replace_illegal_permissions_in(tx, &added.page_id)?;
    let baseline = &tree.target().permissions;
    let previous: Vec<Permission> = baseline.iter().filter(|p| p.id != added.id).cloned().collect();

    let mut superseded = Vec::new();
    let mut inherited = Vec::new();
    let mut relinks = HashMap::new();
    let mut replaced = HashSet::new();

    let mut stack: Vec<usize> = tree.target().children.iter().rev().copied().collect();
    while let Some(idx) = stack.pop() {
        let child = tree.node(idx);
        let eligible = has_same_or_more_permissions(&previous, &child.permissions)
            && has_same_or_more_permissions(&child.permissions, baseline);
        if !eligible {
            tracing::debug!(page_id = %child.page.id, "child customized; propagation stops here");
            continue;
        }
        for row in &child.permissions {
            if let Some(b) = find_existing_permission_for_group(&row.assignment(), baseline, true) {
                relinks.insert(row.id.clone(), Relink::towards(b));
            }
            superseded.push(row.id.clone());
        }
        for b in baseline {
            inherited.push(Permission {
                id: tx.allocate_id()?,
                page_id: child.page.id.clone(),
                grantee: b.grantee.clone(),
                level: b.level,
                inherited_from: Some(b.source_id().to_string()),
            });
        }
        replaced.insert(child.page.id.as_str());
        stack.extend(child.children.iter().rev().copied());
    }

    tx.delete_permissions(&superseded)?;
    tx.insert_permissions(&inherited)?;

    let kept = tree.descendants().filter(|node| !replaced.contains(node.page.id.as_str()));
    let relinked = relink_descendants(tx, kept, &relinks, |_| true)?;

    tracing::info!(
        permission_id,
        page_id = %added.page_id,
        pages = replaced.len(),
        deleted = superseded.len(),
        inserted = inherited.len(),
        relinked,
        "propagated page permissions"
    );
    Ok(true)
}
