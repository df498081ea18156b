//! Permission upkeep after a page changes parent

use std::collections::HashMap;

use crate::compare::{find_existing_permission_for_group, has_same_or_more_permissions};
use crate::db::Store;
use crate::error::Result;
use crate::replace::{relink_descendants, replace_illegal_permissions_in, source_is_legal, Relink};
use crate::tx::PermissionTx;
use crate::types::{PageWithPermissions, Permission};

/// Reconcile a moved page's permissions in its own transaction
pub fn handle_page_repositioned(store: &Store, page_id: &str) -> Result<PageWithPermissions> {
    store.transact(|tx| handle_page_repositioned_in(tx, page_id))
}

/// Reconcile a moved page's permissions after its `parent_id` changed.
///
/// Rows that no longer trace to an ancestor are repaired first. Then, when
/// every parent grantee is covered by the page with the same or more flags,
/// each page row whose level exactly equals the parent's row for that
/// grantee rejoins the parent's inheritance chain. Rows that differ from the
/// parent stay local.
pub fn handle_page_repositioned_in<T: PermissionTx + ?Sized>(
    tx: &mut T,
    page_id: &str,
) -> Result<PageWithPermissions> {
    let tree = replace_illegal_permissions_in(tx, page_id)?;
    let target = tree.target();

    let Some(parent) = tree.parent() else {
        tracing::debug!(page_id, "page is now a root");
        return Ok(PageWithPermissions {
            page: target.page.clone(),
            permissions: target.permissions.clone(),
        });
    };

    if !has_same_or_more_permissions(&parent.permissions, &target.permissions) {
        tracing::debug!(page_id, parent_id = %parent.page.id, "page does not cover parent; keeping local permissions");
        return Ok(PageWithPermissions {
            page: target.page.clone(),
            permissions: target.permissions.clone(),
        });
    }

    let mut relinks = HashMap::new();
    let mut linked = 0;
    for parent_row in &parent.permissions {
        let Some(own) = find_existing_permission_for_group(&parent_row.assignment(), &target.permissions, false)
        else {
            continue;
        };
        if !source_is_legal(&tree.ancestors, parent_row) {
            tracing::warn!(permission_id = %parent_row.id, "parent permission has an illegal source; not inheriting");
            continue;
        }
        let source = parent_row.source_id();
        if own.inherited_from.as_deref() == Some(source) {
            continue;
        }
        let linked_row = Permission {
            inherited_from: Some(source.to_string()),
            ..own.clone()
        };
        tx.put_permission(&linked_row)?;
        if !own.is_inherited() {
            relinks.insert(own.id.clone(), Relink::towards(&linked_row));
        }
        linked += 1;
    }

    let relinked = relink_descendants(tx, tree.descendants(), &relinks, |_| true)?;
    tracing::info!(page_id, parent_id = %parent.page.id, linked, relinked, "page repositioned");

    Ok(PageWithPermissions {
        page: target.page.clone(),
        permissions: tx.page_permissions(page_id)?,
    })
}
