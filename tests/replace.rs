//! Illegal-permission replacement tests
//!
//! Inherited rows whose source is gone, not on an ancestor, or grants
//! different flags are replaced without changing what anyone can do.

mod common;

use common::*;
use pageperm::{replace_illegal_permissions, Permission, PermissionLevel, PermissionTx, Store};
use pretty_assertions::assert_eq;

/// Overwrite a row directly, bypassing every repair step
fn force(store: &Store, row: Permission) {
    store.transact(|tx| tx.put_permission(&row)).unwrap();
}

// ============================================================================
// Repair
// ============================================================================

/// A row copying a source with different flags becomes local with its own flags
#[test]
fn diverged_copy_becomes_local() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    let copy = row(&store, "a", &space()).unwrap();
    force(&store, Permission { level: PermissionLevel::Editor, ..copy.clone() });

    let tree = replace_illegal_permissions(&store, "a").unwrap();

    let fixed = row(&store, "a", &space()).unwrap();
    assert!(!fixed.is_inherited());
    assert_eq!(fixed.level, PermissionLevel::Editor);
    assert_ne!(fixed.id, copy.id);
    assert_eq!(tree.target().permissions, vec![fixed]);
}

/// A row copying a missing source relinks to an ancestor granting the same flags
#[test]
fn dangling_copy_relinks_to_ancestor() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    let copy = row(&store, "a", &space()).unwrap();
    force(&store, Permission { inherited_from: Some("perm-404".into()), ..copy });

    replace_illegal_permissions(&store, "a").unwrap();

    let root_space = row(&store, "root", &space()).unwrap();
    assert_eq!(row(&store, "a", &space()).unwrap().inherited_from, Some(root_space.id));
    assert_all_legal(&store, "a");
}

/// A row copying another inherited row is pointed at the authoritative one
#[test]
fn copy_of_copy_is_repaired() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    child(&store, "b", "a");
    let a_space = row(&store, "a", &space()).unwrap();
    let b_space = row(&store, "b", &space()).unwrap();
    force(&store, Permission { inherited_from: Some(a_space.id.clone()), ..b_space });

    replace_illegal_permissions(&store, "b").unwrap();

    assert_eq!(row(&store, "b", &space()).unwrap().inherited_from, a_space.inherited_from);
}

/// Descendants copying the lost source through the repaired page follow it
#[test]
fn descendants_follow_replacement() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    child(&store, "b", "a");
    let root_space = row(&store, "root", &space()).unwrap();
    // root's row disappears from under both copies
    store
        .transact(|tx| {
            tx.delete_permissions(&[root_space.id.clone()])?;
            tx.put_permission(&Permission { id: "perm-900".into(), ..root_space.clone() })
        })
        .unwrap();

    replace_illegal_permissions(&store, "a").unwrap();

    let a_space = row(&store, "a", &space()).unwrap();
    let b_space = row(&store, "b", &space()).unwrap();
    assert_eq!(a_space.inherited_from.as_deref(), Some("perm-900"));
    assert_eq!(b_space.inherited_from.as_deref(), Some("perm-900"));
    assert_all_legal(&store, "b");
}

// ============================================================================
// Guarantees
// ============================================================================

/// Replacement never changes the flags any grantee holds
#[test]
fn no_capability_loss() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    grant(&store, "root", role("writers"), PermissionLevel::Editor);
    child(&store, "a", "root");
    for p in rows(&store, "a") {
        force(&store, Permission { inherited_from: Some("perm-404".into()), ..p });
    }
    let before = grants(&store, "a");

    replace_illegal_permissions(&store, "a").unwrap();

    assert_eq!(grants(&store, "a"), before);
    assert_unique_grantees(&store, "a");
}

/// A second run without changes writes nothing
#[test]
fn replacement_is_idempotent() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    let copy = row(&store, "a", &space()).unwrap();
    force(&store, Permission { level: PermissionLevel::ProposalEditor, ..copy });
    replace_illegal_permissions(&store, "a").unwrap();
    let before = rows(&store, "a");

    replace_illegal_permissions(&store, "a").unwrap();

    assert_eq!(rows(&store, "a"), before);
}

/// Legal pages are returned as they are
#[test]
fn legal_page_untouched() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    let before = rows(&store, "a");

    let tree = replace_illegal_permissions(&store, "a").unwrap();

    assert_eq!(tree.target().permissions, before);
    assert_eq!(rows(&store, "a"), before);
}
