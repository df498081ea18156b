//! Page lifecycle tests
//!
//! Creation defaults for root and child pages, creator access, and the
//! checks guarding page moves.

mod common;

use common::*;
use pageperm::{create_page, move_page, NewPage, OpSet, PermError, PermissionLevel, PermissionRead};
use pretty_assertions::assert_eq;

// ============================================================================
// Creation
// ============================================================================

/// Root pages get a local space row at full access by default
#[test]
fn root_page_defaults_to_full_access_for_space() {
    let (_dir, store) = setup();
    let created = create_page(&store, NewPage::root("root", SPACE)).unwrap();

    assert_eq!(created.permissions.len(), 1);
    let p = &created.permissions[0];
    assert_eq!(p.grantee, space());
    assert_eq!(p.level, PermissionLevel::FullAccess);
    assert!(!p.is_inherited());
}

/// The space default level is used for the root's space row
#[test]
fn root_page_uses_space_default() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);

    assert_eq!(ops(&store, "root", &space()), Some(PermissionLevel::View.operations()));
}

/// Child pages copy every parent row, pointing at its source
#[test]
fn child_page_inherits_parent_rows() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    let editor = grant(&store, "root", role("writers"), PermissionLevel::Editor);
    child(&store, "a", "root");
    child(&store, "b", "a");

    let root_space = row(&store, "root", &space()).unwrap();
    for page in ["a", "b"] {
        assert_eq!(row(&store, page, &space()).unwrap().inherited_from, Some(root_space.id.clone()));
        assert_eq!(row(&store, page, &role("writers")).unwrap().inherited_from, Some(editor.id.clone()));
        assert_all_legal(&store, page);
    }
}

/// A creator without full access on the parent gets a local full-access row
#[test]
fn creator_gets_full_access() {
    let (_dir, store) = setup();
    create_page(&store, NewPage::root("root", SPACE).space_default(PermissionLevel::View).created_by("alice")).unwrap();
    let created = create_page(&store, NewPage::child("a", SPACE, "root").created_by("bob")).unwrap();

    let bob = created.permission_for(&user("bob")).unwrap();
    assert_eq!(bob.level, PermissionLevel::FullAccess);
    assert!(!bob.is_inherited());

    // alice's root grant flows down as a copy
    let alice = created.permission_for(&user("alice")).unwrap();
    assert_eq!(alice.level, PermissionLevel::FullAccess);
    assert!(alice.is_inherited());
}

/// A creator already holding full access through the parent gets no extra row
#[test]
fn creator_with_inherited_full_access_keeps_copy() {
    let (_dir, store) = setup();
    create_page(&store, NewPage::root("root", SPACE).created_by("alice")).unwrap();
    create_page(&store, NewPage::child("a", SPACE, "root").created_by("alice")).unwrap();

    let alice = row(&store, "a", &user("alice")).unwrap();
    assert!(alice.is_inherited());
    assert_unique_grantees(&store, "a");
}

/// Creating an existing page fails
#[test]
fn duplicate_page_rejected() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);

    let err = create_page(&store, NewPage::root("root", SPACE)).unwrap_err();
    assert!(matches!(err, PermError::PageExists(id) if id == "root"));
}

/// A missing parent aborts creation without storing the page
#[test]
fn missing_parent_rejected() {
    let (_dir, store) = setup();

    let err = create_page(&store, NewPage::child("a", SPACE, "ghost")).unwrap_err();
    assert!(err.is_not_found());
    assert!(store.read(|tx| tx.page("a")).unwrap().is_none());
}

/// Parents must live in the same space
#[test]
fn cross_space_parent_rejected_on_create() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);

    let err = create_page(&store, NewPage::child("a", "space-2", "root")).unwrap_err();
    assert!(matches!(err, PermError::CrossSpaceParent { .. }));
}

/// Empty ids are rejected before anything is written
#[test]
fn empty_id_rejected() {
    let (_dir, store) = setup();

    let err = create_page(&store, NewPage::root("", SPACE)).unwrap_err();
    assert!(matches!(err, PermError::InvalidId(_)));
}

// ============================================================================
// Moves
// ============================================================================

/// A page cannot be moved under itself or its own descendant
#[test]
fn move_into_own_subtree_rejected() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");
    child(&store, "b", "a");

    let err = move_page(&store, "a", Some("a")).unwrap_err();
    assert!(matches!(err, PermError::CircularReference { .. }));
    let err = move_page(&store, "a", Some("b")).unwrap_err();
    assert!(matches!(err, PermError::CircularReference { .. }));

    // Nothing moved
    assert_eq!(store.read(|tx| tx.page("a")).unwrap().unwrap().parent_id.as_deref(), Some("root"));
}

/// Moves across spaces are rejected
#[test]
fn cross_space_move_rejected() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    create_page(&store, NewPage::root("other", "space-2")).unwrap();

    let err = move_page(&store, "root", Some("other")).unwrap_err();
    assert!(matches!(err, PermError::CrossSpaceParent { .. }));
}

/// Moving updates the child and root indexes
#[test]
fn move_updates_indexes() {
    let (_dir, store) = setup();
    root(&store, "root", PermissionLevel::View);
    child(&store, "a", "root");

    move_page(&store, "a", None).unwrap();

    let (children, roots) = store
        .read(|tx| Ok((tx.child_ids("root")?, tx.root_ids(SPACE)?)))
        .unwrap();
    assert!(children.is_empty());
    assert_eq!(roots, vec!["a".to_string(), "root".to_string()]);
}

/// Moving a page keeps the flags every grantee had
#[test]
fn move_keeps_operations() {
    let (_dir, store) = setup();
    root(&store, "left", PermissionLevel::Editor);
    root(&store, "right", PermissionLevel::View);
    child(&store, "a", "left");
    let before = grants(&store, "a");

    move_page(&store, "a", Some("right")).unwrap();

    assert_eq!(grants(&store, "a"), before);
    assert_eq!(ops(&store, "a", &space()), Some(PermissionLevel::Editor.operations()));
    assert_ne!(ops(&store, "a", &space()), Some(OpSet::EMPTY));
    assert_all_legal(&store, "a");
}
