//! Shared fixtures for the integration tests

#![allow(dead_code)]

use pageperm::{
    create_page, upsert_permission, Config, Grantee, NewPage, OpSet, Permission, PermissionAssignment,
    PermissionLevel, PermissionRead, Store,
};
use tempfile::TempDir;

pub const SPACE: &str = "space-1";

/// Fresh store in its own temp directory; keep the `TempDir` alive
pub fn setup() -> (TempDir, Store) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let dir = TempDir::new().unwrap();
    let store = Store::open(Config::at(dir.path())).unwrap();
    (dir, store)
}

pub fn space() -> Grantee {
    Grantee::Space(SPACE.to_string())
}

pub fn user(id: &str) -> Grantee {
    Grantee::User(id.to_string())
}

pub fn role(id: &str) -> Grantee {
    Grantee::Role(id.to_string())
}

pub fn root(store: &Store, id: &str, level: PermissionLevel) {
    create_page(store, NewPage::root(id, SPACE).space_default(level)).unwrap();
}

pub fn child(store: &Store, id: &str, parent: &str) {
    create_page(store, NewPage::child(id, SPACE, parent)).unwrap();
}

pub fn grant(store: &Store, page: &str, grantee: Grantee, level: PermissionLevel) -> Permission {
    upsert_permission(store, page, PermissionAssignment::new(grantee, level)).unwrap()
}

pub fn rows(store: &Store, page: &str) -> Vec<Permission> {
    let mut rows = store.read(|tx| tx.page_permissions(page)).unwrap();
    rows.sort_by(|a, b| a.grantee.to_string().cmp(&b.grantee.to_string()));
    rows
}

pub fn row(store: &Store, page: &str, grantee: &Grantee) -> Option<Permission> {
    rows(store, page).into_iter().find(|p| p.grantee.matches(grantee))
}

pub fn ops(store: &Store, page: &str, grantee: &Grantee) -> Option<OpSet> {
    row(store, page, grantee).map(|p| p.operations())
}

/// (grantee, flags) pairs of a page, ignoring ids and sources
pub fn grants(store: &Store, page: &str) -> Vec<(String, OpSet)> {
    rows(store, page)
        .into_iter()
        .map(|p| (p.grantee.to_string(), p.operations()))
        .collect()
}

/// Every row on `page` is local or copies a local row on an ancestor with
/// the same grantee and flags
pub fn assert_all_legal(store: &Store, page: &str) {
    store
        .read(|tx| {
            let tree = pageperm::PageTree::resolve(tx, page)?;
            for p in &tree.target().permissions {
                assert!(
                    pageperm::replace::source_is_legal(&tree.ancestors, p),
                    "illegal row {:?} on {}",
                    p,
                    page
                );
            }
            Ok(())
        })
        .unwrap();
}

/// At most one row per grantee on `page`
pub fn assert_unique_grantees(store: &Store, page: &str) {
    let rows = rows(store, page);
    for (i, a) in rows.iter().enumerate() {
        assert!(
            rows[i + 1..].iter().all(|b| !b.grantee.matches(&a.grantee)),
            "duplicate grantee {} on {}",
            a.grantee,
            page
        );
    }
}
