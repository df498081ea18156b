//! Pageperm - page permission inheritance for hierarchical documents
//!
//! Pages form per-space trees. Each page carries at most one permission row
//! per grantee, either local or inherited from a local row on an ancestor.
//! The modules here keep those rows consistent as pages are created, moved,
//! and granted new permissions:
//!
//! - [`compare`]: level comparison and grantee matching
//! - [`replace`]: repair of inherited rows whose source is no longer legal
//! - [`reposition`]: re-inheritance after a page changes parent
//! - [`propagate`]: push a page's permissions down to uncustomized descendants
//! - [`pages`] and [`grants`]: the lifecycle operations built on top
//!
//! All state lives in an LMDB environment ([`Store`]); every operation has a
//! `*_in` form that runs inside a caller-owned transaction.

pub mod compare;
pub mod config;
pub mod constants;
pub mod db;
pub mod error;
pub mod grants;
pub mod keys;
pub mod pages;
pub mod propagate;
pub mod replace;
pub mod reposition;
pub mod tree;
pub mod tx;
pub mod types;

pub use compare::{
    compare_permission_levels, find_existing_permission_for_group, has_same_or_more_permissions, LevelComparison,
};
pub use config::Config;
pub use db::Store;
pub use error::{PermError, Result};
pub use grants::{
    compute_page_permissions, delete_permission, inherit_permission, upsert_permission, Requester,
};
pub use pages::{create_page, handle_page_created, move_page, NewPage};
pub use propagate::handle_page_permission_added;
pub use replace::replace_illegal_permissions;
pub use reposition::handle_page_repositioned;
pub use tree::{PageNode, PageTree};
pub use tx::{PermissionRead, PermissionTx, ReadTx, Tx};
pub use types::{
    Grantee, GranteeGroup, OpSet, Page, PageWithPermissions, Permission, PermissionAssignment, PermissionLevel,
};
