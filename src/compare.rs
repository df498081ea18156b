//! Permission comparison and grantee matching.
//!
//! Comparison is purely by operation-flag inclusion: two levels with the same
//! flags compare `Equal` whatever their names.

use crate::types::{OpSet, Permission, PermissionAssignment};

/// How a comparison flag set relates to a base flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LevelComparison {
    Equal,
    /// Comparison is a strict superset of base
    More,
    /// Comparison is a strict subset of base
    Less,
    /// Neither contains the other
    Different,
}

/// Compare two single operation sets
pub fn compare_permission_levels(base: OpSet, comparison: OpSet) -> LevelComparison {
    match (comparison.contains(base), base.contains(comparison)) {
        (true, true) => LevelComparison::Equal,
        (true, false) => LevelComparison::More,
        (false, true) => LevelComparison::Less,
        (false, false) => LevelComparison::Different,
    }
}

/// Find the permission in `permissions` addressed to the same grantee as
/// `target`. With `ignore_level` false the level must also match exactly.
pub fn find_existing_permission_for_group<'a>(
    target: &PermissionAssignment,
    permissions: &'a [Permission],
    ignore_level: bool,
) -> Option<&'a Permission> {
    permissions
        .iter()
        .find(|p| p.grantee.matches(&target.grantee) && (ignore_level || p.level == target.level))
}

/// True if `comparison` covers every grantee of `base` with the same or a
/// larger flag set. Grantees only present in `comparison` are not checked.
pub fn has_same_or_more_permissions(base: &[Permission], comparison: &[Permission]) -> bool {
    base.iter().all(|b| {
        match find_existing_permission_for_group(&b.assignment(), comparison, true) {
            Some(c) => matches!(
                compare_permission_levels(b.operations(), c.operations()),
                LevelComparison::Equal | LevelComparison::More
            ),
            None => false,
        }
    })
}

/// True if the two permissions grant the same flags to the same grantee
#[inline]
pub fn same_grant(a: &Permission, b: &Permission) -> bool {
    a.grantee.matches(&b.grantee) && a.operations() == b.operations()
}
