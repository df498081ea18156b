//! Page and permission records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::{
    ops_to_names, EDITOR_OPS, FULL_ACCESS_OPS, PROPOSAL_EDITOR_OPS, VIEW_COMMENT_OPS, VIEW_OPS,
};

/// A set of operation flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OpSet(pub u32);

impl OpSet {
    pub const EMPTY: OpSet = OpSet(0);

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// True if every flag in `other` is also in `self`
    #[inline]
    pub fn contains(self, other: OpSet) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn union(self, other: OpSet) -> OpSet {
        OpSet(self.0 | other.0)
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn names(self) -> Vec<&'static str> {
        ops_to_names(self.0)
    }
}

impl fmt::Display for OpSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.names().join(", "))
    }
}

/// Named permission level, or an explicit custom flag set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "level", content = "operations", rename_all = "snake_case")]
pub enum PermissionLevel {
    FullAccess,
    Editor,
    ProposalEditor,
    ViewComment,
    View,
    Custom(OpSet),
}

impl PermissionLevel {
    /// Expand the level to its concrete operation flags
    pub fn operations(self) -> OpSet {
        match self {
            PermissionLevel::FullAccess => OpSet(FULL_ACCESS_OPS),
            PermissionLevel::Editor => OpSet(EDITOR_OPS),
            PermissionLevel::ProposalEditor => OpSet(PROPOSAL_EDITOR_OPS),
            PermissionLevel::ViewComment => OpSet(VIEW_COMMENT_OPS),
            PermissionLevel::View => OpSet(VIEW_OPS),
            PermissionLevel::Custom(ops) => ops,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PermissionLevel::FullAccess => "full_access",
            PermissionLevel::Editor => "editor",
            PermissionLevel::ProposalEditor => "proposal_editor",
            PermissionLevel::ViewComment => "view_comment",
            PermissionLevel::View => "view",
            PermissionLevel::Custom(_) => "custom",
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionLevel::Custom(ops) => write!(f, "custom{}", ops),
            other => f.write_str(other.name()),
        }
    }
}

/// The group a grantee belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GranteeGroup {
    User,
    Role,
    Space,
    Public,
}

/// Who a permission is assigned to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "group", content = "id", rename_all = "snake_case")]
pub enum Grantee {
    User(String),
    Role(String),
    Space(String),
    Public,
}

impl Grantee {
    pub fn group(&self) -> GranteeGroup {
        match self {
            Grantee::User(_) => GranteeGroup::User,
            Grantee::Role(_) => GranteeGroup::Role,
            Grantee::Space(_) => GranteeGroup::Space,
            Grantee::Public => GranteeGroup::Public,
        }
    }

    /// True if both address the same user, role, space, or the public
    pub fn matches(&self, other: &Grantee) -> bool {
        match (self, other) {
            (Grantee::User(a), Grantee::User(b)) => a == b,
            (Grantee::Role(a), Grantee::Role(b)) => a == b,
            (Grantee::Space(a), Grantee::Space(b)) => a == b,
            (Grantee::Public, Grantee::Public) => true,
            _ => false,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Grantee::User(id) | Grantee::Role(id) | Grantee::Space(id) => Some(id),
            Grantee::Public => None,
        }
    }
}

impl fmt::Display for Grantee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Grantee::User(id) => write!(f, "user:{}", id),
            Grantee::Role(id) => write!(f, "role:{}", id),
            Grantee::Space(id) => write!(f, "space:{}", id),
            Grantee::Public => f.write_str("public"),
        }
    }
}

/// A grantee paired with a level, not yet bound to a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionAssignment {
    pub grantee: Grantee,
    pub level: PermissionLevel,
}

impl PermissionAssignment {
    pub fn new(grantee: Grantee, level: PermissionLevel) -> Self {
        PermissionAssignment { grantee, level }
    }
}

/// A node in a per-space page forest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub space_id: String,
    pub parent_id: Option<String>,
    pub index: i32,
    #[serde(default)]
    pub created_by: Option<String>,
}

/// A capability set granted to one grantee on one page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: String,
    pub page_id: String,
    pub grantee: Grantee,
    pub level: PermissionLevel,
    /// Authoritative permission this row copies; `None` for local rows
    pub inherited_from: Option<String>,
}

impl Permission {
    #[inline]
    pub fn operations(&self) -> OpSet {
        self.level.operations()
    }

    #[inline]
    pub fn is_inherited(&self) -> bool {
        self.inherited_from.is_some()
    }

    /// Id a copy of this permission should point at
    #[inline]
    pub fn source_id(&self) -> &str {
        self.inherited_from.as_deref().unwrap_or(&self.id)
    }

    pub fn assignment(&self) -> PermissionAssignment {
        PermissionAssignment::new(self.grantee.clone(), self.level)
    }
}

/// A page together with its permission rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageWithPermissions {
    pub page: Page,
    pub permissions: Vec<Permission>,
}

impl PageWithPermissions {
    pub fn permission_for(&self, grantee: &Grantee) -> Option<&Permission> {
        self.permissions.iter().find(|p| p.grantee.matches(grantee))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{COMMENT, READ};

    #[test]
    fn level_serializes_as_tagged_union() {
        let json = serde_json::to_string(&PermissionLevel::FullAccess).unwrap();
        assert_eq!(json, r#"{"level":"full_access"}"#);
        let custom = PermissionLevel::Custom(OpSet(READ | COMMENT));
        let back: PermissionLevel =
            serde_json::from_str(&serde_json::to_string(&custom).unwrap()).unwrap();
        assert_eq!(back, custom);
    }

    #[test]
    fn custom_level_with_template_flags_is_distinct_but_equivalent() {
        let custom = PermissionLevel::Custom(OpSet(READ | COMMENT));
        assert_ne!(custom, PermissionLevel::ViewComment);
        assert_eq!(custom.operations(), PermissionLevel::ViewComment.operations());
    }

    #[test]
    fn source_id_falls_back_to_own_id() {
        let mut p = Permission {
            id: "perm-1".into(),
            page_id: "page".into(),
            grantee: Grantee::Public,
            level: PermissionLevel::View,
            inherited_from: None,
        };
        assert_eq!(p.source_id(), "perm-1");
        p.inherited_from = Some("perm-0".into());
        assert_eq!(p.source_id(), "perm-0");
    }

    #[test]
    fn grantee_matches_on_group_and_id() {
        assert!(Grantee::User("u1".into()).matches(&Grantee::User("u1".into())));
        assert!(!Grantee::User("u1".into()).matches(&Grantee::Role("u1".into())));
        assert!(!Grantee::Space("s1".into()).matches(&Grantee::Space("s2".into())));
        assert!(Grantee::Public.matches(&Grantee::Public));
    }

    #[test]
    fn display_forms() {
        assert_eq!(Grantee::Role("r1".into()).to_string(), "role:r1");
        assert_eq!(PermissionLevel::Custom(OpSet(READ)).to_string(), "custom[read]");
    }
}
