//! Operation flag bits, level templates and limits

// Operation bits
pub const READ: u32 = 1;
pub const DELETE: u32 = 1 << 1;
pub const COMMENT: u32 = 1 << 2;
pub const EDIT_CONTENT: u32 = 1 << 3;
pub const EDIT_POSITION: u32 = 1 << 4;
pub const EDIT_PATH: u32 = 1 << 5;
pub const EDIT_LOCK: u32 = 1 << 6;
pub const EDIT_IS_PUBLIC: u32 = 1 << 7;
pub const GRANT_PERMISSIONS: u32 = 1 << 8;
pub const CREATE_POLL: u32 = 1 << 9;
pub const DELETE_ATTACHMENTS: u32 = 1 << 10;

pub const ALL_OPERATIONS: u32 = (1 << 11) - 1;

// Level templates
pub const FULL_ACCESS_OPS: u32 = ALL_OPERATIONS;
pub const EDITOR_OPS: u32 = READ
    | DELETE
    | COMMENT
    | EDIT_CONTENT
    | EDIT_POSITION
    | EDIT_PATH
    | CREATE_POLL
    | DELETE_ATTACHMENTS;
pub const PROPOSAL_EDITOR_OPS: u32 = READ | COMMENT | EDIT_CONTENT;
pub const VIEW_COMMENT_OPS: u32 = READ | COMMENT;
pub const VIEW_OPS: u32 = READ;

/// Longest key part in bytes (length prefix is a single byte)
pub const MAX_KEY_PART: usize = 255;

/// Default bound on ancestor walks and subtree recursion
pub const DEFAULT_MAX_TREE_DEPTH: usize = 256;

/// Default LMDB map size (1 GiB)
pub const DEFAULT_MAP_SIZE: usize = 1 << 30;

/// Named databases opened by the store
pub const DB_COUNT: u32 = 7;

// Operation name mappings
const OPERATIONS: &[(&str, u32)] = &[
    ("read", READ),
    ("delete", DELETE),
    ("comment", COMMENT),
    ("edit_content", EDIT_CONTENT),
    ("edit_position", EDIT_POSITION),
    ("edit_path", EDIT_PATH),
    ("edit_lock", EDIT_LOCK),
    ("edit_is_public", EDIT_IS_PUBLIC),
    ("grant_permissions", GRANT_PERMISSIONS),
    ("create_poll", CREATE_POLL),
    ("delete_attachments", DELETE_ATTACHMENTS),
];

/// Convert an operation mask to a list of operation names
pub fn ops_to_names(mask: u32) -> Vec<&'static str> {
    OPERATIONS
        .iter()
        .filter(|(_, b)| mask & b == *b)
        .map(|(n, _)| *n)
        .collect()
}

/// Convert a list of operation names to a mask, ignoring unknown names
pub fn names_to_ops(names: &[&str]) -> u32 {
    names
        .iter()
        .filter_map(|n| OPERATIONS.iter().find(|(k, _)| k == n).map(|(_, v)| v))
        .fold(0, |a, b| a | b)
}
