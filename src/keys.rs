//! Length-prefixed key encoding for LMDB storage.
//!
//! Index keys are encoded as: [len1][bytes1][len2][bytes2]
//! - No delimiters, no escaping, any bytes allowed in ids
//! - A one-part prefix selects exactly the keys of that owner, since the
//!   length byte keeps "page-1" from matching "page-10"

use crate::constants::MAX_KEY_PART;
use crate::error::{PermError, Result};

/// Reject ids that cannot be stored as a key part
#[inline]
pub fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id.len() > MAX_KEY_PART {
        return Err(PermError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Build a length-prefixed key from parts
#[inline]
pub fn build_key(parts: &[&str]) -> Vec<u8> {
    let total_len: usize = parts.iter().map(|p| 1 + p.len()).sum();
    let mut key = Vec::with_capacity(total_len);
    for part in parts {
        debug_assert!(part.len() <= MAX_KEY_PART);
        key.push(part.len() as u8);
        key.extend_from_slice(part.as_bytes());
    }
    key
}

/// Two-part index key: owner then member
#[inline]
pub fn pair_key(owner: &str, member: &str) -> Vec<u8> {
    build_key(&[owner, member])
}

/// Prefix selecting every pair key of `owner`
#[inline]
pub fn owner_prefix(owner: &str) -> Vec<u8> {
    build_key(&[owner])
}

/// Get the Nth part from a key without allocating
#[inline]
pub fn get_part(bytes: &[u8], n: usize) -> Option<&str> {
    let mut i = 0;
    let mut count = 0;
    while i < bytes.len() {
        let len = bytes[i] as usize;
        if i + 1 + len > bytes.len() {
            return None;
        }
        if count == n {
            return std::str::from_utf8(&bytes[i + 1..i + 1 + len]).ok();
        }
        i += 1 + len;
        count += 1;
    }
    None
}

/// Parse a pair key into (owner, member)
#[inline]
pub fn parse_pair(bytes: &[u8]) -> Option<(&str, &str)> {
    Some((get_part(bytes, 0)?, get_part(bytes, 1)?))
}
