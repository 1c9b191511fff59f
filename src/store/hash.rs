//! Bucket hashing
//!
//! A key's bucket is decided by its first character only, case-folded.
//! `a`-`z` map to 0..26 and `0`-`9` to 26..36. Any other leading character
//! (or an empty key) has no bucket.

/// Number of buckets in the table
pub const TABLE_SIZE: usize = 36;

const LETTERS: usize = 26;

/// Bucket index for `key`, or `None` when the key is not addressable
pub fn bucket_index(key: &str) -> Option<usize> {
    let first = key.bytes().next()?.to_ascii_lowercase();
    match first {
        b'a'..=b'z' => Some((first - b'a') as usize),
        b'0'..=b'9' => Some(LETTERS + (first - b'0') as usize),
        _ => None,
    }
}
