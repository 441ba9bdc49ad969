//! Structural hashing used for layout and set content cache keys.
//!
//! [`DefaultHasher::new`] always starts from the same keys, so equal input yields equal hashes for the
//! lifetime of the process. Nothing here is persisted, so that is all the stability we need.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Hash any hashable value into a 64-bit key.
pub(crate) fn hash_of<T: Hash + ?Sized>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Hash an ordered sequence of content identifiers.
pub(crate) fn hash_ids(ids: &[u64]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for id in ids {
        hasher.write_u64(*id);
    }
    hasher.finish()
}

/// Fold two identifiers into one.
pub(crate) fn combine(a: u64, b: u64) -> u64 {
    hash_ids(&[a, b])
}
