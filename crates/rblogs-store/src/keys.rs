//! Byte-sortable key encodings for the secondary index trees.
//!
//! Every compound key is `<prefix>\0<suffix>` so that a plain lexicographic
//! `sled` range scan gives the ordering the spec calls for: sequence
//! numbers are encoded big-endian so their byte order matches their
//! numeric order, and `\0` never appears inside a `space_id`/`type`/
//! `timestamp`/`id` in practice, but we don't rely on that — the suffix
//! only needs to sort correctly *within* a fixed prefix, and sled already
//! scopes scans to the prefix's range.

/// `space_id` followed by the big-endian bytes of `sequence_number`.
pub fn space_seq_key(space_id: &str, sequence_number: u64) -> Vec<u8> {
    let mut key = space_id.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(&sequence_number.to_be_bytes());
    key
}

/// The lower edge of every key for `space_id`, inclusive.
pub fn space_prefix(space_id: &str) -> Vec<u8> {
    let mut key = space_id.as_bytes().to_vec();
    key.push(0);
    key
}

/// The first key past every key sharing `prefix` — an exclusive upper
/// bound for a prefix range scan. `None` if `prefix` is all `0xFF` (would
/// overflow; not reachable with our key shapes in practice).
pub fn prefix_upper_bound(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    for i in (0..end.len()).rev() {
        if end[i] != 0xFF {
            end[i] += 1;
            end.truncate(i + 1);
            return Some(end);
        }
    }
    None
}

/// `event_type` wire name followed by `id`, for the type secondary index.
pub fn type_key(event_type: &str, id: &str) -> Vec<u8> {
    let mut key = event_type.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(id.as_bytes());
    key
}

/// `timestamp` followed by `id`, for the timestamp secondary index.
pub fn time_key(timestamp: &str, id: &str) -> Vec<u8> {
    let mut key = timestamp.as_bytes().to_vec();
    key.push(0);
    key.extend_from_slice(id.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_seq_keys_sort_numerically() {
        let a = space_seq_key("s", 2);
        let b = space_seq_key("s", 10);
        assert!(a < b, "byte order of BE-encoded seq must match numeric order");
    }

    #[test]
    fn prefix_upper_bound_excludes_all_prefixed_keys() {
        let prefix = space_prefix("s");
        let end = prefix_upper_bound(&prefix).unwrap();
        let some_key = space_seq_key("s", u64::MAX);
        assert!(some_key < end, "the widest key under the prefix must stay below the bound");
        assert!(prefix < end);
    }
}
