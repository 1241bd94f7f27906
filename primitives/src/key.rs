//! Deterministic mapping from logical (namespace, name[, member/index]) tuples
//! to partition-key / sort-key strings. Pure functions only — no
//! I/O, no clock reads beyond what callers pass in.

use crate::error::{CResult, Error};

/// The exhaustive set of reserved namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Namespace {
    Kv,
    Counter,
    Lock,
    Leader,
    Queue,
    Set,
    List,
}

impl Namespace {
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Kv => "kv",
            Namespace::Counter => "counter",
            Namespace::Lock => "lock",
            Namespace::Leader => "leader",
            Namespace::Queue => "queue",
            Namespace::Set => "set",
            Namespace::List => "list",
        }
    }
}

/// `list` sort keys encode a signed 20-digit zero-padded index, offset by
/// 10^19 so that "prepend" (negative logical index) sorts before "append"
/// (positive logical index) lexicographically.
pub const LIST_INDEX_OFFSET: i128 = 10_000_000_000_000_000_000;

/// Names must match `[A-Za-z0-9_./-]{1,200}`.
pub fn validate_name(name: &str) -> CResult<()> {
    if name.is_empty() || name.len() > 200 {
        return Err(Error::InvalidArgument(format!(
            "name must be 1-200 characters, got {} characters",
            name.len()
        )));
    }
    let ok = name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'/' | b'-'));
    if !ok {
        return Err(Error::InvalidArgument(format!(
            "name {name:?} must match [A-Za-z0-9_./-]{{1,200}}"
        )));
    }
    Ok(())
}

/// `f"{namespace}:{name}"` — the partition key for every primitive, and
/// also the sort key for singleton primitives (kv, counter, lock, leader).
pub fn encode_singleton(ns: Namespace, name: &str) -> CResult<String> {
    validate_name(name)?;
    Ok(format!("{}:{}", ns.as_str(), name))
}

/// `sk = f"set:{name}#{member}"`.
pub fn encode_set_member(name: &str, member: &str) -> CResult<String> {
    validate_name(name)?;
    if member.is_empty() {
        return Err(Error::InvalidArgument("set member must not be empty".to_string()));
    }
    Ok(format!("set:{name}#{member}"))
}

/// Partition key shared by all members of one named set.
pub fn encode_set_partition(name: &str) -> CResult<String> {
    encode_singleton(Namespace::Set, name)
}

/// Encodes a logical list index (may be negative) into the signed,
/// zero-padded 20-digit representation used in list element sort keys.
pub fn encode_list_index(index: i64) -> String {
    let biased = LIST_INDEX_OFFSET + index as i128;
    format!("{biased:020}")
}

/// Inverse of [`encode_list_index`].
pub fn decode_list_index(encoded: &str) -> CResult<i64> {
    let biased: i128 = encoded
        .parse()
        .map_err(|_| Error::Internal(format!("malformed list index {encoded:?}")))?;
    let index = biased - LIST_INDEX_OFFSET;
    i64::try_from(index).map_err(|_| Error::Internal(format!("list index {encoded:?} out of range")))
}

/// `sk = f"list:{name}#{encoded_index}"`.
pub fn encode_list_element(name: &str, index: i64) -> CResult<String> {
    validate_name(name)?;
    Ok(format!("list:{name}#{}", encode_list_index(index)))
}

/// Partition key shared by all elements of one named list.
pub fn encode_list_partition(name: &str) -> CResult<String> {
    encode_singleton(Namespace::List, name)
}

/// Header item sort key: `list:{name}:header`.
pub fn encode_list_header(name: &str) -> CResult<String> {
    validate_name(name)?;
    Ok(format!("list:{name}:header"))
}

/// `sk = f"queue:{name}#{priority:010d}#{timestampMicros}#{uuid}"`.
///
/// Ordering is strict by (priority asc, timestamp asc, uuid asc), so the
/// fields are laid out left-to-right in sort-key order.
pub fn encode_queue_item(name: &str, priority: u32, timestamp_micros: u64, id: &uuid::Uuid) -> CResult<String> {
    validate_name(name)?;
    Ok(format!("queue:{name}#{priority:010}#{timestamp_micros:020}#{id}"))
}

/// Partition key shared by all items of one named queue.
pub fn encode_queue_partition(name: &str) -> CResult<String> {
    encode_singleton(Namespace::Queue, name)
}

/// Companion dedup item key, independent of ordering: dedup is tracked
/// as a separate item rather than folded into the ordering key.
pub fn encode_queue_dedup(name: &str, dedup_id: &str) -> CResult<String> {
    validate_name(name)?;
    if dedup_id.is_empty() {
        return Err(Error::InvalidArgument("dedup id must not be empty".to_string()));
    }
    Ok(format!("queue:{name}#dedup#{dedup_id}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_names() {
        assert!(validate_name("").is_err());
        assert!(validate_name(&"a".repeat(201)).is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("ok_name-1.2/3").is_ok());
    }

    #[test]
    fn singleton_pk_equals_sk_by_construction() {
        let pk = encode_singleton(Namespace::Lock, "my-lock").unwrap();
        assert_eq!(pk, "lock:my-lock");
    }

    #[test]
    fn list_index_roundtrips_and_orders() {
        let neg = encode_list_index(-5);
        let zero = encode_list_index(0);
        let pos = encode_list_index(5);
        assert!(neg < zero);
        assert!(zero < pos);
        assert_eq!(decode_list_index(&neg).unwrap(), -5);
        assert_eq!(decode_list_index(&pos).unwrap(), 5);
    }

    #[test]
    fn queue_sort_key_orders_by_priority_then_time() {
        let id = uuid::Uuid::nil();
        let a = encode_queue_item("q", 5, 100, &id).unwrap();
        let b = encode_queue_item("q", 1, 200, &id).unwrap();
        assert!(b < a, "lower priority must sort first regardless of timestamp");
    }
}
