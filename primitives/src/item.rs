//! The single item shape shared by every coordination primitive.
//!
//! The remote item store returns duck-typed attribute maps; this module is
//! the boundary where those are decoded into a strongly-typed `Item` and
//! never surface as untyped maps deeper into the system.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::key::Namespace;

/// Enumeration of the primitive kind an item belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Kv,
    Counter,
    Lock,
    Leader,
    Queue,
    Set,
    List,
}

impl From<Namespace> for ItemType {
    fn from(ns: Namespace) -> Self {
        match ns {
            Namespace::Kv => ItemType::Kv,
            Namespace::Counter => ItemType::Counter,
            Namespace::Lock => ItemType::Lock,
            Namespace::Leader => ItemType::Leader,
            Namespace::Queue => ItemType::Queue,
            Namespace::Set => ItemType::Set,
            Namespace::List => ItemType::List,
        }
    }
}

/// One row of the shared coordination table, fully decoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub partition_key: String,
    pub sort_key: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    /// Absolute Unix-seconds expiry. A read that observes an item whose
    /// ttl has passed must behave as if absent.
    pub ttl: Option<i64>,
    pub metadata: HashMap<String, Value>,
    pub created_at: i64,
    pub updated_at: i64,
    /// Optimistic-lock counter, present when CAS-by-version is in play.
    pub version: Option<i64>,
}

impl Item {
    pub fn new(partition_key: String, sort_key: String, item_type: ItemType, value: Value, now: i64) -> Self {
        Self {
            partition_key,
            sort_key,
            value,
            item_type,
            ttl: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
            version: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<i64>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_metadata(mut self, metadata: HashMap<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }

    pub fn meta_i64(&self, key: &str) -> Option<i64> {
        self.metadata.get(key).and_then(Value::as_i64)
    }

    /// True when `ttl` is set and has elapsed as of `now`.
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.ttl, Some(ttl) if ttl < now)
    }
}

/// A condition attached to a write, matching the item-store driver's
/// condition-expression vocabulary.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `attribute_not_exists(partitionKey)` — used for creation-only
    /// writes.
    NotExists,
    /// `attribute_exists(partitionKey)`.
    Exists,
    /// `value = :expected`.
    ValueEquals(Value),
    /// `metadata.<field> = :expected`.
    MetadataEquals { field: String, expected: Value },
    /// `version = :expected`.
    VersionEquals(i64),
    /// `attribute_not_exists(partitionKey) OR ttl < :now` — used by
    /// lock/leader acquisition to also succeed over an expired holder.
    NotExistsOrExpired { now: i64 },
    /// Logical AND of two conditions.
    And(Box<Condition>, Box<Condition>),
}

/// Current Unix time in whole seconds.
pub fn now_seconds() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Current Unix time in whole microseconds, used by queue ordering.
pub fn now_micros() -> u64 {
    chrono::Utc::now().timestamp_micros().max(0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_is_observed_strictly_in_the_past() {
        let item = Item::new("kv:a".into(), "kv:a".into(), ItemType::Kv, Value::Null, 100).with_ttl(Some(50));
        assert!(item.is_expired(100));
        let item2 = Item::new("kv:a".into(), "kv:a".into(), ItemType::Kv, Value::Null, 100).with_ttl(Some(150));
        assert!(!item2.is_expired(100));
    }
}
