//! the typed item-store driver contract and its backends.
//!
//! Mirrors the shape of `StorageBackend` in
//! `guyernest-rust-mcp-sdk/crates/pmcp-tasks/src/store/backend.rs`: a small
//! async trait with condition-aware writes, a query primitive and a
//! transactional write/read pair, so every coordination primitive built on
//! top of it (`primitives::primitives::*`) never has to talk to the cloud
//! SDK directly.

pub mod dynamo;
pub mod memory;

use async_trait::async_trait;

use crate::error::CResult;
use crate::item::{Condition, Item};

/// One action inside a [`ItemStoreDriver::transact_write`] call.
#[derive(Debug, Clone)]
pub enum TransactAction {
    Put { item: Item, condition: Option<Condition> },
    Update { partition_key: String, sort_key: String, mutation: Mutation, condition: Option<Condition> },
    Delete { partition_key: String, sort_key: String, condition: Option<Condition> },
    ConditionCheck { partition_key: String, sort_key: String, condition: Condition },
}

impl TransactAction {
    pub fn key(&self) -> (&str, &str) {
        match self {
            TransactAction::Put { item, .. } => (&item.partition_key, &item.sort_key),
            TransactAction::Update { partition_key, sort_key, .. }
            | TransactAction::Delete { partition_key, sort_key, .. }
            | TransactAction::ConditionCheck { partition_key, sort_key, .. } => (partition_key, sort_key),
        }
    }
}

/// An atomic mutation expression for `UpdateItem`/transactional updates.
#[derive(Debug, Clone)]
pub enum Mutation {
    /// Atomic numeric add, used by the counter primitive and list header
    /// index bumps.
    Add { field: String, by: i64 },
    /// Unconditional attribute set, used by lock extend / leader
    /// heartbeat / queue visibility-deadline updates.
    Set { field: String, value: serde_json::Value },
    /// Several field sets applied together.
    SetMany(Vec<(String, serde_json::Value)>),
}

/// Maximum actions permitted in one [`ItemStoreDriver::transact_write`]
/// call.
pub const MAX_TRANSACT_ACTIONS: usize = 100;
/// Maximum aggregate payload, in bytes, permitted in one transactional
/// write.
pub const MAX_TRANSACT_BYTES: usize = 4 * 1024 * 1024;

/// What a successful `UpdateItem`/`TransactWrite` is asked to hand back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnValues {
    None,
    AllNew,
    AllOld,
}

/// The typed surface over the remote item store.
#[async_trait]
pub trait ItemStoreDriver: Send + Sync {
    async fn put_item(&self, item: Item, condition: Option<Condition>) -> CResult<()>;

    /// Returns `Ok(None)` when the item is absent or TTL-expired,
    /// never a bare "not found" error — callers decide whether absence is
    /// an error.
    async fn get_item(&self, partition_key: &str, sort_key: &str) -> CResult<Option<Item>>;

    async fn update_item(
        &self,
        partition_key: &str,
        sort_key: &str,
        mutation: Mutation,
        condition: Option<Condition>,
        return_values: ReturnValues,
    ) -> CResult<Option<Item>>;

    async fn delete_item(&self, partition_key: &str, sort_key: &str, condition: Option<Condition>) -> CResult<()>;

    /// Queries a partition's sort-key range. `ascending = false` reverses
    /// iteration order (used for `list-versions`-style newest-first reads
    /// elsewhere, and for `rpop`).
    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        limit: Option<usize>,
        ascending: bool,
    ) -> CResult<Vec<Item>>;

    /// Cross-collection enumeration via the `(type, updatedAt desc)`
    /// secondary index.
    async fn query_by_type(&self, item_type: crate::item::ItemType, limit: Option<usize>) -> CResult<Vec<Item>>;

    async fn transact_write(&self, actions: Vec<TransactAction>) -> CResult<()>;

    async fn transact_get(&self, keys: Vec<(String, String)>) -> CResult<Vec<Option<Item>>>;
}

/// Validates the cardinality/size limits the driver must enforce locally
/// before ever contacting the service, and the "no two actions on
/// the same key" rule from the transaction engine.
pub fn validate_transact_batch(actions: &[TransactAction]) -> CResult<()> {
    use crate::error::Error;
    use std::collections::HashSet;

    if actions.is_empty() {
        return Err(Error::InvalidArgument("transaction batch must not be empty".to_string()));
    }
    if actions.len() > MAX_TRANSACT_ACTIONS {
        return Err(Error::InvalidArgument(format!(
            "transaction batch has {} actions, limit is {MAX_TRANSACT_ACTIONS}",
            actions.len()
        )));
    }

    let mut seen = HashSet::new();
    let mut aggregate_bytes = 0usize;
    for action in actions {
        if !seen.insert(action.key()) {
            return Err(Error::InvalidArgument(format!(
                "transaction batch has two actions targeting ({}, {})",
                action.key().0,
                action.key().1
            )));
        }
        if let TransactAction::Put { item, .. } = action {
            aggregate_bytes += serde_json::to_vec(&item.value).map(|b| b.len()).unwrap_or(0);
        }
    }
    if aggregate_bytes > MAX_TRANSACT_BYTES {
        return Err(Error::InvalidArgument(format!(
            "transaction batch aggregate payload is {aggregate_bytes} bytes, limit is {MAX_TRANSACT_BYTES}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::ItemType;
    use serde_json::json;

    fn put(pk: &str, sk: &str) -> TransactAction {
        TransactAction::Put {
            item: Item::new(pk.to_string(), sk.to_string(), ItemType::Kv, json!(1), 0),
            condition: None,
        }
    }

    #[test]
    fn rejects_duplicate_keys_in_one_batch() {
        let actions = vec![put("kv:a", "kv:a"), put("kv:a", "kv:a")];
        assert!(validate_transact_batch(&actions).is_err());
    }

    #[test]
    fn rejects_oversized_batches() {
        let actions: Vec<_> = (0..MAX_TRANSACT_ACTIONS + 1)
            .map(|i| put(&format!("kv:{i}"), &format!("kv:{i}")))
            .collect();
        assert!(validate_transact_batch(&actions).is_err());
    }

    #[test]
    fn accepts_a_well_formed_batch() {
        let actions = vec![put("kv:a", "kv:a"), put("kv:b", "kv:b")];
        assert!(validate_transact_batch(&actions).is_ok());
    }
}
