//! leader election: `elect`, `heartbeat`, `check`, `resign`.
//!
//! Structurally identical to [`crate::primitives::lock`] (conditional put
//! on `NotExistsOrExpired`, fencing-token-gated writes) but named for its
//! own use case and exposing a `term` (the fencing token renamed for
//! readability at the call site) plus a heartbeat operation callers are
//! expected to run on an interval well inside the TTL.

use serde_json::json;

use crate::error::CResult;
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_singleton, Namespace};
use crate::store::{ItemStoreDriver, Mutation, ReturnValues};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderHandle {
    pub group: String,
    pub node_id: String,
    pub term: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderInfo {
    pub node_id: String,
    pub term: i64,
    pub expires_at: i64,
}

/// Attempts to become leader of `group`. Fails with `ConditionFailed` if
/// another node currently holds an unexpired term.
pub async fn elect(store: &dyn ItemStoreDriver, group: &str, node_id: &str, ttl_seconds: i64) -> CResult<LeaderHandle> {
    let pk = encode_singleton(Namespace::Leader, group)?;
    let now = now_seconds();
    let existing = store.get_item(&pk, &pk).await?;
    let next_term = existing.as_ref().and_then(|i| i.meta_i64("term")).unwrap_or(0) + 1;
    let expires_at = now + ttl_seconds;

    let mut item = Item::new(pk.clone(), pk.clone(), ItemType::Leader, json!(next_term), now).with_ttl(Some(expires_at));
    item.metadata.insert("node_id".to_string(), json!(node_id));
    item.metadata.insert("term".to_string(), json!(next_term));

    store.put_item(item, Some(Condition::NotExistsOrExpired { now })).await?;
    Ok(LeaderHandle { group: group.to_string(), node_id: node_id.to_string(), term: next_term, expires_at })
}

/// Renews the term's TTL. Callers must heartbeat well inside `ttl_seconds`
/// to avoid a false failover under transient network delay.
pub async fn heartbeat(store: &dyn ItemStoreDriver, group: &str, term: i64, ttl_seconds: i64) -> CResult<i64> {
    let pk = encode_singleton(Namespace::Leader, group)?;
    let expires_at = now_seconds() + ttl_seconds;
    store
        .update_item(
            &pk,
            &pk,
            Mutation::Set { field: "ttl".to_string(), value: json!(expires_at) },
            Some(Condition::MetadataEquals { field: "term".to_string(), expected: json!(term) }),
            ReturnValues::None,
        )
        .await?;
    Ok(expires_at)
}

/// Steps down voluntarily, only if `term` is still current.
pub async fn resign(store: &dyn ItemStoreDriver, group: &str, term: i64) -> CResult<()> {
    let pk = encode_singleton(Namespace::Leader, group)?;
    store
        .delete_item(&pk, &pk, Some(Condition::MetadataEquals { field: "term".to_string(), expected: json!(term) }))
        .await
}

pub async fn check(store: &dyn ItemStoreDriver, group: &str) -> CResult<Option<LeaderInfo>> {
    let pk = encode_singleton(Namespace::Leader, group)?;
    Ok(store.get_item(&pk, &pk).await?.map(|item| LeaderInfo {
        node_id: item.meta_str("node_id").unwrap_or_default(),
        term: item.value.as_i64().unwrap_or(0),
        expires_at: item.ttl.unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn second_election_fails_while_term_is_live() {
        let store = MemoryItemStore::new();
        elect(&store, "shard-0", "node-a", 30).await.unwrap();
        let err = elect(&store, "shard-0", "node-b", 30).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn heartbeat_with_stale_term_fails() {
        let store = MemoryItemStore::new();
        let handle = elect(&store, "shard-0", "node-a", 30).await.unwrap();
        resign(&store, "shard-0", handle.term).await.unwrap();
        elect(&store, "shard-0", "node-b", 30).await.unwrap();
        let err = heartbeat(&store, "shard-0", handle.term, 30).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn expired_term_allows_new_leader() {
        let store = MemoryItemStore::with_clock(|| 0);
        elect(&store, "shard-0", "node-a", -1).await.unwrap();
        let handle = elect(&store, "shard-0", "node-b", 30).await.unwrap();
        assert_eq!(handle.node_id, "node-b");
    }
}
