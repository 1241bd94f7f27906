//! key/value store: `set`, `get`, `delete`, `exists`, `list`.

use serde_json::Value;

use crate::error::{CResult, Error};
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_singleton, Namespace};
use crate::store::{ItemStoreDriver, ReturnValues};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Overwrite unconditionally.
    Upsert,
    /// Fail with `ConditionFailed` if the key already exists.
    IfNotExists,
    /// Fail with `ConditionFailed` if the key is absent.
    IfExists,
}

pub struct SetOptions {
    pub mode: WriteMode,
    pub ttl_seconds: Option<i64>,
}

impl Default for SetOptions {
    fn default() -> Self {
        Self { mode: WriteMode::Upsert, ttl_seconds: None }
    }
}

pub async fn set(store: &dyn ItemStoreDriver, name: &str, value: Value, opts: SetOptions) -> CResult<()> {
    let pk = encode_singleton(Namespace::Kv, name)?;
    let now = now_seconds();
    let mut item = Item::new(pk.clone(), pk, ItemType::Kv, value, now);
    if let Some(ttl) = opts.ttl_seconds {
        item = item.with_ttl(Some(now + ttl));
    }
    let condition = match opts.mode {
        WriteMode::Upsert => None,
        WriteMode::IfNotExists => Some(Condition::NotExists),
        WriteMode::IfExists => Some(Condition::Exists),
    };
    store.put_item(item, condition).await
}

/// Returns `None` when the key is absent or TTL-expired.
pub async fn get(store: &dyn ItemStoreDriver, name: &str) -> CResult<Option<Value>> {
    let pk = encode_singleton(Namespace::Kv, name)?;
    Ok(store.get_item(&pk, &pk).await?.map(|item| item.value))
}

pub async fn exists(store: &dyn ItemStoreDriver, name: &str) -> CResult<bool> {
    Ok(get(store, name).await?.is_some())
}

/// Deletes the key. No-op (not an error) when the key is already absent,
/// matching DynamoDB `DeleteItem` semantics absent a condition.
pub async fn delete(store: &dyn ItemStoreDriver, name: &str) -> CResult<()> {
    let pk = encode_singleton(Namespace::Kv, name)?;
    store.delete_item(&pk, &pk, None).await
}

/// Lists every live key, newest-updated first, via the `(type, updatedAt)`
/// index. `limit` is a page size cap, not a guarantee of completeness.
pub async fn list(store: &dyn ItemStoreDriver, limit: Option<usize>) -> CResult<Vec<(String, Value)>> {
    let items = store.query_by_type(ItemType::Kv, limit).await?;
    items
        .into_iter()
        .map(|item| {
            let name = item
                .partition_key
                .strip_prefix("kv:")
                .ok_or_else(|| Error::Internal("kv item with malformed partition key".to_string()))?
                .to_string();
            Ok((name, item.value))
        })
        .collect()
}

/// Touches (re-sets) a key's TTL without altering its value, using
/// `UpdateItem` rather than a read-then-write round trip.
pub async fn touch_ttl(store: &dyn ItemStoreDriver, name: &str, ttl_seconds: i64) -> CResult<()> {
    use crate::store::Mutation;
    let pk = encode_singleton(Namespace::Kv, name)?;
    let now = now_seconds();
    store
        .update_item(
            &pk,
            &pk,
            Mutation::Set { field: "ttl".to_string(), value: serde_json::json!(now + ttl_seconds) },
            Some(Condition::Exists),
            ReturnValues::None,
        )
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;
    use serde_json::json;

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let store = MemoryItemStore::new();
        set(&store, "greeting", json!("hello"), SetOptions::default()).await.unwrap();
        assert_eq!(get(&store, "greeting").await.unwrap(), Some(json!("hello")));
    }

    #[tokio::test]
    async fn if_not_exists_rejects_overwrite() {
        let store = MemoryItemStore::new();
        set(&store, "a", json!(1), SetOptions { mode: WriteMode::IfNotExists, ttl_seconds: None }).await.unwrap();
        let err = set(&store, "a", json!(2), SetOptions { mode: WriteMode::IfNotExists, ttl_seconds: None })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn delete_of_absent_key_is_not_an_error() {
        let store = MemoryItemStore::new();
        delete(&store, "never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn get_of_absent_key_is_none_not_error() {
        let store = MemoryItemStore::new();
        assert_eq!(get(&store, "missing").await.unwrap(), None);
    }
}
