//! atomic counters: `inc`, `dec`, `get`.

use crate::error::CResult;
use crate::item::{now_seconds, Item, ItemType};
use crate::key::{encode_singleton, Namespace};
use crate::store::{ItemStoreDriver, Mutation, ReturnValues};

/// Atomically adds `by` (negative for decrement) and returns the new
/// total. Creates the counter at `by` if it did not exist.
pub async fn add(store: &dyn ItemStoreDriver, name: &str, by: i64) -> CResult<i64> {
    let pk = encode_singleton(Namespace::Counter, name)?;
    let updated = store
        .update_item(&pk, &pk, Mutation::Add { field: "value".to_string(), by }, None, ReturnValues::AllNew)
        .await?
        .expect("AllNew always returns the post-update item");
    Ok(updated.value.as_i64().unwrap_or(0))
}

pub async fn get(store: &dyn ItemStoreDriver, name: &str) -> CResult<i64> {
    let pk = encode_singleton(Namespace::Counter, name)?;
    Ok(store.get_item(&pk, &pk).await?.and_then(|item| item.value.as_i64()).unwrap_or(0))
}

/// Resets a counter to an explicit value, creating it if absent.
pub async fn set(store: &dyn ItemStoreDriver, name: &str, value: i64) -> CResult<()> {
    let pk = encode_singleton(Namespace::Counter, name)?;
    let now = now_seconds();
    store.put_item(Item::new(pk.clone(), pk, ItemType::Counter, serde_json::json!(value), now), None).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn inc_from_zero_creates_the_counter() {
        let store = MemoryItemStore::new();
        assert_eq!(add(&store, "hits", 5).await.unwrap(), 5);
        assert_eq!(add(&store, "hits", 3).await.unwrap(), 8);
    }

    #[tokio::test]
    async fn dec_is_just_a_negative_add() {
        let store = MemoryItemStore::new();
        add(&store, "hits", 10).await.unwrap();
        assert_eq!(add(&store, "hits", -4).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn get_of_untouched_counter_is_zero() {
        let store = MemoryItemStore::new();
        assert_eq!(get(&store, "untouched").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_increments_do_not_lose_updates() {
        use std::sync::Arc;
        let store = Arc::new(MemoryItemStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move { add(store.as_ref(), "shared", 1).await.unwrap() }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(get(&store, "shared").await.unwrap(), 20);
    }
}
