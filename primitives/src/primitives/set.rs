//! unordered sets: `sadd`, `srem`, `sismember`, `smembers`, `scard`.
//!
//! Each member is its own item under the set's partition key
//! (`key::encode_set_member`), so membership tests and additions never
//! contend with each other the way a single JSON-array item would.

use serde_json::json;

use crate::error::CResult;
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_set_member, encode_set_partition};
use crate::store::ItemStoreDriver;

/// Adds `member` to the set. Idempotent: adding an already-present member
/// is a no-op, not an error.
pub async fn sadd(store: &dyn ItemStoreDriver, name: &str, member: &str) -> CResult<()> {
    let pk = encode_set_partition(name)?;
    let sk = encode_set_member(name, member)?;
    let now = now_seconds();
    store.put_item(Item::new(pk, sk, ItemType::Set, json!(member), now), None).await
}

/// Removes `member`. No-op if absent.
pub async fn srem(store: &dyn ItemStoreDriver, name: &str, member: &str) -> CResult<()> {
    let pk = encode_set_partition(name)?;
    let sk = encode_set_member(name, member)?;
    store.delete_item(&pk, &sk, None).await
}

pub async fn sismember(store: &dyn ItemStoreDriver, name: &str, member: &str) -> CResult<bool> {
    let pk = encode_set_partition(name)?;
    let sk = encode_set_member(name, member)?;
    Ok(store.get_item(&pk, &sk).await?.is_some())
}

pub async fn smembers(store: &dyn ItemStoreDriver, name: &str) -> CResult<Vec<String>> {
    let pk = encode_set_partition(name)?;
    let items = store.query(&pk, Some(&format!("set:{name}#")), None, true).await?;
    Ok(items.into_iter().filter_map(|i| i.value.as_str().map(str::to_string)).collect())
}

pub async fn scard(store: &dyn ItemStoreDriver, name: &str) -> CResult<usize> {
    Ok(smembers(store, name).await?.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn sadd_is_idempotent() {
        let store = MemoryItemStore::new();
        sadd(&store, "tags", "rust").await.unwrap();
        sadd(&store, "tags", "rust").await.unwrap();
        assert_eq!(scard(&store, "tags").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn srem_then_sismember_is_false() {
        let store = MemoryItemStore::new();
        sadd(&store, "tags", "rust").await.unwrap();
        srem(&store, "tags", "rust").await.unwrap();
        assert!(!sismember(&store, "tags", "rust").await.unwrap());
    }

    #[tokio::test]
    async fn smembers_lists_every_member() {
        let store = MemoryItemStore::new();
        sadd(&store, "tags", "rust").await.unwrap();
        sadd(&store, "tags", "aws").await.unwrap();
        let mut members = smembers(&store, "tags").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["aws".to_string(), "rust".to_string()]);
    }
}
