//! object metadata operations: `head`, `tag`, `untag`,
//! `list-versions`, `presign`, `select`.

use std::collections::HashMap;
use std::time::Duration;

use crate::blob::store::{ObjectMeta, ObjectStoreDriver, ObjectVersion};
use crate::error::CResult;

pub async fn head(store: &dyn ObjectStoreDriver, key: &str) -> CResult<Option<ObjectMeta>> {
    store.head_object(key).await
}

pub async fn tag(store: &dyn ObjectStoreDriver, key: &str, tags: HashMap<String, String>) -> CResult<()> {
    store.put_tags(key, tags).await
}

pub async fn untag(store: &dyn ObjectStoreDriver, key: &str) -> CResult<()> {
    store.delete_tags(key).await
}

pub async fn list_versions(store: &dyn ObjectStoreDriver, prefix: &str) -> CResult<Vec<ObjectVersion>> {
    store.list_object_versions(prefix).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresignMode {
    Get,
    Put,
}

pub async fn presign(store: &dyn ObjectStoreDriver, key: &str, mode: PresignMode, expires_in: Duration) -> CResult<String> {
    match mode {
        PresignMode::Get => store.presign_get(key, expires_in).await,
        PresignMode::Put => store.presign_put(key, expires_in).await,
    }
}

pub async fn select(store: &dyn ObjectStoreDriver, key: &str, sql_expression: &str) -> CResult<Vec<u8>> {
    store.select(key, sql_expression).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::memory::MemoryObjectStore;
    use bytes::Bytes;

    #[tokio::test]
    async fn tag_then_head_does_not_error() {
        let store = MemoryObjectStore::new();
        store.put_object("a.txt", Bytes::from_static(b"x"), None).await.unwrap();
        let mut tags = HashMap::new();
        tags.insert("project".to_string(), "primitives".to_string());
        tag(&store, "a.txt", tags).await.unwrap();
        assert!(head(&store, "a.txt").await.unwrap().is_some());
        untag(&store, "a.txt").await.unwrap();
    }

    #[tokio::test]
    async fn presign_returns_a_url() {
        let store = MemoryObjectStore::new();
        let url = presign(&store, "a.txt", PresignMode::Get, Duration::from_secs(60)).await.unwrap();
        assert!(url.contains("a.txt"));
    }
}
