//! distributed locks with fencing tokens and TTL-based failover.
//!
//! A lock item's `value` holds the current fencing token (a strictly
//! increasing integer) and `metadata.holder` holds the owning
//! process's opaque id. Acquisition uses `NotExistsOrExpired` so a
//! crashed holder's lock is reclaimable once its TTL lapses, without a
//! separate reaper process.

use std::time::Duration;

use serde_json::json;

use crate::error::{CResult, Error};
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_singleton, Namespace};
use crate::retry::BackoffPolicy;
use crate::store::{ItemStoreDriver, Mutation, ReturnValues};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockHandle {
    pub name: String,
    pub holder: String,
    pub fencing_token: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockInfo {
    pub holder: String,
    pub fencing_token: i64,
    pub expires_at: i64,
}

/// Attempts to acquire the lock once, without waiting.
pub async fn try_acquire(store: &dyn ItemStoreDriver, name: &str, holder: &str, ttl_seconds: i64) -> CResult<LockHandle> {
    let pk = encode_singleton(Namespace::Lock, name)?;
    let now = now_seconds();
    let existing = store.get_item(&pk, &pk).await?;
    let next_token = existing.as_ref().and_then(|i| i.meta_i64("fencing_token")).unwrap_or(0) + 1;
    let expires_at = now + ttl_seconds;

    let mut item = Item::new(pk.clone(), pk.clone(), ItemType::Lock, json!(next_token), now).with_ttl(Some(expires_at));
    item.metadata.insert("holder".to_string(), json!(holder));
    item.metadata.insert("fencing_token".to_string(), json!(next_token));

    store.put_item(item, Some(Condition::NotExistsOrExpired { now })).await?;
    Ok(LockHandle { name: name.to_string(), holder: holder.to_string(), fencing_token: next_token, expires_at })
}

/// Acquires the lock, retrying with jittered backoff until it succeeds or
/// `wait` elapses.
pub async fn acquire(
    store: &dyn ItemStoreDriver,
    name: &str,
    holder: &str,
    ttl_seconds: i64,
    wait: Option<Duration>,
) -> CResult<LockHandle> {
    let policy = BackoffPolicy::lock_wait();
    let deadline = wait.map(|w| std::time::Instant::now() + w);
    let mut attempt = 0u32;
    loop {
        match try_acquire(store, name, holder, ttl_seconds).await {
            Ok(handle) => return Ok(handle),
            Err(Error::ConditionFailed(_)) => {
                if let Some(deadline) = deadline {
                    if std::time::Instant::now() >= deadline {
                        return Err(Error::ConditionFailed(format!("lock {name} not acquired within wait budget")));
                    }
                } else {
                    return Err(Error::ConditionFailed(format!("lock {name} is held")));
                }
                tokio::time::sleep(policy.delay(attempt)).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Releases the lock only if `fencing_token` still matches the live lock,
/// so a stale holder can't release a lock someone else has since
/// acquired.
pub async fn release(store: &dyn ItemStoreDriver, name: &str, fencing_token: i64) -> CResult<()> {
    let pk = encode_singleton(Namespace::Lock, name)?;
    store
        .delete_item(&pk, &pk, Some(Condition::MetadataEquals { field: "fencing_token".to_string(), expected: json!(fencing_token) }))
        .await
}

/// Extends the TTL of a held lock, conditioned on the caller's fencing
/// token still being current.
pub async fn extend(store: &dyn ItemStoreDriver, name: &str, fencing_token: i64, ttl_seconds: i64) -> CResult<i64> {
    let pk = encode_singleton(Namespace::Lock, name)?;
    let now = now_seconds();
    let expires_at = now + ttl_seconds;
    store
        .update_item(
            &pk,
            &pk,
            Mutation::Set { field: "ttl".to_string(), value: json!(expires_at) },
            Some(Condition::MetadataEquals { field: "fencing_token".to_string(), expected: json!(fencing_token) }),
            ReturnValues::None,
        )
        .await?;
    Ok(expires_at)
}

/// Reads current lock state without taking it. Returns `None` if free or
/// expired.
pub async fn check(store: &dyn ItemStoreDriver, name: &str) -> CResult<Option<LockInfo>> {
    let pk = encode_singleton(Namespace::Lock, name)?;
    Ok(store.get_item(&pk, &pk).await?.map(|item| LockInfo {
        holder: item.meta_str("holder").unwrap_or_default(),
        fencing_token: item.value.as_i64().unwrap_or(0),
        expires_at: item.ttl.unwrap_or(0),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn second_acquire_without_wait_fails() {
        let store = MemoryItemStore::new();
        try_acquire(&store, "job", "a", 30).await.unwrap();
        let err = try_acquire(&store, "job", "b", 30).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn fencing_token_increases_across_reacquisitions() {
        let store = MemoryItemStore::new();
        let first = try_acquire(&store, "job", "a", 30).await.unwrap();
        release(&store, "job", first.fencing_token).await.unwrap();
        let second = try_acquire(&store, "job", "b", 30).await.unwrap();
        assert_eq!(second.fencing_token, first.fencing_token + 1);
    }

    #[tokio::test]
    async fn release_with_stale_token_fails() {
        let store = MemoryItemStore::new();
        let first = try_acquire(&store, "job", "a", 30).await.unwrap();
        release(&store, "job", first.fencing_token).await.unwrap();
        try_acquire(&store, "job", "b", 30).await.unwrap();
        let err = release(&store, "job", first.fencing_token).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn expired_lock_is_reclaimable_without_release() {
        let store = MemoryItemStore::with_clock(|| 0);
        try_acquire(&store, "job", "a", -1).await.unwrap();
        let second = try_acquire(&store, "job", "b", 30).await.unwrap();
        assert_eq!(second.holder, "b");
    }
}
