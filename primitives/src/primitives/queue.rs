//! priority/FIFO queue: `push`, `pop`, `peek`, `size`, `ack`.
//!
//! Ordering is encoded entirely in the sort key
//! (`key::encode_queue_item`): priority, then enqueue timestamp, then a
//! uuid tiebreaker, so `query(ascending = true)` already returns
//! candidates in pop order. Visibility timeouts are a
//! conditional-update race rather than a separate lock: `pop` claims a
//! message by swapping its `visible_at` forward, conditioned on the
//! `visible_at` it just read still being current, and retries against
//! the next candidate on a lost race.

use serde_json::{json, Value};
use uuid::Uuid;

use crate::error::{CResult, Error};
use crate::item::{now_micros, now_seconds, Condition, Item, ItemType};
use crate::key::{encode_queue_dedup, encode_queue_item, encode_queue_partition};
use crate::store::{ItemStoreDriver, Mutation, ReturnValues, TransactAction};

pub struct Message {
    pub id: String,
    pub payload: Value,
    pub receipt: String,
}

/// Pushes `payload` onto the queue. If `dedup_id` is given and a message
/// with the same id was pushed within the dedup window, this is a
/// silent no-op rather than a duplicate enqueue.
pub async fn push(
    store: &dyn ItemStoreDriver,
    name: &str,
    payload: Value,
    priority: u32,
    dedup_id: Option<&str>,
) -> CResult<Option<String>> {
    let now = now_seconds();
    let id = Uuid::new_v4();
    let sk = encode_queue_item(name, priority, now_micros(), &id)?;
    let pk = encode_queue_partition(name)?;

    let mut item = Item::new(pk, sk.clone(), ItemType::Queue, payload, now);
    item.metadata.insert("visible_at".to_string(), json!(now));
    item.metadata.insert("priority".to_string(), json!(priority));

    match dedup_id {
        None => {
            store.put_item(item, None).await?;
        }
        Some(dedup_id) => {
            let dedup_pk = encode_queue_dedup(name, dedup_id)?;
            let dedup_item = Item::new(dedup_pk.clone(), dedup_pk, ItemType::Queue, json!(dedup_id), now)
                .with_ttl(Some(now + crate::config::DEFAULT_DEDUP_WINDOW_SECONDS));
            let actions = vec![
                TransactAction::Put { item: dedup_item, condition: Some(Condition::NotExistsOrExpired { now }) },
                TransactAction::Put { item, condition: None },
            ];
            if let Err(Error::ConditionFailed(_)) = store.transact_write(actions).await {
                return Ok(None);
            }
        }
    }
    Ok(Some(sk))
}

/// Claims the highest-priority, earliest visible message and makes it
/// invisible to other consumers for `visibility_seconds`.
pub async fn pop(store: &dyn ItemStoreDriver, name: &str, visibility_seconds: i64) -> CResult<Option<Message>> {
    let pk = encode_queue_partition(name)?;
    let now = now_seconds();
    let candidates = store.query(&pk, None, Some(50), true).await?;

    for candidate in candidates {
        let visible_at = candidate.meta_i64("visible_at").unwrap_or(0);
        if visible_at > now {
            continue;
        }
        let receipt = Uuid::new_v4().to_string();
        let result = store
            .update_item(
                &pk,
                &candidate.sort_key,
                Mutation::SetMany(vec![
                    ("visible_at".to_string(), json!(now + visibility_seconds)),
                    ("receipt".to_string(), json!(receipt)),
                ]),
                Some(Condition::MetadataEquals { field: "visible_at".to_string(), expected: json!(visible_at) }),
                ReturnValues::AllNew,
            )
            .await;
        match result {
            Ok(Some(updated)) => {
                return Ok(Some(Message { id: updated.sort_key.clone(), payload: updated.value, receipt }));
            }
            Ok(None) => continue,
            Err(Error::ConditionFailed(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(None)
}

/// Reads the next eligible message without claiming it.
pub async fn peek(store: &dyn ItemStoreDriver, name: &str) -> CResult<Option<Value>> {
    let pk = encode_queue_partition(name)?;
    let now = now_seconds();
    let candidates = store.query(&pk, None, Some(50), true).await?;
    Ok(candidates.into_iter().find(|c| c.meta_i64("visible_at").unwrap_or(0) <= now).map(|c| c.value))
}

/// Total message count in the queue, visible or not.
pub async fn size(store: &dyn ItemStoreDriver, name: &str) -> CResult<usize> {
    let pk = encode_queue_partition(name)?;
    Ok(store.query(&pk, None, None, true).await?.len())
}

/// Deletes a claimed message, conditioned on the receipt matching the one
/// handed back by `pop` (prevents a consumer acking a message whose
/// visibility has since lapsed and been re-claimed by another worker).
pub async fn ack(store: &dyn ItemStoreDriver, name: &str, message_id: &str, receipt: &str) -> CResult<()> {
    let pk = encode_queue_partition(name)?;
    store
        .delete_item(
            &pk,
            message_id,
            Some(Condition::MetadataEquals { field: "receipt".to_string(), expected: json!(receipt) }),
        )
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn push_then_pop_roundtrips_payload() {
        let store = MemoryItemStore::new();
        push(&store, "jobs", json!({"task": "send-email"}), 5, None).await.unwrap();
        let msg = pop(&store, "jobs", 30).await.unwrap().unwrap();
        assert_eq!(msg.payload, json!({"task": "send-email"}));
    }

    #[tokio::test]
    async fn pop_claims_message_invisibly_until_ack_or_timeout() {
        let store = MemoryItemStore::new();
        push(&store, "jobs", json!(1), 5, None).await.unwrap();
        pop(&store, "jobs", 30).await.unwrap().unwrap();
        assert!(pop(&store, "jobs", 30).await.unwrap().is_none(), "claimed message must stay invisible");
    }

    #[tokio::test]
    async fn ack_removes_the_message() {
        let store = MemoryItemStore::new();
        push(&store, "jobs", json!(1), 5, None).await.unwrap();
        let msg = pop(&store, "jobs", 30).await.unwrap().unwrap();
        ack(&store, "jobs", &msg.id, &msg.receipt).await.unwrap();
        assert_eq!(size(&store, "jobs").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn higher_priority_pops_first() {
        let store = MemoryItemStore::new();
        push(&store, "jobs", json!("low"), 9, None).await.unwrap();
        push(&store, "jobs", json!("high"), 1, None).await.unwrap();
        let msg = pop(&store, "jobs", 30).await.unwrap().unwrap();
        assert_eq!(msg.payload, json!("high"));
    }

    #[tokio::test]
    async fn duplicate_dedup_id_is_a_silent_noop() {
        let store = MemoryItemStore::new();
        let first = push(&store, "jobs", json!(1), 5, Some("order-42")).await.unwrap();
        assert!(first.is_some());
        let second = push(&store, "jobs", json!(1), 5, Some("order-42")).await.unwrap();
        assert!(second.is_none());
        assert_eq!(size(&store, "jobs").await.unwrap(), 1);
    }
}
