//! ordered lists: `lpush`, `rpush`, `lpop`, `rpop`, `lrange`.
//!
//! A list is a header item (`key::encode_list_header`) tracking the
//! `[head, tail)` index range in occupied use, plus one element item per
//! entry (`key::encode_list_element`). Every push/pop is a two-action
//! transaction — move the header boundary and create/delete the element —
//! so a reader never observes a boundary update without its element, or
//! vice versa.

use serde_json::{json, Value};

use crate::error::{CResult, Error};
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_list_element, encode_list_header, encode_list_partition};
use crate::store::{ItemStoreDriver, TransactAction};

struct Header {
    head: i64,
    tail: i64,
    exists: bool,
}

async fn read_header(store: &dyn ItemStoreDriver, name: &str) -> CResult<Header> {
    let pk = encode_list_partition(name)?;
    let sk = encode_list_header(name)?;
    Ok(match store.get_item(&pk, &sk).await? {
        Some(item) => Header {
            head: item.meta_i64("head").unwrap_or(0),
            tail: item.meta_i64("tail").unwrap_or(0),
            exists: true,
        },
        None => Header { head: 0, tail: 0, exists: false },
    })
}

fn header_item(name: &str, head: i64, tail: i64, now: i64) -> CResult<Item> {
    let pk = encode_list_partition(name)?;
    let sk = encode_list_header(name)?;
    let mut item = Item::new(pk, sk, ItemType::List, Value::Null, now);
    item.metadata.insert("head".to_string(), json!(head));
    item.metadata.insert("tail".to_string(), json!(tail));
    Ok(item)
}

fn header_condition(header: &Header) -> Condition {
    if header.exists {
        Condition::And(
            Box::new(Condition::MetadataEquals { field: "head".to_string(), expected: json!(header.head) }),
            Box::new(Condition::MetadataEquals { field: "tail".to_string(), expected: json!(header.tail) }),
        )
    } else {
        Condition::NotExists
    }
}

const MAX_RACE_RETRIES: u32 = 5;

/// Prepends `value`, retrying the whole read-modify-write on a lost race
/// against another pusher/popper (bounded, since list contention is
/// expected to be low).
pub async fn lpush(store: &dyn ItemStoreDriver, name: &str, value: Value) -> CResult<i64> {
    push(store, name, value, true).await
}

pub async fn rpush(store: &dyn ItemStoreDriver, name: &str, value: Value) -> CResult<i64> {
    push(store, name, value, false).await
}

async fn push(store: &dyn ItemStoreDriver, name: &str, value: Value, prepend: bool) -> CResult<i64> {
    for _ in 0..MAX_RACE_RETRIES {
        let header = read_header(store, name).await?;
        let now = now_seconds();
        let (index, new_head, new_tail) =
            if prepend { (header.head - 1, header.head - 1, header.tail) } else { (header.tail, header.head, header.tail + 1) };

        let element_sk = encode_list_element(name, index)?;
        let pk = encode_list_partition(name)?;
        let element = Item::new(pk, element_sk, ItemType::List, value.clone(), now);

        let actions = vec![
            TransactAction::Put {
                item: header_item(name, new_head, new_tail, now)?,
                condition: Some(header_condition(&header)),
            },
            TransactAction::Put { item: element, condition: Some(Condition::NotExists) },
        ];
        match store.transact_write(actions).await {
            Ok(()) => return Ok(index),
            Err(Error::ConditionFailed(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(Error::ConditionFailed(format!("list {name} push lost the race {MAX_RACE_RETRIES} times in a row")))
}

pub async fn lpop(store: &dyn ItemStoreDriver, name: &str) -> CResult<Option<Value>> {
    pop(store, name, true).await
}

pub async fn rpop(store: &dyn ItemStoreDriver, name: &str) -> CResult<Option<Value>> {
    pop(store, name, false).await
}

async fn pop(store: &dyn ItemStoreDriver, name: &str, from_head: bool) -> CResult<Option<Value>> {
    for _ in 0..MAX_RACE_RETRIES {
        let header = read_header(store, name).await?;
        if header.head >= header.tail {
            return Ok(None);
        }
        let now = now_seconds();
        let index = if from_head { header.head } else { header.tail - 1 };
        let (new_head, new_tail) =
            if from_head { (header.head + 1, header.tail) } else { (header.head, header.tail - 1) };

        let pk = encode_list_partition(name)?;
        let element_sk = encode_list_element(name, index)?;
        let existing = match store.get_item(&pk, &element_sk).await? {
            Some(item) => item,
            None => return Ok(None),
        };

        let actions = vec![
            TransactAction::Put {
                item: header_item(name, new_head, new_tail, now)?,
                condition: Some(header_condition(&header)),
            },
            TransactAction::Delete { partition_key: pk, sort_key: element_sk, condition: Some(Condition::Exists) },
        ];
        match store.transact_write(actions).await {
            Ok(()) => return Ok(Some(existing.value)),
            Err(Error::ConditionFailed(_)) => continue,
            Err(err) => return Err(err),
        }
    }
    Err(Error::ConditionFailed(format!("list {name} pop lost the race {MAX_RACE_RETRIES} times in a row")))
}

/// Returns elements with logical index in `[start, stop)`, in order.
pub async fn lrange(store: &dyn ItemStoreDriver, name: &str, start: i64, stop: i64) -> CResult<Vec<Value>> {
    let pk = encode_list_partition(name)?;
    let items = store.query(&pk, Some(&format!("list:{name}#")), None, true).await?;
    let mut out = Vec::new();
    for item in items {
        let encoded = item
            .sort_key
            .rsplit('#')
            .next()
            .ok_or_else(|| Error::Internal("malformed list element sort key".to_string()))?;
        let index = crate::key::decode_list_index(encoded)?;
        if index >= start && index < stop {
            out.push(item.value);
        }
    }
    Ok(out)
}

pub async fn llen(store: &dyn ItemStoreDriver, name: &str) -> CResult<i64> {
    let header = read_header(store, name).await?;
    Ok(header.tail - header.head)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::store::memory::MemoryItemStore;

    #[tokio::test]
    async fn lpush_then_lpop_is_fifo_from_the_front() {
        let store = MemoryItemStore::new();
        rpush(&store, "queue", json!("a")).await.unwrap();
        rpush(&store, "queue", json!("b")).await.unwrap();
        assert_eq!(lpop(&store, "queue").await.unwrap(), Some(json!("a")));
        assert_eq!(lpop(&store, "queue").await.unwrap(), Some(json!("b")));
        assert_eq!(lpop(&store, "queue").await.unwrap(), None);
    }

    #[tokio::test]
    async fn lpush_prepends_in_reverse_call_order() {
        let store = MemoryItemStore::new();
        lpush(&store, "stack", json!(1)).await.unwrap();
        lpush(&store, "stack", json!(2)).await.unwrap();
        let all = lrange(&store, "stack", i64::MIN, i64::MAX).await.unwrap();
        assert_eq!(all, vec![json!(2), json!(1)]);
    }

    #[tokio::test]
    async fn llen_reflects_pushes_and_pops() {
        let store = MemoryItemStore::new();
        rpush(&store, "l", json!(1)).await.unwrap();
        rpush(&store, "l", json!(2)).await.unwrap();
        assert_eq!(llen(&store, "l").await.unwrap(), 2);
        lpop(&store, "l").await.unwrap();
        assert_eq!(llen(&store, "l").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn lrange_respects_bounds() {
        let store = MemoryItemStore::new();
        for v in 0..5 {
            rpush(&store, "l", json!(v)).await.unwrap();
        }
        let slice = lrange(&store, "l", 1, 3).await.unwrap();
        assert_eq!(slice, vec![json!(1), json!(2)]);
    }
}
