//! A purely in-memory `ItemStoreDriver`: a single `BTreeMap` holding
//! everything, no persistence. Used by the primitive test suites so they
//! run hermetically without live cloud credentials.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{CResult, Error};
use crate::item::{Condition, Item, ItemType};
use crate::store::{ItemStoreDriver, Mutation, ReturnValues, TransactAction, validate_transact_batch};

/// Keyed by `(partition_key, sort_key)`, ordered so partition-scoped
/// queries can use a cheap prefix range scan.
pub struct MemoryItemStore {
    data: Mutex<BTreeMap<(String, String), Item>>,
    now: Box<dyn Fn() -> i64 + Send + Sync>,
}

impl MemoryItemStore {
    pub fn new() -> Self {
        Self { data: Mutex::new(BTreeMap::new()), now: Box::new(crate::item::now_seconds) }
    }

    /// Test-only constructor letting a test pin the clock so TTL-expiry
    /// edge cases are deterministic.
    pub fn with_clock(now: impl Fn() -> i64 + Send + Sync + 'static) -> Self {
        Self { data: Mutex::new(BTreeMap::new()), now: Box::new(now) }
    }

    fn visible(&self, item: &Item) -> bool {
        !item.is_expired((self.now)())
    }

    fn check_condition(&self, existing: Option<&Item>, condition: &Condition) -> CResult<()> {
        let now = (self.now)();
        match condition {
            Condition::NotExists => {
                if existing.is_some() {
                    return Err(Error::ConditionFailed("item already exists".to_string()));
                }
            }
            Condition::Exists => {
                if existing.is_none() {
                    return Err(Error::ConditionFailed("item does not exist".to_string()));
                }
            }
            Condition::ValueEquals(expected) => match existing {
                Some(item) if &item.value == expected => {}
                _ => return Err(Error::ConditionFailed("value did not match".to_string())),
            },
            Condition::MetadataEquals { field, expected } => match existing {
                Some(item) if item.metadata.get(field) == Some(expected) => {}
                _ => return Err(Error::ConditionFailed(format!("metadata.{field} did not match"))),
            },
            Condition::VersionEquals(expected) => match existing {
                Some(item) if item.version == Some(*expected) => {}
                _ => return Err(Error::ConditionFailed("version did not match".to_string())),
            },
            Condition::NotExistsOrExpired { now: condition_now } => {
                let stale = existing.map(|item| item.is_expired(*condition_now)).unwrap_or(true);
                if !stale {
                    return Err(Error::ConditionFailed("item exists and has not expired".to_string()));
                }
            }
            Condition::And(a, b) => {
                self.check_condition(existing, a)?;
                self.check_condition(existing, b)?;
            }
        }
        let _ = now;
        Ok(())
    }

    fn apply_mutation(&self, existing: Option<&Item>, key: (&str, &str), mutation: &Mutation) -> CResult<Item> {
        let now = (self.now)();
        let mut item = existing.cloned().unwrap_or_else(|| {
            Item::new(key.0.to_string(), key.1.to_string(), ItemType::Counter, serde_json::json!(0), now)
        });
        match mutation {
            Mutation::Add { field, by } => {
                if field == "value" {
                    let current = item.value.as_i64().unwrap_or(0);
                    item.value = serde_json::json!(current + by);
                } else {
                    let current = item.meta_i64(field).unwrap_or(0);
                    item.metadata.insert(field.clone(), serde_json::json!(current + by));
                }
            }
            Mutation::Set { field, value } => {
                set_field(&mut item, field, value.clone());
            }
            Mutation::SetMany(pairs) => {
                for (field, value) in pairs {
                    set_field(&mut item, field, value.clone());
                }
            }
        }
        item.updated_at = now;
        item.version = Some(item.version.unwrap_or(0) + 1);
        Ok(item)
    }
}

fn set_field(item: &mut Item, field: &str, value: serde_json::Value) {
    match field {
        "value" => item.value = value,
        "ttl" => item.ttl = value.as_i64(),
        other => {
            item.metadata.insert(other.to_string(), value);
        }
    }
}

impl Default for MemoryItemStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ItemStoreDriver for MemoryItemStore {
    async fn put_item(&self, item: Item, condition: Option<Condition>) -> CResult<()> {
        let mut data = self.data.lock().unwrap();
        let key = (item.partition_key.clone(), item.sort_key.clone());
        let existing = data.get(&key).filter(|i| self.visible(i));
        if let Some(condition) = &condition {
            self.check_condition(existing, condition)?;
        }
        data.insert(key, item);
        Ok(())
    }

    async fn get_item(&self, partition_key: &str, sort_key: &str) -> CResult<Option<Item>> {
        let data = self.data.lock().unwrap();
        Ok(data
            .get(&(partition_key.to_string(), sort_key.to_string()))
            .filter(|i| self.visible(i))
            .cloned())
    }

    async fn update_item(
        &self,
        partition_key: &str,
        sort_key: &str,
        mutation: Mutation,
        condition: Option<Condition>,
        return_values: ReturnValues,
    ) -> CResult<Option<Item>> {
        let mut data = self.data.lock().unwrap();
        let key = (partition_key.to_string(), sort_key.to_string());
        let existing = data.get(&key).filter(|i| self.visible(i)).cloned();
        if let Some(condition) = &condition {
            self.check_condition(existing.as_ref(), condition)?;
        }
        let old = existing.clone();
        let updated = self.apply_mutation(existing.as_ref(), (partition_key, sort_key), &mutation)?;
        data.insert(key, updated.clone());
        Ok(match return_values {
            ReturnValues::None => None,
            ReturnValues::AllNew => Some(updated),
            ReturnValues::AllOld => old,
        })
    }

    async fn delete_item(&self, partition_key: &str, sort_key: &str, condition: Option<Condition>) -> CResult<()> {
        let mut data = self.data.lock().unwrap();
        let key = (partition_key.to_string(), sort_key.to_string());
        let existing = data.get(&key).filter(|i| self.visible(i));
        if let Some(condition) = &condition {
            self.check_condition(existing, condition)?;
        }
        data.remove(&key);
        Ok(())
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        limit: Option<usize>,
        ascending: bool,
    ) -> CResult<Vec<Item>> {
        let data = self.data.lock().unwrap();
        let mut items: Vec<Item> = data
            .range((partition_key.to_string(), String::new())..=(partition_key.to_string(), "\u{10FFFF}".repeat(4)))
            .map(|(_, v)| v)
            .filter(|i| i.partition_key == partition_key)
            .filter(|i| self.visible(i))
            .filter(|i| sort_key_prefix.map(|p| i.sort_key.starts_with(p)).unwrap_or(true))
            .cloned()
            .collect();
        if !ascending {
            items.reverse();
        }
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn query_by_type(&self, item_type: ItemType, limit: Option<usize>) -> CResult<Vec<Item>> {
        let data = self.data.lock().unwrap();
        let mut items: Vec<Item> = data
            .values()
            .filter(|i| i.item_type == item_type)
            .filter(|i| self.visible(i))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        if let Some(limit) = limit {
            items.truncate(limit);
        }
        Ok(items)
    }

    async fn transact_write(&self, actions: Vec<TransactAction>) -> CResult<()> {
        validate_transact_batch(&actions)?;
        let mut data = self.data.lock().unwrap();

        // All-or-nothing: first validate every condition against the
        // current state, then apply. No item is mutated on any failure.
        for action in &actions {
            let (pk, sk) = action.key();
            let existing = data.get(&(pk.to_string(), sk.to_string())).filter(|i| self.visible(i));
            match action {
                TransactAction::Put { condition, .. }
                | TransactAction::Delete { condition, .. } => {
                    if let Some(condition) = condition {
                        self.check_condition(existing, condition)?;
                    }
                }
                TransactAction::Update { condition, .. } => {
                    if let Some(condition) = condition {
                        self.check_condition(existing, condition)?;
                    }
                }
                TransactAction::ConditionCheck { condition, .. } => {
                    self.check_condition(existing, condition)?;
                }
            }
        }

        for action in actions {
            match action {
                TransactAction::Put { item, .. } => {
                    data.insert((item.partition_key.clone(), item.sort_key.clone()), item);
                }
                TransactAction::Delete { partition_key, sort_key, .. } => {
                    data.remove(&(partition_key, sort_key));
                }
                TransactAction::Update { partition_key, sort_key, mutation, .. } => {
                    let existing = data.get(&(partition_key.clone(), sort_key.clone())).cloned();
                    let updated = self.apply_mutation(existing.as_ref(), (&partition_key, &sort_key), &mutation)?;
                    data.insert((partition_key, sort_key), updated);
                }
                TransactAction::ConditionCheck { .. } => {}
            }
        }
        Ok(())
    }

    async fn transact_get(&self, keys: Vec<(String, String)>) -> CResult<Vec<Option<Item>>> {
        let data = self.data.lock().unwrap();
        Ok(keys
            .into_iter()
            .map(|(pk, sk)| data.get(&(pk, sk)).filter(|i| self.visible(i)).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{encode_singleton, Namespace};
    use serde_json::json;

    fn kv_item(name: &str, value: i64) -> Item {
        let pk = encode_singleton(Namespace::Kv, name).unwrap();
        Item::new(pk.clone(), pk, ItemType::Kv, json!(value), 0)
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryItemStore::new();
        store.put_item(kv_item("a", 1), None).await.unwrap();
        let got = store.get_item("kv:a", "kv:a").await.unwrap().unwrap();
        assert_eq!(got.value, json!(1));
    }

    #[tokio::test]
    async fn not_exists_condition_enforces_singleton_uniqueness() {
        let store = MemoryItemStore::new();
        store.put_item(kv_item("a", 1), Some(Condition::NotExists)).await.unwrap();
        let err = store.put_item(kv_item("a", 2), Some(Condition::NotExists)).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
    }

    #[tokio::test]
    async fn expired_items_are_invisible() {
        let store = MemoryItemStore::with_clock(|| 1000);
        let mut item = kv_item("a", 1);
        item.ttl = Some(500);
        store.put_item(item, None).await.unwrap();
        assert!(store.get_item("kv:a", "kv:a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn transact_write_is_all_or_nothing() {
        let store = MemoryItemStore::new();
        store.put_item(kv_item("a", 1), None).await.unwrap();
        let actions = vec![
            TransactAction::Put { item: kv_item("b", 2), condition: None },
            TransactAction::Put { item: kv_item("a", 3), condition: Some(Condition::NotExists) },
        ];
        let err = store.transact_write(actions).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
        assert!(store.get_item("kv:b", "kv:b").await.unwrap().is_none(), "no item must be mutated on failure");
    }
}
