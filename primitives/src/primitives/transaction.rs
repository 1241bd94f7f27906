//! generic cross-primitive transactions: a batch of named actions
//! applied all-or-nothing via [`ItemStoreDriver::transact_write`].
//!
//! This is the only primitive module that lets a caller compose writes
//! across different namespaces (e.g. decrementing a counter and pushing a
//! queue message atomically) instead of one dedicated operation per
//! primitive.

use serde_json::Value;

use crate::error::CResult;
use crate::item::{now_seconds, Condition, Item, ItemType};
use crate::key::{encode_singleton, Namespace};
use crate::store::{ItemStoreDriver, Mutation, TransactAction};

/// One entry in a transaction request, expressed in terms a CLI caller
/// can build from flat arguments rather than raw partition/sort keys.
#[derive(Debug, Clone)]
pub enum TxnOp {
    PutKv { namespace: Namespace, name: String, value: Value, require_absent: bool },
    DeleteKv { namespace: Namespace, name: String, require_present: bool },
    IncrCounter { name: String, by: i64 },
    AssertExists { namespace: Namespace, name: String },
    AssertAbsent { namespace: Namespace, name: String },
}

/// Translates [`TxnOp`]s into [`TransactAction`]s and validates the batch
/// (cardinality, size, no duplicate keys) before ever touching the store,
/// then commits it as one `transact_write` call.
pub async fn execute(store: &dyn ItemStoreDriver, ops: Vec<TxnOp>) -> CResult<()> {
    let now = now_seconds();
    let mut actions = Vec::with_capacity(ops.len());
    for op in ops {
        actions.push(to_action(op, now)?);
    }
    store.transact_write(actions).await
}

fn to_action(op: TxnOp, now: i64) -> CResult<TransactAction> {
    Ok(match op {
        TxnOp::PutKv { namespace, name, value, require_absent } => {
            let pk = encode_singleton(namespace, &name)?;
            TransactAction::Put {
                item: Item::new(pk.clone(), pk, ItemType::from(namespace), value, now),
                condition: if require_absent { Some(Condition::NotExists) } else { None },
            }
        }
        TxnOp::DeleteKv { namespace, name, require_present } => {
            let pk = encode_singleton(namespace, &name)?;
            TransactAction::Delete {
                partition_key: pk.clone(),
                sort_key: pk,
                condition: if require_present { Some(Condition::Exists) } else { None },
            }
        }
        TxnOp::IncrCounter { name, by } => {
            let pk = encode_singleton(Namespace::Counter, &name)?;
            TransactAction::Update {
                partition_key: pk.clone(),
                sort_key: pk,
                mutation: Mutation::Add { field: "value".to_string(), by },
                condition: None,
            }
        }
        TxnOp::AssertExists { namespace, name } => {
            let pk = encode_singleton(namespace, &name)?;
            TransactAction::ConditionCheck { partition_key: pk.clone(), sort_key: pk, condition: Condition::Exists }
        }
        TxnOp::AssertAbsent { namespace, name } => {
            let pk = encode_singleton(namespace, &name)?;
            TransactAction::ConditionCheck { partition_key: pk.clone(), sort_key: pk, condition: Condition::NotExists }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::{counter, kv};
    use crate::store::memory::MemoryItemStore;
    use serde_json::json;

    #[tokio::test]
    async fn commits_every_action_together() {
        let store = MemoryItemStore::new();
        let ops = vec![
            TxnOp::PutKv { namespace: Namespace::Kv, name: "a".to_string(), value: json!(1), require_absent: true },
            TxnOp::IncrCounter { name: "hits".to_string(), by: 1 },
        ];
        execute(&store, ops).await.unwrap();
        assert_eq!(kv::get(&store, "a").await.unwrap(), Some(json!(1)));
        assert_eq!(counter::get(&store, "hits").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn one_failing_assertion_aborts_the_whole_batch() {
        let store = MemoryItemStore::new();
        let ops = vec![
            TxnOp::PutKv { namespace: Namespace::Kv, name: "a".to_string(), value: json!(1), require_absent: false },
            TxnOp::AssertExists { namespace: Namespace::Kv, name: "never-written".to_string() },
        ];
        let err = execute(&store, ops).await.unwrap_err();
        assert_eq!(err.kind(), "ConditionFailed");
        assert_eq!(kv::get(&store, "a").await.unwrap(), None);
    }
}
