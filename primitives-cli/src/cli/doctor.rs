//! A connectivity-free smoke test: resolves configuration the same way
//! every other command does and exercises the in-memory store doubles,
//! so a user can confirm the binary and its argument/env resolution
//! work before pointing it at a real table or bucket.

use clap::Args;
use serde_json::json;

use primitives_core::blob::memory::MemoryObjectStore;
use primitives_core::blob::ObjectStoreDriver;
use primitives_core::config::ClientConfig;
use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::kv;
use primitives_core::store::memory::MemoryItemStore;

#[derive(Debug, Args)]
pub struct DoctorArgs {}

pub async fn run(_args: DoctorArgs, config: &ClientConfig) -> CResult<Record> {
    let store = MemoryItemStore::new();
    kv::set(&store, "doctor-probe", json!(true), kv::SetOptions::default()).await?;
    let item_store_ok = kv::get(&store, "doctor-probe").await?.is_some();

    let objects = MemoryObjectStore::new();
    objects.put_object("doctor-probe", bytes::Bytes::from_static(b"ok"), None).await?;
    let object_store_ok = objects.head_object("doctor-probe").await?.is_some();

    Ok(Record::ok(json!({
        "item_store": item_store_ok,
        "object_store": object_store_ok,
        "table": config.table,
        "region": config.region,
        "profile": config.profile,
        "aws_access_key_set": std::env::var("AWS_ACCESS_KEY_ID").is_ok(),
    })))
}
