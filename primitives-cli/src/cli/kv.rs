use clap::Subcommand;
use serde_json::Value;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::kv;
use primitives_core::store::ItemStoreDriver;

#[derive(Debug, Subcommand)]
pub enum KvCommand {
    /// Write a value. JSON if it parses as JSON, the raw string otherwise.
    Set {
        name: String,
        value: String,
        #[clap(long)]
        ttl: Option<i64>,
        #[clap(long, conflicts_with = "if_exists")]
        if_not_exists: bool,
        #[clap(long, conflicts_with = "if_not_exists")]
        if_exists: bool,
    },
    Get {
        name: String,
    },
    Delete {
        name: String,
    },
    Exists {
        name: String,
    },
    /// List keys, newest-updated first.
    List {
        #[clap(long)]
        limit: Option<usize>,
    },
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

pub async fn run(cmd: KvCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        KvCommand::Set { name, value, ttl, if_not_exists, if_exists } => {
            let mode = if if_not_exists {
                kv::WriteMode::IfNotExists
            } else if if_exists {
                kv::WriteMode::IfExists
            } else {
                kv::WriteMode::Upsert
            };
            kv::set(store, &name, parse_value(&value), kv::SetOptions { mode, ttl_seconds: ttl }).await?;
            Ok(Record::empty_ok())
        }
        KvCommand::Get { name } => match kv::get(store, &name).await? {
            Some(value) => Ok(Record::ok(value)),
            None => Ok(Record { ok: true, value: Some(Value::Null), metadata: None }),
        },
        KvCommand::Delete { name } => {
            kv::delete(store, &name).await?;
            Ok(Record::empty_ok())
        }
        KvCommand::Exists { name } => Ok(Record::ok(serde_json::json!(kv::exists(store, &name).await?))),
        KvCommand::List { limit } => {
            let entries = kv::list(store, limit).await?;
            let value = serde_json::json!(entries
                .into_iter()
                .map(|(name, value)| serde_json::json!({"name": name, "value": value}))
                .collect::<Vec<_>>());
            Ok(Record::ok(value))
        }
    }
}
