use clap::Subcommand;
use serde_json::Value;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::list;
use primitives_core::store::ItemStoreDriver;

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Debug, Subcommand)]
pub enum ListCommand {
    Lpush { name: String, value: String },
    Rpush { name: String, value: String },
    Lpop { name: String },
    Rpop { name: String },
    /// Elements with logical index in [start, stop).
    Lrange { name: String, start: i64, stop: i64 },
    Llen { name: String },
}

pub async fn run(cmd: ListCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        ListCommand::Lpush { name, value } => Ok(Record::ok(serde_json::json!(list::lpush(store, &name, parse_value(&value)).await?))),
        ListCommand::Rpush { name, value } => Ok(Record::ok(serde_json::json!(list::rpush(store, &name, parse_value(&value)).await?))),
        ListCommand::Lpop { name } => Ok(Record::ok(list::lpop(store, &name).await?.unwrap_or(Value::Null))),
        ListCommand::Rpop { name } => Ok(Record::ok(list::rpop(store, &name).await?.unwrap_or(Value::Null))),
        ListCommand::Lrange { name, start, stop } => Ok(Record::ok(serde_json::json!(list::lrange(store, &name, start, stop).await?))),
        ListCommand::Llen { name } => Ok(Record::ok(serde_json::json!(list::llen(store, &name).await?))),
    }
}
