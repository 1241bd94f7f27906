use clap::Subcommand;
use serde_json::{json, Value};

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::queue;
use primitives_core::store::ItemStoreDriver;

fn parse_payload(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Enqueue a payload. Lower `--priority` values pop first.
    Push {
        name: String,
        payload: String,
        #[clap(long, default_value_t = 5)]
        priority: u32,
        #[clap(long)]
        dedup_id: Option<String>,
    },
    /// Claim and hide the next eligible message for `--visibility` seconds.
    Pop {
        name: String,
        #[clap(long, default_value_t = 30)]
        visibility: i64,
    },
    Peek {
        name: String,
    },
    Size {
        name: String,
    },
    Ack {
        name: String,
        #[clap(long)]
        message_id: String,
        #[clap(long)]
        receipt: String,
    },
}

pub async fn run(cmd: QueueCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        QueueCommand::Push { name, payload, priority, dedup_id } => {
            let id = queue::push(store, &name, parse_payload(&payload), priority, dedup_id.as_deref()).await?;
            Ok(Record::ok(json!({"message_id": id})))
        }
        QueueCommand::Pop { name, visibility } => match queue::pop(store, &name, visibility).await? {
            Some(msg) => Ok(Record::ok(json!({
                "message_id": msg.id,
                "receipt": msg.receipt,
                "payload": msg.payload,
            }))),
            None => Ok(Record::ok(Value::Null)),
        },
        QueueCommand::Peek { name } => Ok(Record::ok(queue::peek(store, &name).await?.unwrap_or(Value::Null))),
        QueueCommand::Size { name } => Ok(Record::ok(json!(queue::size(store, &name).await?))),
        QueueCommand::Ack { name, message_id, receipt } => {
            queue::ack(store, &name, &message_id, &receipt).await?;
            Ok(Record::empty_ok())
        }
    }
}
