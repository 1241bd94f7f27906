use clap::Subcommand;
use serde_json::json;

use primitives_core::contracts::QueueServiceContract;
use primitives_core::error::CResult;
use primitives_core::output::Record;

#[derive(Debug, Subcommand)]
pub enum MqCommand {
    Send {
        queue_url: String,
        body: String,
        #[clap(long)]
        delay_seconds: Option<i32>,
    },
    Receive {
        queue_url: String,
        #[clap(long, default_value_t = 1)]
        max_messages: i32,
        #[clap(long, default_value_t = 0)]
        wait_seconds: i32,
    },
    Delete {
        queue_url: String,
        receipt_handle: String,
    },
    ChangeVisibility {
        queue_url: String,
        receipt_handle: String,
        visibility_seconds: i32,
    },
}

pub async fn run(cmd: MqCommand, mq: &dyn QueueServiceContract) -> CResult<Record> {
    match cmd {
        MqCommand::Send { queue_url, body, delay_seconds } => {
            let message_id = mq.send(&queue_url, &body, delay_seconds).await?;
            Ok(Record::ok(json!({"message_id": message_id})))
        }
        MqCommand::Receive { queue_url, max_messages, wait_seconds } => {
            let messages = mq.receive(&queue_url, max_messages, wait_seconds).await?;
            let value = json!(messages
                .into_iter()
                .map(|m| json!({"receipt_handle": m.receipt_handle, "body": m.body}))
                .collect::<Vec<_>>());
            Ok(Record::ok(value))
        }
        MqCommand::Delete { queue_url, receipt_handle } => {
            mq.delete(&queue_url, &receipt_handle).await?;
            Ok(Record::empty_ok())
        }
        MqCommand::ChangeVisibility { queue_url, receipt_handle, visibility_seconds } => {
            mq.change_visibility(&queue_url, &receipt_handle, visibility_seconds).await?;
            Ok(Record::empty_ok())
        }
    }
}
