use std::collections::HashMap;

use clap::Subcommand;
use serde_json::json;

use primitives_core::contracts::TopicContract;
use primitives_core::error::{CResult, Error};
use primitives_core::output::Record;

fn parse_attributes(raw: &[String]) -> CResult<HashMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| Error::InvalidArgument(format!("attribute must be key=value: {pair}")))
        })
        .collect()
}

#[derive(Debug, Subcommand)]
pub enum TopicCommand {
    Publish {
        topic_arn: String,
        message: String,
        #[clap(long = "attr")]
        attributes: Vec<String>,
    },
    Subscribe {
        topic_arn: String,
        protocol: String,
        endpoint: String,
    },
    Unsubscribe {
        subscription_arn: String,
    },
}

pub async fn run(cmd: TopicCommand, topic: &dyn TopicContract) -> CResult<Record> {
    match cmd {
        TopicCommand::Publish { topic_arn, message, attributes } => {
            let message_id = topic.publish(&topic_arn, &message, parse_attributes(&attributes)?).await?;
            Ok(Record::ok(json!({"message_id": message_id})))
        }
        TopicCommand::Subscribe { topic_arn, protocol, endpoint } => {
            let subscription_arn = topic.subscribe(&topic_arn, &protocol, &endpoint).await?;
            Ok(Record::ok(json!({"subscription_arn": subscription_arn})))
        }
        TopicCommand::Unsubscribe { subscription_arn } => {
            topic.unsubscribe(&subscription_arn).await?;
            Ok(Record::empty_ok())
        }
    }
}
