use clap::Subcommand;
use serde_json::json;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::leader;
use primitives_core::store::ItemStoreDriver;

#[derive(Debug, Subcommand)]
pub enum LeaderCommand {
    /// Attempt to become leader of `group`.
    Elect {
        group: String,
        #[clap(long)]
        node_id: String,
        #[clap(long, default_value_t = 30)]
        ttl: i64,
    },
    Heartbeat {
        group: String,
        #[clap(long)]
        term: i64,
        #[clap(long, default_value_t = 30)]
        ttl: i64,
    },
    Resign {
        group: String,
        #[clap(long)]
        term: i64,
    },
    Check {
        group: String,
    },
}

pub async fn run(cmd: LeaderCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        LeaderCommand::Elect { group, node_id, ttl } => {
            let handle = leader::elect(store, &group, &node_id, ttl).await?;
            Ok(Record::ok(json!({
                "node_id": handle.node_id,
                "term": handle.term,
                "expires_at": handle.expires_at,
            })))
        }
        LeaderCommand::Heartbeat { group, term, ttl } => {
            let expires_at = leader::heartbeat(store, &group, term, ttl).await?;
            Ok(Record::ok(json!({"expires_at": expires_at})))
        }
        LeaderCommand::Resign { group, term } => {
            leader::resign(store, &group, term).await?;
            Ok(Record::empty_ok())
        }
        LeaderCommand::Check { group } => match leader::check(store, &group).await? {
            Some(info) => Ok(Record::ok(json!({
                "node_id": info.node_id,
                "term": info.term,
                "expires_at": info.expires_at,
            }))),
            None => Ok(Record::ok(serde_json::Value::Null)),
        },
    }
}
