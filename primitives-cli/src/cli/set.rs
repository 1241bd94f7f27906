use clap::Subcommand;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::set;
use primitives_core::store::ItemStoreDriver;

#[derive(Debug, Subcommand)]
pub enum SetCommand {
    Sadd { name: String, member: String },
    Srem { name: String, member: String },
    Sismember { name: String, member: String },
    Smembers { name: String },
    Scard { name: String },
}

pub async fn run(cmd: SetCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        SetCommand::Sadd { name, member } => {
            set::sadd(store, &name, &member).await?;
            Ok(Record::empty_ok())
        }
        SetCommand::Srem { name, member } => {
            set::srem(store, &name, &member).await?;
            Ok(Record::empty_ok())
        }
        SetCommand::Sismember { name, member } => Ok(Record::ok(serde_json::json!(set::sismember(store, &name, &member).await?))),
        SetCommand::Smembers { name } => Ok(Record::ok(serde_json::json!(set::smembers(store, &name).await?))),
        SetCommand::Scard { name } => Ok(Record::ok(serde_json::json!(set::scard(store, &name).await?))),
    }
}
