use clap::Subcommand;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::counter;
use primitives_core::store::ItemStoreDriver;

#[derive(Debug, Subcommand)]
pub enum CounterCommand {
    /// Add `by` (default 1, may be negative) and return the new value.
    Add {
        name: String,
        #[clap(default_value_t = 1)]
        by: i64,
    },
    Get {
        name: String,
    },
    Set {
        name: String,
        value: i64,
    },
}

pub async fn run(cmd: CounterCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        CounterCommand::Add { name, by } => {
            let value = counter::add(store, &name, by).await?;
            Ok(Record::ok(serde_json::json!(value)))
        }
        CounterCommand::Get { name } => {
            let value = counter::get(store, &name).await?;
            Ok(Record::ok(serde_json::json!(value)))
        }
        CounterCommand::Set { name, value } => {
            counter::set(store, &name, value).await?;
            Ok(Record::empty_ok())
        }
    }
}
