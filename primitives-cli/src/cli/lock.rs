use clap::Subcommand;
use serde_json::json;

use primitives_core::error::CResult;
use primitives_core::output::Record;
use primitives_core::primitives::lock;
use primitives_core::store::ItemStoreDriver;

#[derive(Debug, Subcommand)]
pub enum LockCommand {
    /// Acquire the lock, waiting up to `--wait` seconds (default: fail fast).
    Acquire {
        name: String,
        #[clap(long)]
        holder: String,
        #[clap(long, default_value_t = 30)]
        ttl: i64,
        #[clap(long)]
        wait: Option<u64>,
    },
    /// Release the lock. Fails if `fencing_token` is stale.
    Release {
        name: String,
        #[clap(long)]
        fencing_token: i64,
    },
    Extend {
        name: String,
        #[clap(long)]
        fencing_token: i64,
        #[clap(long, default_value_t = 30)]
        ttl: i64,
    },
    Check {
        name: String,
    },
}

pub async fn run(cmd: LockCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        LockCommand::Acquire { name, holder, ttl, wait } => {
            let handle = lock::acquire(store, &name, &holder, ttl, wait.map(std::time::Duration::from_secs)).await?;
            Ok(Record::ok(json!({
                "holder": handle.holder,
                "fencing_token": handle.fencing_token,
                "expires_at": handle.expires_at,
            })))
        }
        LockCommand::Release { name, fencing_token } => {
            lock::release(store, &name, fencing_token).await?;
            Ok(Record::empty_ok())
        }
        LockCommand::Extend { name, fencing_token, ttl } => {
            let expires_at = lock::extend(store, &name, fencing_token, ttl).await?;
            Ok(Record::ok(json!({"expires_at": expires_at})))
        }
        LockCommand::Check { name } => match lock::check(store, &name).await? {
            Some(info) => Ok(Record::ok(json!({
                "holder": info.holder,
                "fencing_token": info.fencing_token,
                "expires_at": info.expires_at,
            }))),
            None => Ok(Record::ok(serde_json::Value::Null)),
        },
    }
}
