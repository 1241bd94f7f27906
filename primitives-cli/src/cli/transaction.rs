use clap::Subcommand;
use serde_json::Value;

use primitives_core::error::{CResult, Error};
use primitives_core::key::Namespace;
use primitives_core::output::Record;
use primitives_core::primitives::transaction::{self, TxnOp};
use primitives_core::store::ItemStoreDriver;

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_namespace(raw: &str) -> CResult<Namespace> {
    raw.parse().map_err(|_| Error::InvalidArgument(format!("unknown namespace: {raw}")))
}

/// One transaction leg, given on the command line as
/// `kind:namespace:name[:value]`, e.g. `put:kv:a:42` or `incr:counter:hits:1`.
fn parse_op(raw: &str) -> CResult<TxnOp> {
    let mut parts = raw.splitn(4, ':');
    let kind = parts.next().ok_or_else(|| Error::InvalidArgument("empty transaction leg".to_string()))?;
    match kind {
        "put" => {
            let namespace = parse_namespace(parts.next().unwrap_or_default())?;
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("put requires a name".to_string()))?.to_string();
            let value = parse_value(parts.next().unwrap_or("null"));
            Ok(TxnOp::PutKv { namespace, name, value, require_absent: false })
        }
        "put-if-absent" => {
            let namespace = parse_namespace(parts.next().unwrap_or_default())?;
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("put-if-absent requires a name".to_string()))?.to_string();
            let value = parse_value(parts.next().unwrap_or("null"));
            Ok(TxnOp::PutKv { namespace, name, value, require_absent: true })
        }
        "delete" => {
            let namespace = parse_namespace(parts.next().unwrap_or_default())?;
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("delete requires a name".to_string()))?.to_string();
            Ok(TxnOp::DeleteKv { namespace, name, require_present: false })
        }
        "incr" => {
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("incr requires a name".to_string()))?.to_string();
            let by = parts.next().unwrap_or("1").parse().map_err(|_| Error::InvalidArgument("incr amount must be an integer".to_string()))?;
            Ok(TxnOp::IncrCounter { name, by })
        }
        "assert-exists" => {
            let namespace = parse_namespace(parts.next().unwrap_or_default())?;
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("assert-exists requires a name".to_string()))?.to_string();
            Ok(TxnOp::AssertExists { namespace, name })
        }
        "assert-absent" => {
            let namespace = parse_namespace(parts.next().unwrap_or_default())?;
            let name = parts.next().ok_or_else(|| Error::InvalidArgument("assert-absent requires a name".to_string()))?.to_string();
            Ok(TxnOp::AssertAbsent { namespace, name })
        }
        other => Err(Error::InvalidArgument(format!("unknown transaction leg kind: {other}"))),
    }
}

#[derive(Debug, Subcommand)]
pub enum TxnCommand {
    /// Commit a batch of legs atomically. Each leg is
    /// `kind:namespace:name[:value]` (kinds: put, put-if-absent, delete,
    /// incr, assert-exists, assert-absent).
    Run {
        #[clap(required = true)]
        ops: Vec<String>,
    },
}

pub async fn run(cmd: TxnCommand, store: &dyn ItemStoreDriver) -> CResult<Record> {
    match cmd {
        TxnCommand::Run { ops } => {
            let parsed = ops.iter().map(|raw| parse_op(raw)).collect::<CResult<Vec<_>>>()?;
            transaction::execute(store, parsed).await?;
            Ok(Record::empty_ok())
        }
    }
}
