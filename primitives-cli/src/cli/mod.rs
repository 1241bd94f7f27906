//! The `<category> <operation>` command tree, one module per
//! category, each translating flat CLI arguments into a call against
//! `primitives_core`.

pub mod blob;
pub mod counter;
pub mod doctor;
pub mod kv;
pub mod leader;
pub mod list;
pub mod lock;
pub mod mq;
pub mod queue;
pub mod set;
pub mod topic;
pub mod transaction;

use clap::{Parser, Subcommand};

use primitives_core::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "aws-primitives-tool", version, about = "Durable, cloud-backed distributed-systems primitives as pipeable shell commands")]
pub struct Cli {
    /// DynamoDB table name. Falls back to AWS_PRIMITIVES_TOOL_TABLE, then
    /// a compiled-in default.
    #[clap(long, global = true)]
    pub table: Option<String>,

    #[clap(long, global = true)]
    pub region: Option<String>,

    #[clap(long, global = true)]
    pub profile: Option<String>,

    /// Overall deadline for the operation, in seconds.
    #[clap(long, global = true)]
    pub timeout: Option<u64>,

    #[clap(long, global = true, value_enum)]
    pub format: Option<OutputFormatArg>,

    /// Suppress progress bars and status lines on stderr.
    #[clap(short, long, global = true)]
    pub quiet: bool,

    #[clap(short, long, global = true)]
    pub verbose: bool,

    #[clap(long, global = true, default_value = "info")]
    pub log_level: String,

    #[clap(subcommand)]
    pub command: Category,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormatArg {
    Json,
    JsonLines,
    Value,
    Table,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::JsonLines => OutputFormat::JsonLines,
            OutputFormatArg::Value => OutputFormat::Value,
            OutputFormatArg::Table => OutputFormat::Table,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Category {
    /// Key/value store.
    #[clap(subcommand)]
    Kv(kv::KvCommand),
    /// Atomic counters.
    #[clap(subcommand)]
    Counter(counter::CounterCommand),
    /// Distributed locks.
    #[clap(subcommand)]
    Lock(lock::LockCommand),
    /// Priority/FIFO queue.
    #[clap(subcommand)]
    Queue(queue::QueueCommand),
    /// Leader election.
    #[clap(subcommand)]
    Leader(leader::LeaderCommand),
    /// Unordered sets.
    #[clap(subcommand)]
    Set(set::SetCommand),
    /// Ordered lists.
    #[clap(subcommand)]
    List(list::ListCommand),
    /// Cross-primitive transactions.
    #[clap(subcommand)]
    Txn(transaction::TxnCommand),
    /// Object storage.
    #[clap(subcommand)]
    Blob(blob::BlobCommand),
    /// SNS-style topic contract.
    #[clap(subcommand)]
    Topic(topic::TopicCommand),
    /// SQS-style external queue contract.
    #[clap(subcommand)]
    Mq(mq::MqCommand),
    /// Connectivity smoke test.
    Doctor(doctor::DoctorArgs),
}
