use std::env;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Parser;
use log::info;

use primitives_core::config::ClientConfigBuilder;
use primitives_core::error::Error;
use primitives_core::output::{render_error, ExitCode, OutputFormat, Record};
use primitives_core::store::dynamo::DynamoItemStore;
use primitives_core::contracts::{SnsTopicContract, SqsQueueService};

use primitives_cli::cli::{Category, Cli};
use primitives_cli::{cli, config::CliSettings, trace, PBAR};

#[tokio::main]
async fn main() {
    setup_panic_hooks();

    let args = Cli::parse();

    let log_dir = format!("{}/.aws-primitives-tool", env::var("HOME").unwrap_or_else(|_| ".".to_string()));
    let _guards = trace::init_logging(&log_dir, &args.log_level).unwrap_or_default();
    info!("aws-primitives-tool start args: {args:?}");

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .expect("error setting Ctrl-C handler");

    PBAR.set_quiet(args.quiet);

    let settings = CliSettings::load();
    let format = args.format.map(OutputFormat::from).unwrap_or_else(|| settings.default_output_format());

    let config = ClientConfigBuilder::new()
        .table(args.table.clone())
        .region(args.region.clone())
        .profile(args.profile.clone())
        .timeout(args.timeout.map(std::time::Duration::from_secs))
        .build();

    let result = dispatch(args.command, &config).await;
    match result {
        Ok(record) => {
            print_record(&record, format);
        }
        Err(err) => {
            eprintln!("{}", render_error(&err));
            std::process::exit(ExitCode::from(&err).0);
        }
    }
}

async fn dispatch(category: Category, config: &primitives_core::config::ClientConfig) -> Result<Record, Error> {
    match category {
        Category::Kv(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::kv::run(cmd, &store).await
        }
        Category::Counter(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::counter::run(cmd, &store).await
        }
        Category::Lock(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::lock::run(cmd, &store).await
        }
        Category::Queue(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::queue::run(cmd, &store).await
        }
        Category::Leader(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::leader::run(cmd, &store).await
        }
        Category::Set(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::set::run(cmd, &store).await
        }
        Category::List(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::list::run(cmd, &store).await
        }
        Category::Txn(cmd) => {
            let store = DynamoItemStore::from_config(config.region.clone(), config.profile.clone(), config.table.clone()).await;
            cli::transaction::run(cmd, &store).await
        }
        Category::Blob(cmd) => cli::blob::run(cmd, config).await,
        Category::Topic(cmd) => {
            let topic = SnsTopicContract::from_config(config.region.clone(), config.profile.clone()).await;
            cli::topic::run(cmd, &topic).await
        }
        Category::Mq(cmd) => {
            let mq = SqsQueueService::from_config(config.region.clone(), config.profile.clone()).await;
            cli::mq::run(cmd, &mq).await
        }
        Category::Doctor(args) => cli::doctor::run(args, config).await,
    }
}

/// Renders a [`Record`] to stdout per `--format`, the one place every
/// command's output funnels through.
fn print_record(record: &Record, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
        }
        OutputFormat::JsonLines => {
            println!("{}", serde_json::to_string(record).unwrap_or_default());
        }
        OutputFormat::Value => match &record.value {
            Some(serde_json::Value::String(s)) => println!("{s}"),
            Some(value) => println!("{value}"),
            None => {}
        },
        OutputFormat::Table => print_table(record),
    }
}

fn print_table(record: &Record) {
    match &record.value {
        Some(serde_json::Value::Array(items)) => {
            for item in items {
                println!("{item}");
            }
        }
        Some(value) => println!("{value}"),
        None => {}
    }
}

/// Installs a human-readable panic handler. Left inert under
/// `RUST_BACKTRACE` so a developer debugging a crash still gets the raw
/// backtrace instead of the crash-report file.
fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: "aws-primitives-tool".into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();
    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);
            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta).expect("human-panic: printing error message to console failed");
        }));
    }
}
