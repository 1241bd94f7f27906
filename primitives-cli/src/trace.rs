//! Logging setup: `fern` dispatches to a daily-rotating file via
//! `tracing-appender`, plus a colored stderr channel for warnings. All
//! command output a user pipes goes to stdout through
//! `primitives_core::output`; this module only ever writes to the log
//! file and, for warnings, stderr.

use std::io::{BufWriter, Write};
use std::str::FromStr;

use anyhow::Result;
use log::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};

const MAX_LOG_FILES: usize = 10;
const LOG_BUFFER_BYTES: usize = 1024 * 1024;

/// Initializes logging to `<dir>/aws-primitives-tool.log`, rotated daily,
/// at `level`. Returns the guards that must stay alive for the life of
/// the process or buffered log lines are dropped on exit.
pub fn init_logging(dir: &str, level: &str) -> Result<Vec<Box<dyn Drop + Send + Sync + 'static>>> {
    let mut guards: Vec<Box<dyn Drop + Send + Sync + 'static>> = Vec::new();

    let rolling = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("aws-primitives-tool.log")
        .max_log_files(MAX_LOG_FILES)
        .build(dir)?;
    let (non_blocking, flush_guard) = tracing_appender::non_blocking(rolling);
    let buffered = BufWriter::with_capacity(LOG_BUFFER_BYTES, non_blocking);
    guards.push(Box::new(flush_guard));

    let file_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {} [{}] {}",
                chrono::Local::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::from_str(level).unwrap_or(LevelFilter::Info))
        .chain(Box::new(buffered) as Box<dyn Write + Send>);

    let stderr_dispatch = fern::Dispatch::new()
        .level(LevelFilter::Warn)
        .format(|out, message, _| {
            out.finish(format_args!("\x1B[{}m{}\x1B[0m", fern::colors::Color::Yellow.to_fg_str(), message))
        })
        .chain(std::io::stderr());

    let result = fern::Dispatch::new().chain(file_dispatch).chain(stderr_dispatch).apply();
    if result.is_err() {
        eprintln!("logger already initialized");
        return Ok(Vec::new());
    }
    Ok(guards)
}
