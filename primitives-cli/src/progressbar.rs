//! A global progress/status output: a single place that owns whether
//! the CLI is in `--quiet` mode and whether stdout is a terminal, so
//! every blob-transfer command doesn't re-derive that logic.

use std::sync::atomic::{AtomicBool, Ordering};

use indicatif::{ProgressBar, ProgressStyle};

pub struct ProgressOutput {
    quiet: AtomicBool,
}

impl ProgressOutput {
    pub const fn new() -> Self {
        Self { quiet: AtomicBool::new(false) }
    }

    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Ordering::SeqCst);
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Ordering::SeqCst)
    }

    /// A determinate byte-progress bar for `blob put`/`blob get`, or a
    /// no-op handle in `--quiet` mode / when stdout isn't a terminal.
    pub fn bytes_bar(&self, total: u64) -> ProgressBar {
        if self.is_quiet() || !std::io::IsTerminal::is_terminal(&std::io::stderr()) {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::with_template("{bar:40.cyan/blue} {bytes}/{total_bytes} ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    }

    /// A message printed to stderr unless `--quiet` was passed. Command
    /// output itself always goes to stdout via
    /// `primitives_core::output`; this is status noise only.
    pub fn info(&self, message: &str) {
        if !self.is_quiet() {
            eprintln!("{message}");
        }
    }
}

impl Default for ProgressOutput {
    fn default() -> Self {
        Self::new()
    }
}

/// The global progress/status output.
pub static PBAR: ProgressOutput = ProgressOutput::new();
