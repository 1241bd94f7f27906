//! Persisted CLI preferences, loaded with `confy` — defaults baked in,
//! no error if the file doesn't exist yet.
//!
//! This is distinct from [`primitives_core::config::ClientConfig`]: this
//! struct holds *display* preferences a user wants remembered across
//! invocations (default output format, progress bar visibility); the
//! cloud-facing tunables (table name, TTLs, concurrency) are resolved
//! fresh every run from `{arg, env, default}` and never persisted here.

use serde_derive::{Deserialize, Serialize};

use primitives_core::output::OutputFormat;

#[derive(Debug, Serialize, Deserialize)]
pub struct CliSettings {
    pub default_format: String,
    pub show_progress: bool,
    pub log_level: String,
}

impl Default for CliSettings {
    fn default() -> Self {
        Self { default_format: "json".to_string(), show_progress: true, log_level: "info".to_string() }
    }
}

impl CliSettings {
    pub fn load() -> Self {
        confy::load("aws-primitives-tool", "config").unwrap_or_default()
    }

    pub fn default_output_format(&self) -> OutputFormat {
        self.default_format.parse().unwrap_or_default()
    }
}
