//! Process-wide settings resolved once at command entry and passed by
//! value into every primitive call — no thread-locals, no global client
//! singleton, so concurrent commands in the same process never race over
//! which table or region they're pointed at.

use std::time::Duration;

pub const DEFAULT_TABLE_NAME: &str = "aws-primitives-tool";
pub const DEFAULT_TTL_SECONDS: i64 = 0;
pub const DEFAULT_LOCK_TTL_SECONDS: i64 = 30;
pub const DEFAULT_QUEUE_VISIBILITY_SECONDS: i64 = 30;
pub const DEFAULT_MULTIPART_THRESHOLD_BYTES: u64 = 100 * 1024 * 1024;
pub const DEFAULT_CHUNK_SIZE_BYTES: u64 = 100 * 1024 * 1024;
pub const MULTIPART_CHUNK_FLOOR_BYTES: u64 = 5 * 1024 * 1024;
pub const MULTIPART_CHUNK_CEIL_BYTES: u64 = 5 * 1024 * 1024 * 1024;
pub const MULTIPART_MAX_PARTS: u32 = 10_000;
pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
/// Dedup companion item lifetime.
pub const DEFAULT_DEDUP_WINDOW_SECONDS: i64 = 5 * 60;

/// The tool's environment variable prefix, used to build `<TOOL>_*` names.
pub const ENV_PREFIX: &str = "AWS_PRIMITIVES_TOOL";

/// Resolution order: `{explicit arg} -> {env var} -> {compiled-in default}`.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub table: String,
    pub region: Option<String>,
    pub profile: Option<String>,
    pub default_ttl: i64,
    pub lock_ttl: i64,
    pub queue_visibility: i64,
    pub multipart_threshold: u64,
    pub chunk_size: u64,
    pub max_concurrency: usize,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            region: None,
            profile: None,
            default_ttl: DEFAULT_TTL_SECONDS,
            lock_ttl: DEFAULT_LOCK_TTL_SECONDS,
            queue_visibility: DEFAULT_QUEUE_VISIBILITY_SECONDS,
            multipart_threshold: DEFAULT_MULTIPART_THRESHOLD_BYTES,
            chunk_size: DEFAULT_CHUNK_SIZE_BYTES,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            timeout: None,
        }
    }
}

/// Builder that mirrors the table-resolution order:
/// `--table argument => <TOOL>_TABLE env var => compiled-in default`, and
/// likewise for every other tunable.
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self { config: ClientConfig::default() }
    }

    pub fn table(mut self, table: Option<String>) -> Self {
        if let Some(table) = table.or_else(|| std::env::var(format!("{ENV_PREFIX}_TABLE")).ok()) {
            self.config.table = table;
        }
        self
    }

    pub fn region(mut self, region: Option<String>) -> Self {
        self.config.region = region.or_else(|| std::env::var("AWS_REGION").ok());
        self
    }

    pub fn profile(mut self, profile: Option<String>) -> Self {
        self.config.profile = profile.or_else(|| std::env::var("AWS_PROFILE").ok());
        self
    }

    pub fn default_ttl(mut self, ttl: Option<i64>) -> Self {
        if let Some(ttl) = ttl.or_else(|| env_i64(&format!("{ENV_PREFIX}_DEFAULT_TTL"))) {
            self.config.default_ttl = ttl;
        }
        self
    }

    pub fn lock_ttl(mut self, ttl: Option<i64>) -> Self {
        if let Some(ttl) = ttl.or_else(|| env_i64(&format!("{ENV_PREFIX}_LOCK_TTL"))) {
            self.config.lock_ttl = ttl;
        }
        self
    }

    pub fn queue_visibility(mut self, visibility: Option<i64>) -> Self {
        if let Some(visibility) = visibility.or_else(|| env_i64(&format!("{ENV_PREFIX}_QUEUE_VISIBILITY"))) {
            self.config.queue_visibility = visibility;
        }
        self
    }

    pub fn multipart_threshold(mut self, threshold: Option<u64>) -> Self {
        if let Some(threshold) = threshold.or_else(|| env_u64(&format!("{ENV_PREFIX}_MULTIPART_THRESHOLD"))) {
            self.config.multipart_threshold = threshold;
        }
        self
    }

    pub fn chunk_size(mut self, size: Option<u64>) -> Self {
        if let Some(size) = size.or_else(|| env_u64(&format!("{ENV_PREFIX}_CHUNK_SIZE"))) {
            self.config.chunk_size = size;
        }
        self
    }

    pub fn max_concurrency(mut self, concurrency: Option<usize>) -> Self {
        if let Some(concurrency) = concurrency.or_else(|| env_usize(&format!("{ENV_PREFIX}_MAX_CONCURRENCY"))) {
            self.config.max_concurrency = concurrency;
        }
        self
    }

    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn build(self) -> ClientConfig {
        self.config
    }
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn env_i64(name: &str) -> Option<i64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_u64(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_usize(name: &str) -> Option<usize> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn arg_wins_over_env_wins_over_default() {
        std::env::remove_var(format!("{ENV_PREFIX}_TABLE"));
        let cfg = ClientConfigBuilder::new().table(None).build();
        assert_eq!(cfg.table, DEFAULT_TABLE_NAME);

        std::env::set_var(format!("{ENV_PREFIX}_TABLE"), "from-env");
        let cfg = ClientConfigBuilder::new().table(None).build();
        assert_eq!(cfg.table, "from-env");

        let cfg = ClientConfigBuilder::new().table(Some("from-arg".to_string())).build();
        assert_eq!(cfg.table, "from-arg");

        std::env::remove_var(format!("{ENV_PREFIX}_TABLE"));
    }
}
