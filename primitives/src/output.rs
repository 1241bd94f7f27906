//! Canonical output shapes and exit codes shared by every CLI
//! subcommand, so `primitives-cli` never hand-rolls its own JSON
//! envelope or exit-code mapping per command.

use serde::Serialize;
use serde_json::Value;

use crate::error::Error;

/// How a successful result is rendered to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum OutputFormat {
    /// One JSON object (or array), pretty enough to read, exact enough to
    /// pipe into `jq`.
    Json,
    /// One JSON object per line, for streaming commands (`queue pop`,
    /// `kv list`) that a consumer wants to process incrementally.
    JsonLines,
    /// The bare scalar value only, for shell-variable capture
    /// (`x=$(tool kv get foo)`).
    Value,
    /// An aligned, human-readable table (`list`/`smembers`-style
    /// commands).
    Table,
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json
    }
}

/// A single record in the canonical shape every read/write operation
/// reports back, regardless of which primitive produced it.
#[derive(Debug, Clone, Serialize)]
pub struct Record {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl Record {
    pub fn ok(value: Value) -> Self {
        Self { ok: true, value: Some(value), metadata: None }
    }

    pub fn ok_with_metadata(value: Value, metadata: Value) -> Self {
        Self { ok: true, value: Some(value), metadata: Some(metadata) }
    }

    pub fn empty_ok() -> Self {
        Self { ok: true, value: None, metadata: None }
    }
}

/// Maps every [`Error`] variant to a process exit status: `0` success,
/// `1` logical not-found or other benign failure, `2` invalid arguments,
/// `3` remote service error (throttling, permission denied, an
/// unclassified service fault), `4` coordination unavailability (lock
/// held by another owner, not elected, a dedup hit), `5` timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const NOT_FOUND: ExitCode = ExitCode(1);
    pub const USAGE: ExitCode = ExitCode(2);
    pub const SERVICE_ERROR: ExitCode = ExitCode(3);
    pub const COORDINATION_UNAVAILABLE: ExitCode = ExitCode(4);
    pub const TIMEOUT: ExitCode = ExitCode(5);
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::NotFound(_) => ExitCode::NOT_FOUND,
            Error::InvalidArgument(_) => ExitCode::USAGE,
            Error::ServiceThrottled(_) | Error::PermissionDenied(_) | Error::ServiceError(_) | Error::Internal(_) => {
                ExitCode::SERVICE_ERROR
            }
            Error::CoordinationUnavailable(_) | Error::AlreadyExists(_) | Error::ConditionFailed(_) => {
                ExitCode::COORDINATION_UNAVAILABLE
            }
            Error::Timeout(_) => ExitCode::TIMEOUT,
        }
    }
}

/// Renders an error as the two-line stderr envelope every command uses:
/// the message on the first line, the actionable remedy on the second.
/// Never printed to stdout — stdout is reserved for the success
/// payload so piping a failed command yields nothing, not noise.
pub fn render_error(err: &Error) -> String {
    format!("error: {err}\n  -> {}", err.solution())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn condition_failed_maps_to_coordination_unavailable() {
        let err = Error::ConditionFailed("lock held".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::COORDINATION_UNAVAILABLE);
    }

    #[test]
    fn throttled_maps_to_service_error_exit_code() {
        let err = Error::ServiceThrottled("slow down".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::SERVICE_ERROR);
    }

    #[test]
    fn not_found_maps_to_exit_code_one() {
        let err = Error::NotFound("kv:missing".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::NOT_FOUND);
    }

    #[test]
    fn timeout_maps_to_exit_code_five() {
        let err = Error::Timeout("deadline exceeded".to_string());
        assert_eq!(ExitCode::from(&err), ExitCode::TIMEOUT);
    }

    #[test]
    fn render_error_has_two_lines() {
        let err = Error::NotFound("kv:missing".to_string());
        let rendered = render_error(&err);
        assert_eq!(rendered.lines().count(), 2);
    }
}
