//! Error taxonomy shared by every primitive, driver and CLI command.
//!
//! `Error` is the one sum type that crosses every layer boundary in this
//! crate: the item-store driver (`store`), the object-store driver
//! (`blob`), and every primitive built on top of them all fail with this
//! enum rather than leaking SDK-specific error types. `primitives-cli`
//! maps each variant to an exit code and a two-line stderr envelope at the
//! shell boundary (see `primitives_core::output`).

use std::fmt;

/// The result type used throughout this crate.
pub type CResult<T> = Result<T, Error>;

/// The error taxonomy every primitive, driver and CLI command fails with.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The addressed entity is absent.
    #[error("not found: {0}")]
    NotFound(String),

    /// An `if-absent`/`if-not-exists` precondition failed because the item
    /// already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// A CAS/condition other than existence failed (wrong value, wrong
    /// owner, wrong version).
    #[error("condition failed: {0}")]
    ConditionFailed(String),

    /// Lock held, not leader, dedup hit, or queue empty on a non-blocking
    /// pop.
    #[error("coordination unavailable: {0}")]
    CoordinationUnavailable(String),

    /// A shape/range/format violation was detected before contacting the
    /// service.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The remote backend signaled a retryable failure (throttling).
    #[error("service throttled: {0}")]
    ServiceThrottled(String),

    /// The remote backend signaled a permanent failure.
    #[error("service error: {0}")]
    ServiceError(String),

    /// Authorization failure.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The global deadline (`--timeout`) was exceeded.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Anything that doesn't fit the taxonomy above: local I/O, codec
    /// failures, bugs. A single catch-all rather than one variant per
    /// failure mode, since callers never need to branch on it.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// A short machine-stable name for this variant, used in
    /// `--format json-lines` error records and `--verbose` diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::AlreadyExists(_) => "AlreadyExists",
            Error::ConditionFailed(_) => "ConditionFailed",
            Error::CoordinationUnavailable(_) => "CoordinationUnavailable",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::ServiceThrottled(_) => "ServiceThrottled",
            Error::ServiceError(_) => "ServiceError",
            Error::PermissionDenied(_) => "PermissionDenied",
            Error::Timeout(_) => "Timeout",
            Error::Internal(_) => "Internal",
        }
    }

    /// Whether the retry utility is allowed to retry this error
    /// transparently. Only `ServiceThrottled` qualifies; `ConditionFailed`
    /// is never retried here because it carries primitive-level meaning.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::ServiceThrottled(_))
    }

    /// The one-line actionable remedy printed on the `Solution:` line of
    /// the stderr envelope (see `output::render_error`).
    pub fn solution(&self) -> String {
        match self {
            Error::NotFound(_) => {
                "Check the name/key, or pass --create / a default value if one is available."
                    .to_string()
            }
            Error::AlreadyExists(_) => {
                "Drop --if-not-exists, or choose a different name.".to_string()
            }
            Error::ConditionFailed(msg) => {
                format!("The stored value, owner or version did not match what was expected ({msg}). Re-read and retry.")
            }
            Error::CoordinationUnavailable(_) => {
                "Another caller currently holds this resource. Retry later, or pass --wait to block."
                    .to_string()
            }
            Error::InvalidArgument(_) => {
                "Fix the argument shape: names must match [A-Za-z0-9_./-]{1,200} and namespaces must be one of the reserved set."
                    .to_string()
            }
            Error::ServiceThrottled(_) => {
                "The backend is throttling requests; this call will be retried automatically up to the retry budget."
                    .to_string()
            }
            Error::ServiceError(_) => {
                "The backend returned an unexpected error. Re-run with --verbose for details."
                    .to_string()
            }
            Error::PermissionDenied(_) => {
                "Check the credentials/profile/region in effect and the IAM policy attached to them."
                    .to_string()
            }
            Error::Timeout(_) => {
                "The operation exceeded --timeout. Increase the deadline or check backend health."
                    .to_string()
            }
            Error::Internal(_) => "This is a bug; re-run with --verbose and file a report.".to_string(),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Internal(format!("json codec error: {err}"))
    }
}

/// A lightweight wrapper so call sites can attach a human string to an
/// otherwise-opaque SDK error without pulling every AWS SDK error type
/// into the public API of this crate.
pub fn service_error(context: &str, err: impl fmt::Display) -> Error {
    Error::ServiceError(format!("{context}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_throttled_is_retryable() {
        assert!(Error::ServiceThrottled("x".into()).is_retryable());
        assert!(!Error::ConditionFailed("x".into()).is_retryable());
        assert!(!Error::ServiceError("x".into()).is_retryable());
    }

    #[test]
    fn kind_is_stable() {
        assert_eq!(Error::NotFound("k".into()).kind(), "NotFound");
        assert_eq!(Error::Timeout("k".into()).kind(), "Timeout");
    }
}
