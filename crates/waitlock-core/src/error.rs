//! Error type for the lock engine, with a mapping onto process exit codes.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by `waitlock-core` operations.
///
/// Each variant corresponds to one of the terminal exit codes a caller
/// reports to the shell; see [`WaitlockError::exit_code`].
#[derive(Error, Debug)]
pub enum WaitlockError {
    /// No slot became available before the caller's timeout elapsed.
    #[error("timeout waiting for lock '{descriptor}' after {elapsed_secs:.1}s")]
    Timeout { descriptor: String, elapsed_secs: f64 },

    /// No writable lock directory could be found or created.
    #[error("cannot find or create a lock directory (tried: {tried})")]
    NoDirectory { tried: String },

    /// An I/O failure that is not one of the recognized transient cases.
    #[error("I/O error on {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    /// A signal arrived and aborted an in-progress `acquire`.
    #[error("cancelled by signal while waiting for lock '{descriptor}'")]
    Cancelled { descriptor: String },

    /// Live records for this descriptor disagree with the caller's capacity.
    #[error(
        "capacity mismatch for lock '{descriptor}': caller requested {requested}, \
         existing holder declared {existing}"
    )]
    CapacityMismatch {
        descriptor: String,
        requested: u32,
        existing: u32,
    },

    /// Bad invocation: invalid descriptor, flag, or out-of-range slot.
    #[error("usage error: {0}")]
    Usage(String),

    /// The caller lacks permission to perform the operation.
    #[error("permission denied: {0}")]
    Permission(String),

    /// No matching record was found (e.g., `done` on an unheld descriptor).
    #[error("not found: {0}")]
    NotFound(String),

    /// The child process for `--exec` could not be started or exited abnormally.
    #[error("exec failed: {0}")]
    ExecFailed(String),

    /// A transient condition the caller may retry.
    #[error("temporary failure: {0}")]
    Temporary(String),
}

impl WaitlockError {
    /// The process exit code this error corresponds to (spec.md §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            WaitlockError::Timeout { .. } => 2,
            WaitlockError::Usage(_) => 3,
            WaitlockError::Io { .. } => 4,
            WaitlockError::CapacityMismatch { .. } => 4,
            WaitlockError::Permission(_) => 5,
            WaitlockError::NoDirectory { .. } => 6,
            WaitlockError::Temporary(_) => 75,
            WaitlockError::ExecFailed(_) => 126,
            WaitlockError::NotFound(_) => 127,
            WaitlockError::Cancelled { .. } => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_match_spec() {
        assert_eq!(
            WaitlockError::Timeout {
                descriptor: "d".into(),
                elapsed_secs: 1.0
            }
            .exit_code(),
            2
        );
        assert_eq!(WaitlockError::Usage("bad".into()).exit_code(), 3);
        assert_eq!(WaitlockError::Permission("no".into()).exit_code(), 5);
        assert_eq!(
            WaitlockError::NoDirectory { tried: "x".into() }.exit_code(),
            6
        );
        assert_eq!(WaitlockError::Temporary("x".into()).exit_code(), 75);
        assert_eq!(WaitlockError::ExecFailed("x".into()).exit_code(), 126);
        assert_eq!(WaitlockError::NotFound("x".into()).exit_code(), 127);
    }
}
