//! `waitlock --exec`: acquire a slot, run a command under it, release on
//! exit (spec.md §4.8). `std::process::Command` stands in for the
//! original's fork/exec.

use std::process::Command;
use std::sync::atomic::AtomicBool;

use super::holder::Holder;
use super::slot::{acquire, AcquireOptions};
use crate::error::WaitlockError;
use crate::logging::Diagnostics;

/// Outcome of a supervised `--exec` run.
pub struct ExecOutcome {
    /// Exit code to propagate to our own caller: the child's exit code
    /// when it exited normally, or `128 + signal` when it was killed by a
    /// signal (spec.md §7).
    pub exit_code: i32,
}

/// Acquire `opts`, then run `argv` with `WAITLOCK_SLOT` set to the claimed
/// slot number (spec.md §6) — read from the [`Holder`], not re-parsed out
/// of a file name (spec.md §9 Open Question).
pub fn exec_with_lock(
    opts: AcquireOptions,
    argv: &[String],
    diagnostics: &Diagnostics,
    cancel: &AtomicBool,
) -> Result<ExecOutcome, WaitlockError> {
    let descriptor = opts.descriptor.to_string();
    let holder: Holder = acquire(&opts, diagnostics, cancel)?;

    diagnostics.exec_start(&descriptor, argv);
    let result = run_child(argv, &holder);
    let held_for = holder.held_for();
    holder.release()?;
    diagnostics.released(&descriptor, held_for);

    let exit_code = result?;
    diagnostics.exec_end(&descriptor, exit_code);
    Ok(ExecOutcome { exit_code })
}

fn run_child(argv: &[String], holder: &Holder) -> Result<i32, WaitlockError> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| WaitlockError::Usage("--exec requires a command".into()))?;

    let mut command = Command::new(program);
    command.args(rest);
    command.env("WAITLOCK_SLOT", holder.slot().to_string());
    command.env("WAITLOCK_DESCRIPTOR", holder.descriptor().as_str());

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            WaitlockError::NotFound(format!("{program}: {e}"))
        } else {
            WaitlockError::ExecFailed(format!("{program}: {e}"))
        }
    })?;

    let status = child
        .wait()
        .map_err(|e| WaitlockError::ExecFailed(format!("{program}: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return Ok(128 + signal);
        }
    }
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::descriptor::Descriptor;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn exec_runs_command_under_lock_and_releases() {
        let tmp = TempDir::new().unwrap();
        let opts = AcquireOptions {
            descriptor: Descriptor::new("exec-test").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(200)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let diagnostics = Diagnostics::new(None);
        let cancel = AtomicBool::new(false);
        let argv = vec!["true".to_string()];
        let outcome = exec_with_lock(opts, &argv, &diagnostics, &cancel).unwrap();
        assert_eq!(outcome.exit_code, 0);

        let remaining: Vec<_> = std::fs::read_dir(tmp.path()).unwrap().collect();
        assert!(remaining.is_empty());
    }

    #[test]
    fn exec_missing_executable_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let opts = AcquireOptions {
            descriptor: Descriptor::new("exec-missing").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(200)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let diagnostics = Diagnostics::new(None);
        let cancel = AtomicBool::new(false);
        let argv = vec!["waitlock-definitely-not-a-real-binary".to_string()];
        let err = exec_with_lock(opts, &argv, &diagnostics, &cancel).unwrap_err();
        assert!(matches!(err, WaitlockError::NotFound(_)));
        assert_eq!(err.exit_code(), 127);
    }

    #[test]
    fn exec_propagates_nonzero_child_exit() {
        let tmp = TempDir::new().unwrap();
        let opts = AcquireOptions {
            descriptor: Descriptor::new("exec-fail").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(200)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let diagnostics = Diagnostics::new(None);
        let cancel = AtomicBool::new(false);
        let argv = vec!["false".to_string()];
        let outcome = exec_with_lock(opts, &argv, &diagnostics, &cancel).unwrap();
        assert_eq!(outcome.exit_code, 1);
    }
}
