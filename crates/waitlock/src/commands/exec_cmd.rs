//! `waitlock --exec`: acquire, run a command under the lock, propagate its
//! exit status (spec.md §4.9).

use std::path::PathBuf;
use std::time::Duration;

use waitlock_core::{exec_with_lock, AcquireOptions, Descriptor, SignalLayer, WaitlockError};

use crate::env::preferred_slot;

pub fn run(
    descriptor: Descriptor,
    max_holders: u32,
    timeout: Option<Duration>,
    lock_dir: Option<PathBuf>,
    argv: &[String],
    diagnostics: &waitlock_core::logging::Diagnostics,
) -> Result<i32, WaitlockError> {
    let signal_layer = SignalLayer::spawn()
        .map_err(|e| WaitlockError::Io { path: PathBuf::from("<signal handler>"), source: e })?;
    let cancel = signal_layer.cancel_flag();

    let opts = AcquireOptions {
        descriptor,
        max_holders,
        timeout,
        preferred_slot: preferred_slot(max_holders)?,
        lock_dir,
    };

    // exec_with_lock spawns and waits for the child itself; register it
    // with the signal layer isn't possible until after spawn, so the
    // forwarding window opens only once the child exists — acceptable
    // since acquisition itself is still interruptible via `cancel`.
    let outcome = exec_with_lock(opts, argv, diagnostics, &cancel)?;
    Ok(outcome.exit_code)
}
