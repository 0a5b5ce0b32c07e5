//! Default mode: acquire a slot and hold it until signalled or the process
//! is killed (spec.md §4.10). The common shell idiom is to background this
//! process, do guarded work, then `kill` it (or run `waitlock --done`) to
//! release.

use std::path::PathBuf;
use std::time::Duration;

use waitlock_core::{acquire, AcquireOptions, Descriptor, SignalLayer, WaitlockError};

use crate::env::preferred_slot;

pub fn run(
    descriptor: Descriptor,
    max_holders: u32,
    timeout: Option<Duration>,
    lock_dir: Option<PathBuf>,
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
    let holder = acquire(&opts, diagnostics, &cancel)?;

    while !cancel.load(std::sync::atomic::Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));
    }

    let held_for = holder.held_for();
    let descriptor_name = holder.descriptor().to_string();
    holder.release()?;
    diagnostics.released(&descriptor_name, held_for);

    let signal = signal_layer.last_signal();
    Ok(if signal > 0 { 128 + signal } else { 0 })
}
