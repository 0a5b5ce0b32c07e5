//! `waitlock --test`: a runtime smoke test against a scratch lock
//! directory, standing in for the original's embedded unit-test runner
//! (`original_source/src/core/core.c`'s `--test` / `run_unit_tests`).
//! The real regression coverage lives in `cargo test`; this exists so the
//! installed binary can self-check without a toolchain.

use std::sync::atomic::AtomicBool;
use std::time::Duration;

use waitlock_core::{acquire, AcquireOptions, Descriptor, WaitlockError};

pub fn run(diagnostics: &waitlock_core::logging::Diagnostics) -> Result<i32, WaitlockError> {
    let scratch = std::env::temp_dir().join(format!("waitlock-selftest-{}", std::process::id()));
    std::fs::create_dir_all(&scratch)
        .map_err(|e| WaitlockError::Io { path: scratch.clone(), source: e })?;

    let result = run_checks(&scratch, diagnostics);
    let _ = std::fs::remove_dir_all(&scratch);

    match result {
        Ok(()) => {
            eprintln!("waitlock --test: PASS");
            Ok(0)
        }
        Err(e) => {
            eprintln!("waitlock --test: FAIL ({e})");
            Ok(1)
        }
    }
}

fn run_checks(scratch: &std::path::Path, diagnostics: &waitlock_core::logging::Diagnostics) -> Result<(), WaitlockError> {
    let descriptor = Descriptor::new("selftest")?;
    let cancel = AtomicBool::new(false);

    let opts = AcquireOptions {
        descriptor: descriptor.clone(),
        max_holders: 1,
        timeout: Some(Duration::from_millis(500)),
        preferred_slot: None,
        lock_dir: Some(scratch.to_path_buf()),
    };
    let holder = acquire(&opts, diagnostics, &cancel)?;

    let contended = AcquireOptions {
        descriptor: descriptor.clone(),
        max_holders: 1,
        timeout: Some(Duration::from_millis(100)),
        preferred_slot: None,
        lock_dir: Some(scratch.to_path_buf()),
    };
    if acquire(&contended, diagnostics, &cancel).is_ok() {
        return Err(WaitlockError::Usage(
            "second acquire of an already-held mutex unexpectedly succeeded".into(),
        ));
    }

    holder.release()?;

    let reacquire = AcquireOptions {
        descriptor,
        max_holders: 1,
        timeout: Some(Duration::from_millis(200)),
        preferred_slot: None,
        lock_dir: Some(scratch.to_path_buf()),
    };
    let holder2 = acquire(&reacquire, diagnostics, &cancel)?;
    holder2.release()?;

    Ok(())
}
