//! `waitlock --check`: report busy/available without acquiring.

use std::path::Path;

use waitlock_core::{check, CheckOutcome, Descriptor, WaitlockError};

pub fn run(
    descriptor: &Descriptor,
    lock_dir: Option<&Path>,
    diagnostics: &waitlock_core::logging::Diagnostics,
) -> Result<i32, WaitlockError> {
    match check(descriptor, lock_dir, diagnostics)? {
        CheckOutcome::Available => {
            eprintln!("{descriptor}: available");
            Ok(0)
        }
        CheckOutcome::Busy => {
            eprintln!("{descriptor}: busy");
            Ok(1)
        }
    }
}
