//! `waitlock --done`: signal the current holder(s) to release.

use std::path::Path;

use waitlock_core::{done, Descriptor, DoneOutcome, WaitlockError};

pub fn run(descriptor: &Descriptor, lock_dir: Option<&Path>) -> Result<i32, WaitlockError> {
    match done(descriptor, lock_dir)? {
        DoneOutcome::Signalled => {
            eprintln!("{descriptor}: signalled");
            Ok(0)
        }
        DoneOutcome::NotFound => {
            eprintln!("{descriptor}: not held");
            Ok(127)
        }
    }
}
