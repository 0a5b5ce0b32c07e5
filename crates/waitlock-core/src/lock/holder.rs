//! The holder lifecycle (spec.md §4.5): the claimed slot file, held open
//! and `flock`ed for the process's lifetime, released on request or drop.

use std::fs::File;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use super::descriptor::Descriptor;
use crate::error::WaitlockError;

/// A claimed slot. Holding one means this process occupies slot `slot` of
/// `descriptor` until [`Holder::release`] runs or the value is dropped.
pub struct Holder {
    file: Option<File>,
    path: PathBuf,
    slot: u16,
    descriptor: Descriptor,
    claimed_at: Instant,
    released: AtomicBool,
}

impl Holder {
    pub(crate) fn from_claim(file: File, path: PathBuf, slot: u16, descriptor: Descriptor) -> Self {
        #[cfg(unix)]
        {
            // Best-effort advisory flock alongside the rename claim: guards
            // against a second process opening the same inode through a
            // stale path before our claim is visible everywhere.
            use std::os::unix::io::AsRawFd;
            unsafe {
                libc::flock(file.as_raw_fd(), libc::LOCK_EX | libc::LOCK_NB);
            }
        }
        Self {
            file: Some(file),
            path,
            slot,
            descriptor,
            claimed_at: Instant::now(),
            released: AtomicBool::new(false),
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn slot(&self) -> u16 {
        self.slot
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Release the slot: drop the `flock`, close the fd, unlink the file.
    /// Idempotent — calling twice (or after the value already released
    /// itself via Drop) is a no-op.
    pub fn release(mut self) -> Result<(), WaitlockError> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), WaitlockError> {
        if self.released.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.file.take(); // closing the fd drops the flock
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(WaitlockError::Io { path: self.path.clone(), source: e }),
        }
    }

    pub fn held_for(&self) -> std::time::Duration {
        self.claimed_at.elapsed()
    }
}

impl Drop for Holder {
    fn drop(&mut self) {
        let _ = self.release_inner();
    }
}
