//! The slot engine: the acquire algorithm from spec.md §4.4, grounded in
//! the backoff shape of `atm_core::io::lock::acquire_lock` and the
//! directory-scan/rotation shape of `original_source/src/lock/lock.c`.

use std::fs::{self, OpenOptions};
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use rand::Rng;

use super::codec::{compute_checksum, decode_any};
use super::descriptor::Descriptor;
use super::dirs;
use super::holder::Holder;
use super::process;
use super::record::LockRecord;
use crate::error::WaitlockError;
use crate::logging::Diagnostics;

/// First retry delay (spec.md §4.4), matching the teacher's file-lock backoff.
const INITIAL_WAIT_MS: u64 = 50;
/// Backoff ceiling; doubled each attempt and clamped here.
const MAX_WAIT_MS: u64 = 800;

/// Parameters for a single [`acquire`] call.
pub struct AcquireOptions {
    pub descriptor: Descriptor,
    pub max_holders: u32,
    pub timeout: Option<Duration>,
    pub preferred_slot: Option<u16>,
    pub lock_dir: Option<PathBuf>,
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn local_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Read and validate whatever is at `path`. `Ok(None)` means the slot is
/// free to claim outright (absent, stale, or corrupt and already cleared);
/// `Ok(Some(record))` means a live holder occupies it.
fn inspect_slot(
    path: &Path,
    slot: u16,
    descriptor: &str,
    diagnostics: &Diagnostics,
) -> Result<Option<LockRecord>, WaitlockError> {
    let bytes = match fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(WaitlockError::Io { path: path.to_path_buf(), source: e }),
    };

    let record = match decode_any(&bytes) {
        Ok(r) if compute_checksum(&r) == r.checksum => r,
        _ => {
            let _ = fs::remove_file(path);
            diagnostics.corrupt_cleanup(descriptor, slot);
            return Ok(None);
        }
    };

    if !process::exists(record.pid as i64) {
        let _ = fs::remove_file(path);
        diagnostics.stale_cleanup(descriptor, slot, record.pid);
        return Ok(None);
    }

    Ok(Some(record))
}

/// Attempt to claim `path` by writing a fresh record to a unique temp file
/// and renaming it into place — the sole durable coordination primitive
/// (spec.md §2). Returns the claimed [`Holder`] on success, or `None` if a
/// concurrent claimant won the race (detected by re-reading the target and
/// finding a different PID than ours after the rename).
fn try_claim(
    dir: &Path,
    path: &Path,
    slot: u16,
    opts: &AcquireOptions,
) -> Result<Option<Holder>, WaitlockError> {
    if path.exists() {
        return Ok(None);
    }

    let pid = std::process::id();
    let mut record = LockRecord::new(
        opts.descriptor.as_str(),
        opts.max_holders,
        pid,
        parent_pid(),
        unsafe_getuid(),
        local_hostname(),
        process::cmdline(pid as i64),
    );
    record.slot = slot as u32;
    record.acquired_at = now_unix();
    record.checksum = compute_checksum(&record);

    let unique: u32 = rand::thread_rng().gen();
    let tmp_path = dir.join(format!(".tmp.{pid}.{unique}.{}", path.file_name().unwrap().to_string_lossy()));
    {
        let mut tmp = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
            .map_err(|e| WaitlockError::Io { path: tmp_path.clone(), source: e })?;
        tmp.write_all(&super::codec::encode_binary(&record))
            .map_err(|e| WaitlockError::Io { path: tmp_path.clone(), source: e })?;
        tmp.sync_all().map_err(|e| WaitlockError::Io { path: tmp_path.clone(), source: e })?;
    }

    if path.exists() {
        let _ = fs::remove_file(&tmp_path);
        return Ok(None);
    }

    if let Err(e) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(WaitlockError::Io { path: path.to_path_buf(), source: e });
    }

    // Re-read to detect a lost race: rename() has no O_EXCL equivalent, so
    // the last of two concurrent renames to the same path wins silently.
    let bytes = fs::read(path).map_err(|e| WaitlockError::Io { path: path.to_path_buf(), source: e })?;
    let on_disk = decode_any(&bytes).ok();
    if on_disk.as_ref().map(|r| r.pid) != Some(pid) {
        return Ok(None);
    }

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(|e| WaitlockError::Io { path: path.to_path_buf(), source: e })?;

    Ok(Some(Holder::from_claim(file, path.to_path_buf(), slot, opts.descriptor.clone())))
}

#[cfg(unix)]
fn unsafe_getuid() -> u32 {
    // SAFETY: getuid() takes no arguments and cannot fail.
    unsafe { libc::getuid() }
}
#[cfg(not(unix))]
fn unsafe_getuid() -> u32 {
    0
}

#[cfg(unix)]
fn parent_pid() -> u32 {
    std::os::unix::process::parent_id()
}
#[cfg(not(unix))]
fn parent_pid() -> u32 {
    0
}

fn backoff_delay(attempt: u32) -> Duration {
    let ms = INITIAL_WAIT_MS.saturating_mul(1u64 << attempt.min(8)).min(MAX_WAIT_MS);
    let jitter = rand::thread_rng().gen_range(0..=ms / 4 + 1);
    Duration::from_millis(ms + jitter)
}

/// Acquire one slot of `opts.descriptor`, blocking (with backoff) until a
/// slot frees up or `opts.timeout` elapses. `cancel` is polled once per
/// pass so a signal handler can abort an in-progress wait (spec.md §4.10).
pub fn acquire(
    opts: &AcquireOptions,
    diagnostics: &Diagnostics,
    cancel: &AtomicBool,
) -> Result<Holder, WaitlockError> {
    let dir = dirs::resolve(opts.lock_dir.as_deref())?;
    let start = Instant::now();
    let mut attempt = 0u32;
    let start_slot = opts.preferred_slot.unwrap_or(0) % opts.max_holders.max(1) as u16;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(WaitlockError::Cancelled { descriptor: opts.descriptor.to_string() });
        }

        for offset in 0..opts.max_holders as u16 {
            let slot = (start_slot + offset) % opts.max_holders as u16;
            let path = dir.join(opts.descriptor.slot_file_name(slot));

            match inspect_slot(&path, slot, opts.descriptor.as_str(), diagnostics)? {
                Some(existing) if existing.max_holders != opts.max_holders => {
                    return Err(WaitlockError::CapacityMismatch {
                        descriptor: opts.descriptor.to_string(),
                        requested: opts.max_holders,
                        existing: existing.max_holders,
                    });
                }
                Some(existing) => {
                    diagnostics.contention(opts.descriptor.as_str(), existing.pid);
                }
                None => {
                    if let Some(holder) = try_claim(&dir, &path, slot, opts)? {
                        diagnostics.acquired(
                            opts.descriptor.as_str(),
                            Some(slot),
                            &process::cmdline(std::process::id() as i64),
                        );
                        return Ok(holder);
                    }
                }
            }
        }

        let mut wait = backoff_delay(attempt);
        if let Some(timeout) = opts.timeout {
            let elapsed = start.elapsed();
            if elapsed >= timeout {
                diagnostics.timeout(opts.descriptor.as_str(), elapsed);
                return Err(WaitlockError::Timeout {
                    descriptor: opts.descriptor.to_string(),
                    elapsed_secs: elapsed.as_secs_f64(),
                });
            }
            // spec.md §4.4: sleep(min(wait, remaining_timeout * 0.9)) keeps
            // the final timeout check within the documented [T, T*1.1] slack
            // instead of overshooting by a whole backoff step.
            let remaining = timeout - elapsed;
            wait = wait.min(remaining.mul_f64(0.9));
        }

        std::thread::sleep(wait);
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn diag() -> Diagnostics {
        Diagnostics::new(None)
    }

    #[test]
    fn mutex_acquire_then_contention_then_release_unblocks() {
        let tmp = TempDir::new().unwrap();
        let opts = AcquireOptions {
            descriptor: Descriptor::new("s1").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(200)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel = AtomicBool::new(false);
        let holder = acquire(&opts, &diag(), &cancel).unwrap();

        let opts2 = AcquireOptions {
            descriptor: Descriptor::new("s1").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(150)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel2 = AtomicBool::new(false);
        assert!(matches!(
            acquire(&opts2, &diag(), &cancel2),
            Err(WaitlockError::Timeout { .. })
        ));

        holder.release().unwrap();
        let cancel3 = AtomicBool::new(false);
        let holder2 = acquire(&opts2, &diag(), &cancel3).unwrap();
        holder2.release().unwrap();
    }

    #[test]
    fn semaphore_allows_up_to_n_holders() {
        let tmp = TempDir::new().unwrap();
        let make = || AcquireOptions {
            descriptor: Descriptor::new("sem").unwrap(),
            max_holders: 2,
            timeout: Some(Duration::from_millis(100)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel = AtomicBool::new(false);
        let h1 = acquire(&make(), &diag(), &cancel).unwrap();
        let h2 = acquire(&make(), &diag(), &cancel).unwrap();
        assert!(acquire(&make(), &diag(), &cancel).is_err());
        h1.release().unwrap();
        h2.release().unwrap();
    }

    #[test]
    fn capacity_mismatch_is_rejected() {
        let tmp = TempDir::new().unwrap();
        let cancel = AtomicBool::new(false);
        let opts1 = AcquireOptions {
            descriptor: Descriptor::new("cap").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_millis(100)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let holder = acquire(&opts1, &diag(), &cancel).unwrap();

        let opts2 = AcquireOptions {
            descriptor: Descriptor::new("cap").unwrap(),
            max_holders: 3,
            timeout: Some(Duration::from_millis(100)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        assert!(matches!(
            acquire(&opts2, &diag(), &cancel),
            Err(WaitlockError::CapacityMismatch { .. })
        ));
        holder.release().unwrap();
    }

    #[test]
    fn stale_holder_record_is_reclaimed() {
        let tmp = TempDir::new().unwrap();
        let descriptor = Descriptor::new("stale").unwrap();
        let path = tmp.path().join(descriptor.slot_file_name(0));
        let mut dead = LockRecord::new("stale", 1, 999_999, 1, 0, "h".into(), "x".into());
        dead.acquired_at = now_unix();
        dead.checksum = compute_checksum(&dead);
        fs::write(&path, super::super::codec::encode_binary(&dead)).unwrap();

        let opts = AcquireOptions {
            descriptor,
            max_holders: 1,
            timeout: Some(Duration::from_millis(200)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel = AtomicBool::new(false);
        let holder = acquire(&opts, &diag(), &cancel).unwrap();
        holder.release().unwrap();
    }

    #[test]
    fn cancellation_flag_aborts_wait() {
        let tmp = TempDir::new().unwrap();
        let opts = AcquireOptions {
            descriptor: Descriptor::new("cancel-me").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_secs(5)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel = AtomicBool::new(false);
        let _holder = acquire(&opts, &diag(), &cancel).unwrap();

        let opts2 = AcquireOptions {
            descriptor: Descriptor::new("cancel-me").unwrap(),
            max_holders: 1,
            timeout: Some(Duration::from_secs(5)),
            preferred_slot: None,
            lock_dir: Some(tmp.path().to_path_buf()),
        };
        let cancel2 = AtomicBool::new(true);
        assert!(matches!(
            acquire(&opts2, &diag(), &cancel2),
            Err(WaitlockError::Cancelled { .. })
        ));
    }
}
