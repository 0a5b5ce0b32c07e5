//! Non-claiming inspection: `check` and `list` (spec.md §4.6).

use std::fs;
use std::path::Path;

use super::codec::{compute_checksum, decode_any};
use super::descriptor::Descriptor;
use super::dirs;
use super::process;
use super::record::LockRecord;
use crate::error::WaitlockError;
use crate::logging::Diagnostics;

/// Result of a `check` call: is the descriptor currently busy?
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    Available,
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockStatus {
    Live,
    Stale,
}

/// One row of `list` output (spec.md §6).
#[derive(Debug, Clone)]
pub struct LockRow {
    pub descriptor: String,
    pub slot: u16,
    pub max_holders: u32,
    pub pid: u32,
    pub uid: u32,
    pub status: LockStatus,
    pub acquired_at: u64,
    pub held_secs: u64,
    pub cmdline: String,
}

fn slot_files(dir: &Path) -> Result<Vec<std::path::PathBuf>, WaitlockError> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(WaitlockError::Io { path: dir.to_path_buf(), source: e }),
    };
    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| WaitlockError::Io { path: dir.to_path_buf(), source: e })?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.contains(".slot") && name.ends_with(".lock") {
            paths.push(entry.path());
        }
    }
    paths.sort();
    Ok(paths)
}

/// Read and validate the record at `path`, unlinking it if the checksum
/// doesn't match — corrupt records are never reported as live.
fn read_record(path: &Path) -> Option<LockRecord> {
    let bytes = fs::read(path).ok()?;
    match decode_any(&bytes) {
        Ok(r) if compute_checksum(&r) == r.checksum => Some(r),
        _ => {
            let _ = fs::remove_file(path);
            None
        }
    }
}

/// Is `descriptor` currently at capacity? Busy iff the number of live
/// holders across its slots has reached the declared `max_holders`
/// (`original_source/src/lock/lock.c`'s `active_locks >= max_holders`), not
/// merely "at least one slot is held" — a semaphore with spare capacity is
/// still available. Stale entries are left for [`list`] to reclaim; corrupt
/// ones are unlinked here as they're found.
pub fn check(
    descriptor: &Descriptor,
    lock_dir: Option<&Path>,
    diagnostics: &Diagnostics,
) -> Result<CheckOutcome, WaitlockError> {
    let dir = dirs::resolve(lock_dir)?;
    let prefix = descriptor.file_prefix();
    let mut live = 0u32;
    let mut max_holders = 1u32;

    for path in slot_files(&dir)? {
        let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
        if !name.starts_with(&prefix) {
            continue;
        }
        let Some(record) = read_record(&path) else { continue };
        if process::exists(record.pid as i64) {
            live += 1;
            max_holders = record.max_holders.max(1);
        }
    }

    let busy = live >= max_holders;
    diagnostics.check_result(descriptor.as_str(), busy);
    Ok(if busy { CheckOutcome::Busy } else { CheckOutcome::Available })
}

/// List every held slot across every descriptor in the lock directory,
/// reclaiming stale or corrupt entries as it goes (spec.md §4.6, §6).
pub fn list(lock_dir: Option<&Path>, diagnostics: &Diagnostics) -> Result<Vec<LockRow>, WaitlockError> {
    let dir = dirs::resolve(lock_dir)?;
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut rows = Vec::new();
    for path in slot_files(&dir)? {
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(_) => continue,
        };
        let record = match decode_any(&bytes) {
            Ok(r) if compute_checksum(&r) == r.checksum => r,
            _ => {
                let _ = fs::remove_file(&path);
                continue;
            }
        };

        let status = if process::exists(record.pid as i64) {
            LockStatus::Live
        } else {
            let _ = fs::remove_file(&path);
            diagnostics.stale_cleanup(&record.descriptor, record.slot as u16, record.pid);
            LockStatus::Stale
        };

        if status == LockStatus::Stale {
            continue;
        }

        rows.push(LockRow {
            descriptor: record.descriptor.clone(),
            slot: record.slot as u16,
            max_holders: record.max_holders,
            pid: record.pid,
            uid: record.uid,
            status,
            acquired_at: record.acquired_at,
            held_secs: now.saturating_sub(record.acquired_at),
            cmdline: record.cmdline.clone(),
        });
    }
    Ok(rows)
}
