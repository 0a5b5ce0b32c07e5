//! `--list` output rendering: human, CSV, and NUL-delimited formats
//! (spec.md §6).

use waitlock_core::{LockRow, LockStatus};

pub fn human(rows: &[LockRow]) -> String {
    let mut out = String::from("DESCRIPTOR           PID     SLOT  USER      ACQUIRED             COMMAND\n");
    for row in rows {
        let slot = if row.max_holders <= 1 { "-".to_string() } else { row.slot.to_string() };
        let prefix = if row.status == LockStatus::Stale { "[STALE] " } else { "" };
        out.push_str(&format!(
            "{prefix}{:<20} {:<7} {:<5} {:<9} {:<20} {}\n",
            row.descriptor, row.pid, slot, row.uid, row.acquired_at, row.cmdline,
        ));
    }
    out
}

pub fn csv(rows: &[LockRow]) -> String {
    let mut out = String::from("descriptor,pid,slot,user,acquired,status,command\n");
    for row in rows {
        let status = if row.status == LockStatus::Stale { "stale" } else { "active" };
        out.push_str(&format!(
            "{},{},{},{},{},{},{}\n",
            row.descriptor, row.pid, row.slot, row.uid, row.acquired_at, status, row.cmdline,
        ));
    }
    out
}

/// NUL-delimited: each field terminated by `\0`, each record by an extra
/// `\0`, for scripts that need unambiguous parsing of arbitrary command
/// lines.
pub fn null(rows: &[LockRow]) -> Vec<u8> {
    let mut out = Vec::new();
    for row in rows {
        let status = if row.status == LockStatus::Stale { "stale" } else { "active" };
        for field in [
            row.descriptor.as_str(),
            &row.pid.to_string(),
            &row.slot.to_string(),
            &row.uid.to_string(),
            &row.acquired_at.to_string(),
            status,
            row.cmdline.as_str(),
        ] {
            out.extend_from_slice(field.as_bytes());
            out.push(0);
        }
        out.push(0);
    }
    out
}
