//! Process prober (spec.md §4.3), grounded in
//! `agent_team_mail_daemon::daemon::session_registry::is_pid_alive`.

/// Does a process with this PID exist on this host?
///
/// `pid <= 0` is always `false`. On Unix, `kill(pid, 0)` is used as a
/// read-only existence probe: success or `EPERM` (the process exists but
/// we lack permission to signal it) both count as "exists"; `ESRCH` means
/// it does not. Non-Unix targets conservatively report `false`.
pub fn exists(pid: i64) -> bool {
    if pid <= 0 {
        return false;
    }
    #[cfg(unix)]
    {
        pid_alive_unix(pid as u32)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

#[cfg(unix)]
fn pid_alive_unix(pid: u32) -> bool {
    // SAFETY: kill(pid, 0) is a read-only existence check; no signal is delivered.
    let result = unsafe { libc::kill(pid as libc::pid_t, 0) };
    if result == 0 {
        return true;
    }
    matches!(std::io::Error::last_os_error().raw_os_error(), Some(libc::EPERM))
}

/// Best-effort retrieval of a process's original argument vector as a
/// single space-separated string. Returns `"unknown"` when the OS forbids
/// access (spec.md §4.3); used only for diagnostics embedded in the
/// record, never for correctness.
pub fn cmdline(pid: i64) -> String {
    #[cfg(target_os = "linux")]
    {
        if let Ok(raw) = std::fs::read(format!("/proc/{pid}/cmdline")) {
            let parts: Vec<String> = raw
                .split(|&b| b == 0)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect();
            if !parts.is_empty() {
                return parts.join(" ");
            }
        }
        "unknown".to_string()
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = pid;
        "unknown".to_string()
    }
}
