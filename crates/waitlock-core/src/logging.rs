//! Structured diagnostics: a stderr `tracing` subscriber plus an optional
//! syslog sink for the lifecycle events listed in spec.md §6.

use std::sync::OnceLock;
use std::time::Duration;

use syslog::Facility;
use tracing::Level;

static INIT: OnceLock<()> = OnceLock::new();

fn env_flag_set(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

/// Resolve the stderr trace level from `--quiet` / `--verbose` and
/// `WAITLOCK_DEBUG` (spec.md §6, §7).
fn resolve_level(quiet: bool, verbose: bool) -> Level {
    if quiet {
        Level::ERROR
    } else if verbose || env_flag_set("WAITLOCK_DEBUG") {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Initialize the stderr `tracing` subscriber.
///
/// Safe to call multiple times; only the first call installs the
/// subscriber, matching the teacher's `OnceLock`-guarded `init()`.
pub fn init(quiet: bool, verbose: bool) {
    if INIT.get().is_some() {
        return;
    }
    let level = resolve_level(quiet, verbose);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
    let _ = INIT.set(());
}

/// Parse a syslog facility name (`"user"`, `"daemon"`, `"local0"`..`"local7"`, ...).
pub fn parse_facility(name: &str) -> Option<Facility> {
    Facility::from_str(&name.to_ascii_lowercase()).ok()
}

trait FacilityFromStr: Sized {
    fn from_str(s: &str) -> Result<Self, ()>;
}

impl FacilityFromStr for Facility {
    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "kern" => Ok(Facility::LOG_KERN),
            "user" => Ok(Facility::LOG_USER),
            "mail" => Ok(Facility::LOG_MAIL),
            "daemon" => Ok(Facility::LOG_DAEMON),
            "auth" => Ok(Facility::LOG_AUTH),
            "syslog" => Ok(Facility::LOG_SYSLOG),
            "lpr" => Ok(Facility::LOG_LPR),
            "news" => Ok(Facility::LOG_NEWS),
            "uucp" => Ok(Facility::LOG_UUCP),
            "cron" => Ok(Facility::LOG_CRON),
            "authpriv" => Ok(Facility::LOG_AUTHPRIV),
            "ftp" => Ok(Facility::LOG_FTP),
            "local0" => Ok(Facility::LOG_LOCAL0),
            "local1" => Ok(Facility::LOG_LOCAL1),
            "local2" => Ok(Facility::LOG_LOCAL2),
            "local3" => Ok(Facility::LOG_LOCAL3),
            "local4" => Ok(Facility::LOG_LOCAL4),
            "local5" => Ok(Facility::LOG_LOCAL5),
            "local6" => Ok(Facility::LOG_LOCAL6),
            "local7" => Ok(Facility::LOG_LOCAL7),
            _ => Err(()),
        }
    }
}

/// Structured lifecycle logging, with an optional syslog sink.
///
/// One instance is built by the CLI dispatcher and threaded through to the
/// operations in [`crate::lock`] that need to report a lifecycle event
/// (spec.md §2 "Diagnostics", §6 "System log"). Each event is always
/// emitted via `tracing`; it is additionally sent to syslog when enabled.
pub struct Diagnostics {
    facility: Option<Facility>,
}

impl Diagnostics {
    /// `facility` is `None` to disable the syslog sink entirely.
    pub fn new(facility: Option<Facility>) -> Self {
        Self { facility }
    }

    fn logger(&self) -> Option<syslog::Logger<syslog::LoggerBackend, syslog::Formatter3164>> {
        let facility = self.facility?;
        let formatter = syslog::Formatter3164 {
            facility,
            hostname: None,
            process: "waitlock".into(),
            pid: std::process::id(),
        };
        syslog::unix(formatter).ok()
    }

    fn syslog_info(&self, message: String) {
        if let Some(mut logger) = self.logger() {
            let _ = logger.info(message);
        }
    }

    fn syslog_warning(&self, message: String) {
        if let Some(mut logger) = self.logger() {
            let _ = logger.warning(message);
        }
    }

    fn syslog_debug(&self, message: String) {
        if let Some(mut logger) = self.logger() {
            let _ = logger.debug(message);
        }
    }

    pub fn acquired(&self, descriptor: &str, slot: Option<u16>, cmdline: &str) {
        tracing::info!(descriptor, ?slot, cmdline, "lock acquired");
        let msg = match slot {
            Some(s) => format!("acquired lock '{descriptor}' slot {s} for '{cmdline}'"),
            None => format!("acquired lock '{descriptor}' for '{cmdline}'"),
        };
        self.syslog_info(msg);
    }

    pub fn released(&self, descriptor: &str, held: Duration) {
        tracing::info!(descriptor, held_ms = held.as_millis() as u64, "lock released");
        self.syslog_info(format!(
            "released lock '{descriptor}' after {:.1}s",
            held.as_secs_f64()
        ));
    }

    pub fn timeout(&self, descriptor: &str, elapsed: Duration) {
        tracing::warn!(descriptor, elapsed_secs = elapsed.as_secs_f64(), "lock timeout");
        self.syslog_warning(format!(
            "timeout waiting for lock '{descriptor}' after {:.1} seconds",
            elapsed.as_secs_f64()
        ));
    }

    pub fn contention(&self, descriptor: &str, holder_pid: u32) {
        tracing::debug!(descriptor, holder_pid, "lock contended");
        self.syslog_debug(format!("lock '{descriptor}' held by pid {holder_pid}"));
    }

    pub fn stale_cleanup(&self, descriptor: &str, slot: u16, dead_pid: u32) {
        tracing::info!(descriptor, slot, dead_pid, "removed stale lock");
        self.syslog_info(format!(
            "removed stale lock slot {slot} (pid {dead_pid} no longer exists)"
        ));
    }

    pub fn corrupt_cleanup(&self, descriptor: &str, slot: u16) {
        tracing::warn!(descriptor, slot, "removed corrupt lock record");
        self.syslog_warning(format!(
            "removed corrupt lock record for '{descriptor}' slot {slot}"
        ));
    }

    pub fn check_result(&self, descriptor: &str, busy: bool) {
        tracing::debug!(descriptor, busy, "check result");
        self.syslog_debug(format!(
            "check '{descriptor}': {}",
            if busy { "busy" } else { "available" }
        ));
    }

    pub fn exec_start(&self, descriptor: &str, argv: &[String]) {
        tracing::info!(descriptor, argv = argv.join(" "), "exec start");
        self.syslog_info(format!("exec-start '{descriptor}': {}", argv.join(" ")));
    }

    pub fn exec_end(&self, descriptor: &str, status: i32) {
        tracing::info!(descriptor, status, "exec end");
        self.syslog_info(format!("exec-end '{descriptor}': status {status}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_resolution_precedence() {
        assert_eq!(resolve_level(true, true), Level::ERROR);
        assert_eq!(resolve_level(false, true), Level::DEBUG);
        assert_eq!(resolve_level(false, false), Level::INFO);
    }

    #[test]
    fn facility_parsing() {
        assert!(matches!(parse_facility("local0"), Some(Facility::LOG_LOCAL0)));
        assert!(matches!(parse_facility("daemon"), Some(Facility::LOG_DAEMON)));
        assert!(parse_facility("not-a-facility").is_none());
    }

    #[test]
    fn diagnostics_without_syslog_does_not_panic() {
        let diag = Diagnostics::new(None);
        diag.acquired("d", Some(0), "sleep 1");
        diag.released("d", Duration::from_secs(1));
        diag.timeout("d", Duration::from_secs(5));
        diag.check_result("d", true);
    }
}
