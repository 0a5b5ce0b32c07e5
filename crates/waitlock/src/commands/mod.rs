//! CLI flag surface and dispatch (spec.md §6).

use std::io::Read as _;
use std::path::PathBuf;

use clap::{ArgGroup, Parser};

mod acquire;
mod check;
mod done;
mod exec_cmd;
mod list;
mod selftest;

use waitlock_core::{logging, WaitlockError};

/// Cross-process advisory locking: mutex/semaphore coordination over the
/// local filesystem.
#[derive(Parser, Debug)]
#[command(
    name = "waitlock",
    version,
    about = "Cross-process advisory locking over the local filesystem",
    group(ArgGroup::new("mode").args(["check", "list", "done", "exec", "test"]))
)]
pub struct Cli {
    /// Name of the resource to lock. May be omitted if a single line is
    /// piped in on standard input.
    descriptor: Option<String>,

    /// Test whether the lock is currently held, without acquiring it.
    #[arg(long)]
    check: bool,

    /// List all active (and, with --all, stale) locks.
    #[arg(short = 'l', long)]
    list: bool,

    /// Signal the current holder(s) of the lock to release it.
    #[arg(long)]
    done: bool,

    /// Run the built-in smoke-test suite against a scratch lock directory.
    #[arg(long)]
    test: bool,

    /// Run CMD (and its arguments) while holding the lock; exit with its
    /// status. Everything after this flag is passed to the child.
    #[arg(short = 'e', long, num_args = 1.., allow_hyphen_values = true, value_name = "CMD")]
    exec: Option<Vec<String>>,

    /// Semaphore capacity: number of concurrent holders allowed.
    #[arg(short = 'm', long = "allowMultiple", value_name = "N")]
    allow_multiple: Option<u32>,

    /// Claim one slot per available CPU (minus --excludeCPUs).
    #[arg(short = 'c', long = "onePerCPU")]
    one_per_cpu: bool,

    /// CPUs to exclude when computing --onePerCPU capacity.
    #[arg(short = 'x', long = "excludeCPUs", value_name = "N", default_value_t = 0)]
    exclude_cpus: u32,

    /// Seconds to wait for the lock. Negative means wait forever; zero
    /// means try once and fail immediately if busy.
    #[arg(short = 't', long, value_name = "SECS")]
    timeout: Option<f64>,

    /// Directory to use for lock files, overriding the default search.
    #[arg(short = 'd', long = "lock-dir", value_name = "DIR")]
    lock_dir: Option<PathBuf>,

    /// Suppress all but usage-error output.
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Emit debug traces to standard error.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Also emit lifecycle events to syslog.
    #[arg(long)]
    syslog: bool,

    /// Syslog facility to use with --syslog (e.g. "daemon", "local0").
    #[arg(long = "syslog-facility", value_name = "FAC", default_value = "user")]
    syslog_facility: String,

    /// Output format for --list.
    #[arg(short = 'f', long, value_name = "FMT", default_value = "human")]
    format: String,

    /// Include stale (dead-holder) locks in --list output.
    #[arg(short = 'a', long)]
    all: bool,

    /// With --list, show only stale locks.
    #[arg(long = "stale-only")]
    stale_only: bool,
}

impl Cli {
    pub fn execute(self) -> Result<i32, WaitlockError> {
        logging::init(self.quiet, self.verbose);
        let facility = if self.syslog {
            logging::parse_facility(&self.syslog_facility)
        } else {
            None
        };
        let diagnostics = logging::Diagnostics::new(facility);
        let lock_dir = self
            .lock_dir
            .clone()
            .or_else(|| std::env::var_os("WAITLOCK_DIR").map(PathBuf::from));

        if self.test {
            return selftest::run(&diagnostics);
        }
        if self.list {
            let format = list::OutputFormat::parse(&self.format)?;
            return list::run(lock_dir.as_deref(), self.all, self.stale_only, format, &diagnostics);
        }

        let descriptor = self.resolve_descriptor()?;
        let max_holders = crate::cpu::effective_capacity(
            self.one_per_cpu,
            self.exclude_cpus,
            self.allow_multiple,
        )?;
        let timeout_secs = self.timeout.or_else(|| {
            std::env::var("WAITLOCK_TIMEOUT").ok().and_then(|v| v.parse::<f64>().ok())
        });
        let timeout = timeout_secs.and_then(seconds_to_duration_or_unbounded);

        if self.check {
            return check::run(&descriptor, lock_dir.as_deref(), &diagnostics);
        }
        if self.done {
            return done::run(&descriptor, lock_dir.as_deref());
        }
        if let Some(argv) = self.exec {
            return exec_cmd::run(descriptor, max_holders, timeout, lock_dir, &argv, &diagnostics);
        }

        acquire::run(descriptor, max_holders, timeout, lock_dir, &diagnostics)
    }

    /// Positional argument, or (if absent) one line from standard input
    /// (spec.md §6). Not required at all for `--list`/`--test`.
    fn resolve_descriptor(&self) -> Result<waitlock_core::Descriptor, WaitlockError> {
        let raw = match &self.descriptor {
            Some(d) => d.clone(),
            None => {
                let mut line = String::new();
                std::io::stdin()
                    .read_to_string(&mut line)
                    .map_err(|e| WaitlockError::Io { path: PathBuf::from("<stdin>"), source: e })?;
                line.lines().next().unwrap_or_default().to_string()
            }
        };
        waitlock_core::Descriptor::new(raw)
    }
}

/// `None` timeout means negative (wait forever); `Some(0)` still expresses
/// attempt-once semantics in the slot engine's own timeout check.
fn seconds_to_duration_or_unbounded(secs: f64) -> Option<std::time::Duration> {
    if secs < 0.0 {
        None
    } else {
        Some(std::time::Duration::from_secs_f64(secs))
    }
}
