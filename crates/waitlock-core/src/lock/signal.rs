//! The signal layer (spec.md §4.10, §9 Open Question on delivery): a
//! dedicated thread draining `SIGHUP`/`SIGINT`/`SIGTERM`/`SIGQUIT` via
//! `signal-hook`'s iterator, grounded in
//! `leynos_weaver::process`'s `Signals::forever()` loop.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;

/// Shared signal state threaded through a wait or exec-supervision call.
///
/// With no child registered, a caught signal sets [`SignalLayer::cancel`]
/// so an in-progress [`crate::lock::slot::acquire`] wait aborts at its next
/// pass. With a child registered (`--exec`), the signal is forwarded to
/// the child instead of cancelling our own wait, since the lock is already
/// held and the right thing is to let the child decide how to shut down.
pub struct SignalLayer {
    cancel: Arc<AtomicBool>,
    child_pid: Arc<AtomicI32>,
    last_signal: Arc<AtomicI32>,
    _handle: JoinHandle<()>,
}

impl SignalLayer {
    /// Install the handler and start the draining thread. `SIGPIPE` is
    /// deliberately left untouched (spec.md §4.10) — a broken pipe on
    /// stdout/stderr should terminate us the default way.
    pub fn spawn() -> std::io::Result<Self> {
        let mut signals = Signals::new([SIGHUP, SIGINT, SIGTERM, SIGQUIT])?;
        let cancel = Arc::new(AtomicBool::new(false));
        let child_pid = Arc::new(AtomicI32::new(0));
        let last_signal = Arc::new(AtomicI32::new(0));

        let cancel_for_thread = cancel.clone();
        let child_pid_for_thread = child_pid.clone();
        let last_signal_for_thread = last_signal.clone();
        let handle = std::thread::spawn(move || {
            for signal in signals.forever() {
                let pid = child_pid_for_thread.load(Ordering::SeqCst);
                if pid > 0 {
                    forward_to_child(pid, signal);
                } else {
                    last_signal_for_thread.store(signal, Ordering::SeqCst);
                    cancel_for_thread.store(true, Ordering::SeqCst);
                }
            }
        });

        Ok(Self { cancel, child_pid, last_signal, _handle: handle })
    }

    /// Flag polled by the slot engine's wait loop.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// The signal number that set [`Self::cancel_flag`], or `0` if none has
    /// fired yet. Used by the default acquire-and-hold mode to compute the
    /// `128 + S` exit code (spec.md §6).
    pub fn last_signal(&self) -> i32 {
        self.last_signal.load(Ordering::SeqCst)
    }

    /// Register the supervised child so future signals forward to it
    /// instead of cancelling our wait (spec.md §4.8/§4.10).
    pub fn set_child(&self, pid: u32) {
        self.child_pid.store(pid as i32, Ordering::SeqCst);
    }

    pub fn clear_child(&self) {
        self.child_pid.store(0, Ordering::SeqCst);
    }
}

#[cfg(unix)]
fn forward_to_child(pid: i32, signal: i32) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    if let Ok(sig) = Signal::try_from(signal) {
        let _ = kill(Pid::from_raw(pid), sig);
    }
}

#[cfg(not(unix))]
fn forward_to_child(_pid: i32, _signal: i32) {}
