//! waitlock-core: cross-process advisory locking over a shared filesystem directory.
//!
//! A descriptor names a lockable resource; a caller claims one of its
//! `max_holders` slots (mutex when `max_holders == 1`, counted semaphore
//! otherwise), holds it until release or process exit, and other processes
//! can inspect (`check`, `list`) or request release (`done`) without
//! acquiring.

pub mod error;
pub mod home;
pub mod lock;
pub mod logging;

pub use error::WaitlockError;
pub use lock::descriptor::Descriptor;
pub use lock::exec::{exec_with_lock, ExecOutcome};
pub use lock::holder::Holder;
pub use lock::inspector::{check, list, CheckOutcome, LockRow, LockStatus};
pub use lock::record::{LockRecord, LockType};
#[cfg(unix)]
pub use lock::signal::SignalLayer;
pub use lock::signaller::{done, DoneOutcome};
pub use lock::slot::{acquire, AcquireOptions};
