//! The lock engine: descriptor validation, the wire codec, directory
//! resolution, process liveness, the slot engine, and the operations built
//! on top of it (inspect, signal, exec-supervise).

pub mod codec;
pub mod descriptor;
pub mod dirs;
pub mod exec;
pub mod holder;
pub mod inspector;
pub mod process;
pub mod record;
#[cfg(unix)]
pub mod signal;
pub mod signaller;
pub mod slot;
