//! Environment variables consumed directly by the CLI (spec.md §6):
//! `WAITLOCK_SLOT`, the caller's preferred slot index.

use waitlock_core::WaitlockError;

/// Parse `WAITLOCK_SLOT` against `max_holders`, failing fast (a usage
/// error, before any filesystem work) if it names a slot outside
/// `[0, max_holders)` (spec.md §7).
pub fn preferred_slot(max_holders: u32) -> Result<Option<u16>, WaitlockError> {
    match std::env::var("WAITLOCK_SLOT").ok() {
        None => Ok(None),
        Some(raw) => {
            let slot: u16 = raw
                .parse()
                .map_err(|_| WaitlockError::Usage(format!("WAITLOCK_SLOT '{raw}' is not a valid slot index")))?;
            if u32::from(slot) >= max_holders {
                return Err(WaitlockError::Usage(format!(
                    "WAITLOCK_SLOT {slot} is out of range for capacity {max_holders}"
                )));
            }
            Ok(Some(slot))
        }
    }
}
