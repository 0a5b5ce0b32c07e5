//! CPU-count discovery for `-c`/`--onePerCPU` (spec.md §6).

use waitlock_core::WaitlockError;

/// Resolve the effective semaphore capacity from `--onePerCPU`/`--excludeCPUs`
/// or `--allowMultiple`, defaulting to a plain mutex (`1`).
pub fn effective_capacity(
    one_per_cpu: bool,
    exclude_cpus: u32,
    allow_multiple: Option<u32>,
) -> Result<u32, WaitlockError> {
    if one_per_cpu {
        let total = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);
        return Ok(total.saturating_sub(exclude_cpus).max(1));
    }
    match allow_multiple {
        Some(0) => Err(WaitlockError::Usage("--allowMultiple must be at least 1".into())),
        Some(n) => Ok(n),
        None => Ok(1),
    }
}
