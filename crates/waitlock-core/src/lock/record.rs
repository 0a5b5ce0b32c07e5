//! The lock record (spec.md §3), mirroring the original `struct lock_info`
//! (`original_source/src/waitlock.h`) field-for-field.

/// Fixed sentinel identifying the binary record format: ASCII "WALK".
pub const LOCK_MAGIC: u32 = 0x5741_4C4B;

/// Current on-disk schema version.
pub const LOCK_VERSION: u32 = 1;

/// Whether a descriptor's slots form a mutex (one holder) or a semaphore
/// (N concurrent holders).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    Mutex,
    Semaphore,
}

impl LockType {
    pub fn from_max_holders(max_holders: u32) -> Self {
        if max_holders > 1 {
            LockType::Semaphore
        } else {
            LockType::Mutex
        }
    }

    pub(crate) fn as_u16(self) -> u16 {
        match self {
            LockType::Mutex => 0,
            LockType::Semaphore => 1,
        }
    }

    pub(crate) fn from_u16(v: u16) -> Option<Self> {
        match v {
            0 => Some(LockType::Mutex),
            1 => Some(LockType::Semaphore),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LockType::Mutex => "mutex",
            LockType::Semaphore => "semaphore",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "mutex" => Some(LockType::Mutex),
            "semaphore" => Some(LockType::Semaphore),
            _ => None,
        }
    }
}

/// One record per held slot (spec.md §3).
///
/// `checksum` covers every other field and is computed by
/// [`crate::lock::codec::compute_checksum`]; a record is only authoritative
/// for its `(descriptor, slot)` once the checksum validates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockRecord {
    pub magic: u32,
    pub version: u32,
    pub pid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub acquired_at: u64,
    pub lock_type: LockType,
    pub max_holders: u32,
    pub slot: u32,
    pub hostname: String,
    pub descriptor: String,
    pub cmdline: String,
    pub checksum: u32,
}

impl LockRecord {
    /// Build a fresh record with `checksum` left at zero; the caller must
    /// set `slot` and `acquired_at` and then call
    /// [`crate::lock::codec::compute_checksum`] before writing it out.
    pub fn new(
        descriptor: &str,
        max_holders: u32,
        pid: u32,
        ppid: u32,
        uid: u32,
        hostname: String,
        cmdline: String,
    ) -> Self {
        Self {
            magic: LOCK_MAGIC,
            version: LOCK_VERSION,
            pid,
            ppid,
            uid,
            acquired_at: 0,
            lock_type: LockType::from_max_holders(max_holders),
            max_holders,
            slot: 0,
            hostname,
            descriptor: descriptor.to_string(),
            cmdline,
            checksum: 0,
        }
    }
}
