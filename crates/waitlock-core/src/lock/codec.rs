//! Integrity codec (spec.md §4.1, §6, §8.5): binary primary encoding,
//! `KEY=VALUE` textual fallback, and the CRC-32 that makes a record
//! authoritative.

use super::record::{LockRecord, LockType, LOCK_MAGIC, LOCK_VERSION};

const HOSTNAME_LEN: usize = 256;
const DESCRIPTOR_LEN: usize = 256;
const CMDLINE_LEN: usize = 4096;

/// Total size, in bytes, of the binary encoding — one `write`/`read` each
/// per spec.md §4.1.
pub const BINARY_RECORD_LEN: usize =
    4 + 4 + 4 + 4 + 4 + 8 + 2 + 2 + 2 + 2 + HOSTNAME_LEN + DESCRIPTOR_LEN + CMDLINE_LEN + 4;

/// A record could not be decoded by either encoding.
#[derive(Debug, thiserror::Error)]
#[error("unreadable lock record")]
pub struct Unreadable;

fn put_fixed(buf: &mut Vec<u8>, s: &str, len: usize) {
    let bytes = s.as_bytes();
    let n = bytes.len().min(len.saturating_sub(1));
    buf.extend_from_slice(&bytes[..n]);
    buf.resize(buf.len() + (len - n), 0);
}

fn get_fixed(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}

/// Pack a record into the fixed binary layout, checksum field included
/// verbatim (callers normally call [`compute_checksum`] first).
pub fn encode_binary(record: &LockRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(BINARY_RECORD_LEN);
    buf.extend_from_slice(&record.magic.to_le_bytes());
    buf.extend_from_slice(&record.version.to_le_bytes());
    buf.extend_from_slice(&record.pid.to_le_bytes());
    buf.extend_from_slice(&record.ppid.to_le_bytes());
    buf.extend_from_slice(&record.uid.to_le_bytes());
    buf.extend_from_slice(&record.acquired_at.to_le_bytes());
    buf.extend_from_slice(&record.lock_type.as_u16().to_le_bytes());
    buf.extend_from_slice(&(record.max_holders as u16).to_le_bytes());
    buf.extend_from_slice(&(record.slot as u16).to_le_bytes());
    buf.extend_from_slice(&0u16.to_le_bytes()); // reserved
    put_fixed(&mut buf, &record.hostname, HOSTNAME_LEN);
    put_fixed(&mut buf, &record.descriptor, DESCRIPTOR_LEN);
    put_fixed(&mut buf, &record.cmdline, CMDLINE_LEN);
    buf.extend_from_slice(&record.checksum.to_le_bytes());
    buf
}

/// Decode the fixed binary layout. Fails (magic/size check) rather than
/// panicking on garbage input — callers fall back to the text decoder.
pub fn decode_binary(bytes: &[u8]) -> Result<LockRecord, Unreadable> {
    if bytes.len() != BINARY_RECORD_LEN {
        return Err(Unreadable);
    }
    let mut pos = 0usize;
    macro_rules! take {
        ($n:expr) => {{
            let slice = &bytes[pos..pos + $n];
            pos += $n;
            slice
        }};
    }
    let magic = u32::from_le_bytes(take!(4).try_into().unwrap());
    if magic != LOCK_MAGIC {
        return Err(Unreadable);
    }
    let version = u32::from_le_bytes(take!(4).try_into().unwrap());
    let pid = u32::from_le_bytes(take!(4).try_into().unwrap());
    let ppid = u32::from_le_bytes(take!(4).try_into().unwrap());
    let uid = u32::from_le_bytes(take!(4).try_into().unwrap());
    let acquired_at = u64::from_le_bytes(take!(8).try_into().unwrap());
    let lock_type_raw = u16::from_le_bytes(take!(2).try_into().unwrap());
    let max_holders = u16::from_le_bytes(take!(2).try_into().unwrap());
    let slot = u16::from_le_bytes(take!(2).try_into().unwrap());
    let _reserved = u16::from_le_bytes(take!(2).try_into().unwrap());
    let hostname = get_fixed(take!(HOSTNAME_LEN));
    let descriptor = get_fixed(take!(DESCRIPTOR_LEN));
    let cmdline = get_fixed(take!(CMDLINE_LEN));
    let checksum = u32::from_le_bytes(take!(4).try_into().unwrap());

    let lock_type = LockType::from_u16(lock_type_raw).ok_or(Unreadable)?;

    Ok(LockRecord {
        magic,
        version,
        pid,
        ppid,
        uid,
        acquired_at,
        lock_type,
        max_holders: max_holders as u32,
        slot: slot as u32,
        hostname,
        descriptor,
        cmdline,
        checksum,
    })
}

/// Encode the `KEY=VALUE` fallback format (spec.md §6).
pub fn encode_text(record: &LockRecord) -> String {
    format!(
        "VERSION={}\nPID={}\nPPID={}\nUID={}\nACQUIRED={}\nTYPE={}\nMAX_HOLDERS={}\nSLOT={}\nHOSTNAME={}\nDESCRIPTOR={}\nCOMMAND={}\nCHECKSUM={}\n",
        record.version,
        record.pid,
        record.ppid,
        record.uid,
        record.acquired_at,
        record.lock_type.as_str(),
        record.max_holders,
        record.slot,
        record.hostname,
        record.descriptor,
        record.cmdline,
        record.checksum,
    )
}

/// Decode the `KEY=VALUE` fallback format. Unknown keys are ignored
/// (spec.md §6); a missing required key fails the decode.
pub fn decode_text(text: &str) -> Result<LockRecord, Unreadable> {
    use std::collections::HashMap;
    let mut fields: HashMap<&str, &str> = HashMap::new();
    for line in text.lines() {
        if let Some((k, v)) = line.split_once('=') {
            fields.insert(k.trim(), v.trim());
        }
    }
    let get = |k: &str| fields.get(k).copied();
    let parse_u32 = |k: &str| get(k).and_then(|v| v.parse::<u32>().ok());
    let parse_u64 = |k: &str| get(k).and_then(|v| v.parse::<u64>().ok());

    Ok(LockRecord {
        magic: LOCK_MAGIC,
        version: parse_u32("VERSION").ok_or(Unreadable)?,
        pid: parse_u32("PID").ok_or(Unreadable)?,
        ppid: parse_u32("PPID").unwrap_or(0),
        uid: parse_u32("UID").unwrap_or(0),
        acquired_at: parse_u64("ACQUIRED").ok_or(Unreadable)?,
        lock_type: get("TYPE").and_then(LockType::parse).ok_or(Unreadable)?,
        max_holders: parse_u32("MAX_HOLDERS").ok_or(Unreadable)?,
        slot: parse_u32("SLOT").ok_or(Unreadable)?,
        hostname: get("HOSTNAME").unwrap_or_default().to_string(),
        descriptor: get("DESCRIPTOR").ok_or(Unreadable)?.to_string(),
        cmdline: get("COMMAND").unwrap_or_default().to_string(),
        checksum: parse_u32("CHECKSUM").unwrap_or(0),
    })
}

/// Decode whichever encoding is present: binary first (magic check), then
/// the text fallback (spec.md §4.1).
pub fn decode_any(bytes: &[u8]) -> Result<LockRecord, Unreadable> {
    if let Ok(record) = decode_binary(bytes) {
        return Ok(record);
    }
    let text = std::str::from_utf8(bytes).map_err(|_| Unreadable)?;
    decode_text(text)
}

/// CRC-32 over every field preceding `checksum`, in the binary layout's
/// canonical byte order — the codec's one integrity primitive (spec.md §4.1).
pub fn compute_checksum(record: &LockRecord) -> u32 {
    let mut encoded = encode_binary(record);
    let without_checksum = &encoded[..encoded.len() - 4];
    let checksum = crc32fast::hash(without_checksum);
    encoded.truncate(encoded.len() - 4);
    let _ = encoded; // keep borrow checker happy; encoded dropped here
    checksum
}

/// Recompute and compare; `false` means the record is corrupt and should
/// be treated as absent / removed on sight (spec.md §3 invariant 3).
pub fn validate(record: &LockRecord) -> bool {
    record.magic == LOCK_MAGIC && compute_checksum(record) == record.checksum
}
