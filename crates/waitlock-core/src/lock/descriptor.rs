//! Validated descriptor names (spec.md §6, §9 Open Question on `.slot`).

use crate::error::WaitlockError;
use std::fmt;

/// Maximum descriptor length in bytes (spec.md §6).
pub const MAX_DESCRIPTOR_LEN: usize = 255;

/// A caller-supplied name identifying a lockable resource.
///
/// Validated at construction: alphanumerics, `_`, `-`, `.`; at most
/// [`MAX_DESCRIPTOR_LEN`] bytes; and — resolving the Open Question in
/// spec.md §9 about the exec path's fragile `.slot` string search — must
/// not contain the literal substring `.slot`, since a descriptor file name
/// is `<descriptor>.slot<k>.lock` and an embedded `.slot` would make that
/// name ambiguous to parse.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor(String);

impl Descriptor {
    pub fn new(raw: impl Into<String>) -> Result<Self, WaitlockError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(WaitlockError::Usage("descriptor must not be empty".into()));
        }
        if raw.len() > MAX_DESCRIPTOR_LEN {
            return Err(WaitlockError::Usage(format!(
                "descriptor exceeds {MAX_DESCRIPTOR_LEN} bytes"
            )));
        }
        if !raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        {
            return Err(WaitlockError::Usage(format!(
                "descriptor '{raw}' contains characters outside [A-Za-z0-9_.-]"
            )));
        }
        if raw.contains(".slot") {
            return Err(WaitlockError::Usage(
                "descriptor must not contain the substring '.slot'".into(),
            ));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name prefix every slot file for this descriptor shares:
    /// `<descriptor>.`
    pub fn file_prefix(&self) -> String {
        format!("{}.", self.0)
    }

    /// Full slot file name: `<descriptor>.slot<k>.lock`.
    pub fn slot_file_name(&self, slot: u16) -> String {
        format!("{}.slot{}.lock", self.0, slot)
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_names() {
        assert!(Descriptor::new("build-lock_1.x").is_ok());
    }

    #[test]
    fn rejects_empty() {
        assert!(Descriptor::new("").is_err());
    }

    #[test]
    fn rejects_too_long() {
        let name = "a".repeat(MAX_DESCRIPTOR_LEN + 1);
        assert!(Descriptor::new(name).is_err());
    }

    #[test]
    fn rejects_bad_characters() {
        assert!(Descriptor::new("bad name").is_err());
        assert!(Descriptor::new("bad/name").is_err());
    }

    #[test]
    fn rejects_embedded_dot_slot() {
        assert!(Descriptor::new("my.slot.thing").is_err());
    }

    #[test]
    fn slot_file_name_matches_layout() {
        let d = Descriptor::new("build").unwrap();
        assert_eq!(d.slot_file_name(2), "build.slot2.lock");
        assert_eq!(d.file_prefix(), "build.");
    }
}
