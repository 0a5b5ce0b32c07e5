//! Home directory resolution for the final lock-directory fallback candidate.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Return the current user's home directory.
///
/// Used only to build the last candidate in the directory resolver's search
/// order (`<home>/.waitlock`); unlike the lock directory itself this is not
/// configurable by an environment variable — spec.md's only directory
/// override is `WAITLOCK_DIR` / `-d`, which is handled by
/// [`crate::lock::dirs::resolve`].
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().context("could not determine home directory")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_platform_default() {
        assert_eq!(get_home_dir().unwrap(), dirs::home_dir().unwrap());
    }
}
