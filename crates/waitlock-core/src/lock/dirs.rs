//! Directory resolver (spec.md §4.2), reproducing the candidate order of
//! `original_source/src/lock/lock.c::find_lock_directory`.

use crate::error::WaitlockError;
use std::fs;
use std::path::{Path, PathBuf};

const CANDIDATES: &[&str] = &["/var/run/waitlock", "/run/waitlock", "/var/lock/waitlock", "/tmp/waitlock"];

fn writable(path: &Path) -> bool {
    if !path.is_dir() {
        return false;
    }
    let probe = path.join(format!(".waitlock-probe-{}", std::process::id()));
    match fs::File::create(&probe) {
        Ok(_) => {
            let _ = fs::remove_file(&probe);
            true
        }
        Err(_) => false,
    }
}

fn ensure_dir(path: &Path) -> bool {
    if writable(path) {
        return true;
    }
    if fs::create_dir_all(path).is_ok() {
        return writable(path);
    }
    false
}

/// Resolve the lock directory to use.
///
/// `override_dir` is `-d`/`--lock-dir` or `WAITLOCK_DIR`, whichever the
/// caller already merged; when present it is the only candidate tried.
/// Otherwise the fixed system candidates are tried in order, then
/// `<home>/.waitlock`. Never cached — re-probed on every call (spec.md
/// §4.2).
pub fn resolve(override_dir: Option<&Path>) -> Result<PathBuf, WaitlockError> {
    if let Some(dir) = override_dir {
        if ensure_dir(dir) {
            return Ok(dir.to_path_buf());
        }
        return Err(WaitlockError::NoDirectory {
            tried: dir.display().to_string(),
        });
    }

    for candidate in CANDIDATES {
        let path = PathBuf::from(candidate);
        if ensure_dir(&path) {
            return Ok(path);
        }
    }

    if let Ok(home) = crate::home::get_home_dir() {
        let path = home.join(".waitlock");
        if ensure_dir(&path) {
            return Ok(path);
        }
    }

    Err(WaitlockError::NoDirectory {
        tried: format!("{}, <home>/.waitlock", CANDIDATES.join(", ")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn override_dir_is_created_and_used() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("custom-lock-dir");
        let resolved = resolve(Some(&target)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn override_dir_reused_if_already_writable() {
        let tmp = TempDir::new().unwrap();
        let resolved = resolve(Some(tmp.path())).unwrap();
        assert_eq!(resolved, tmp.path());
    }

    #[test]
    fn no_caching_reprobes_each_call() {
        let tmp = TempDir::new().unwrap();
        let target = tmp.path().join("d");
        let first = resolve(Some(&target)).unwrap();
        fs::remove_dir(&target).unwrap();
        let second = resolve(Some(&target)).unwrap();
        assert_eq!(first, second);
        assert!(target.is_dir());
    }
}
