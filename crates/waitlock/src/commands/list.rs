//! `waitlock --list`: enumerate active (and, with --all, stale) locks.

use std::io::Write as _;
use std::path::Path;

use waitlock_core::{list, LockStatus, WaitlockError};

use crate::format;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Csv,
    Null,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, WaitlockError> {
        match s {
            "human" => Ok(OutputFormat::Human),
            "csv" => Ok(OutputFormat::Csv),
            "null" => Ok(OutputFormat::Null),
            other => Err(WaitlockError::Usage(format!(
                "unknown --format '{other}' (expected human, csv, or null)"
            ))),
        }
    }
}

pub fn run(
    lock_dir: Option<&Path>,
    all: bool,
    stale_only: bool,
    format: OutputFormat,
    diagnostics: &waitlock_core::logging::Diagnostics,
) -> Result<i32, WaitlockError> {
    let mut rows = list(lock_dir, diagnostics)?;
    if stale_only {
        rows.retain(|r| r.status == LockStatus::Stale);
    } else if !all {
        rows.retain(|r| r.status != LockStatus::Stale);
    }

    match format {
        OutputFormat::Human => print!("{}", format::human(&rows)),
        OutputFormat::Csv => print!("{}", format::csv(&rows)),
        OutputFormat::Null => {
            std::io::stdout().write_all(&format::null(&rows)).ok();
        }
    }
    Ok(0)
}
