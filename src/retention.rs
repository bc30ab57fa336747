//! Age-based sweeping of rotated generations.
//!
//! The sweep is independent of the generation count: it removes any rotated
//! file older than the cutoff, including stale generations left behind after
//! `max_generations` was lowered.

use std::fs;
use std::io;
use std::path::Path;
use std::time::{Duration, SystemTime};

use crate::Result;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Matches rotated generation names, `<active file name>.<digits>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationPattern {
    prefix: String,
}

impl GenerationPattern {
    /// Pattern for generations of the active log named `active_file_name` (e.g. `app.log`).
    pub fn new(active_file_name: &str) -> Self {
        Self {
            prefix: format!("{}.", active_file_name),
        }
    }

    /// Generation index encoded in `file_name`, if it is a rotated generation.
    pub fn generation_index(&self, file_name: &str) -> Option<usize> {
        let suffix = file_name.strip_prefix(&self.prefix)?;
        if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        suffix.parse().ok()
    }

    pub fn matches(&self, file_name: &str) -> bool {
        self.generation_index(file_name).is_some()
    }
}

/// Delete rotated generations in `log_dir` last modified more than `max_age_days` ago.
///
/// Returns the number of files removed. Per-file failures are logged and
/// skipped; only failing to list the directory is an error. A missing
/// directory sweeps nothing.
pub fn sweep(log_dir: &Path, pattern: &GenerationPattern, max_age_days: u64) -> Result<usize> {
    let max_age = Duration::from_secs(max_age_days.saturating_mul(SECONDS_PER_DAY));
    let cutoff = SystemTime::now()
        .checked_sub(max_age)
        .unwrap_or(SystemTime::UNIX_EPOCH);
    sweep_before(log_dir, pattern, cutoff)
}

/// Delete rotated generations in `log_dir` last modified before `cutoff`.
pub fn sweep_before(log_dir: &Path, pattern: &GenerationPattern, cutoff: SystemTime) -> Result<usize> {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(dir = %log_dir.display(), error = %e, "failed to read directory entry");
                continue;
            }
        };

        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        if !pattern.matches(&name) {
            continue;
        }

        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| {
            if m.is_file() {
                m.modified().map(Some)
            } else {
                Ok(None)
            }
        }) {
            Ok(Some(modified)) => modified,
            Ok(None) => continue,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to read modification time");
                continue;
            }
        };

        if modified >= cutoff {
            continue;
        }

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "swept expired generation");
                removed += 1;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove expired generation");
            }
        }
    }

    tracing::info!(dir = %log_dir.display(), removed, "retention sweep finished");
    Ok(removed)
}
