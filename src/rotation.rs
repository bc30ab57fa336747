//! Size monitor and generation rotator.
//!
//! The active log `<base>` is rotated into numbered generations
//! `<base>.1 .. <base>.N`, where `.1` is the newest. A rotation runs four
//! steps in a fixed order:
//!
//! 1. evict `<base>.N`
//! 2. shift `<base>.i` to `<base>.(i+1)` for `i = N-1 ..= 1`
//! 3. promote `<base>` to `<base>.1`
//! 4. create an empty `<base>`
//!
//! Every step checks existence before acting, so re-running the sequence is
//! harmless. A failing step is recorded and the remaining steps still run.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error as ThisError;

use crate::{Error, Result};

/// Rotation parameters read fresh for every size check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Active log size, in bytes, at which rotation is due.
    pub max_size_bytes: u64,
    /// Number of rotated generations kept.
    pub max_generations: usize,
}

/// Result of a size check.
#[derive(Debug)]
pub enum RotationOutcome {
    /// The active log is below the threshold (or absent).
    NoRotation,
    /// The active log was rotated and every step succeeded.
    Rotated,
    /// Rotation ran but some steps failed.
    Partial(Vec<StepFailure>),
}

impl RotationOutcome {
    /// Whether a rotation was attempted.
    pub fn rotated(&self) -> bool {
        !matches!(self, RotationOutcome::NoRotation)
    }
}

/// One step of the rotation sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    Evict,
    Shift,
    Promote,
    Create,
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RotationStep::Evict => "evict",
            RotationStep::Shift => "shift",
            RotationStep::Promote => "promote",
            RotationStep::Create => "create",
        })
    }
}

/// A rotation step that did not complete.
#[derive(Debug, ThisError)]
#[error("{step} step failed for {}: {source}", .path.display())]
pub struct StepFailure {
    pub step: RotationStep,
    /// The file the step was acting on.
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Path of generation `index` for the active log at `base`.
pub fn generation_path(base: &Path, index: usize) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(format!(".{}", index));
    PathBuf::from(name)
}

/// Whether a file is present at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    Exists,
    Absent,
}

fn probe(path: &Path) -> io::Result<Presence> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(Presence::Exists),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Presence::Absent),
        Err(e) => Err(e),
    }
}

/// Collects step failures while the sequence keeps going.
#[derive(Default)]
struct StepLog {
    failures: Vec<StepFailure>,
}

impl StepLog {
    fn record(&mut self, step: RotationStep, path: &Path, source: io::Error) {
        tracing::warn!(%step, path = %path.display(), error = %source, "rotation step failed");
        self.failures.push(StepFailure {
            step,
            path: path.to_path_buf(),
            source,
        });
    }

    /// Probe `path`, recording a failure against `step` if the probe errors.
    fn exists(&mut self, step: RotationStep, path: &Path) -> bool {
        match probe(path) {
            Ok(presence) => presence == Presence::Exists,
            Err(e) => {
                self.record(step, path, e);
                false
            }
        }
    }
}

/// Rotate the active log at `base` keeping at most `max_generations` generations.
///
/// Returns [`Error::PartialRotation`] if any step failed; the other steps
/// have still been applied. With `max_generations == 0` the active log's
/// content is discarded instead of promoted.
pub fn rotate(base: &Path, max_generations: usize) -> Result<()> {
    let mut log = StepLog::default();

    if max_generations > 0 {
        let oldest = generation_path(base, max_generations);
        if log.exists(RotationStep::Evict, &oldest) {
            match fs::remove_file(&oldest) {
                Ok(()) => tracing::debug!(path = %oldest.display(), "evicted oldest generation"),
                Err(e) => log.record(RotationStep::Evict, &oldest, e),
            }
        }

        for i in (1..max_generations).rev() {
            let from = generation_path(base, i);
            if !log.exists(RotationStep::Shift, &from) {
                continue;
            }
            let to = generation_path(base, i + 1);
            match fs::rename(&from, &to) {
                Ok(()) => tracing::debug!(from = %from.display(), to = %to.display(), "shifted generation"),
                Err(e) => log.record(RotationStep::Shift, &from, e),
            }
        }

        if log.exists(RotationStep::Promote, base) {
            let first = generation_path(base, 1);
            match fs::rename(base, &first) {
                Ok(()) => tracing::debug!(path = %first.display(), "promoted active log"),
                Err(e) => log.record(RotationStep::Promote, base, e),
            }
        }
    } else if log.exists(RotationStep::Promote, base)
        && let Err(e) = fs::remove_file(base)
    {
        log.record(RotationStep::Promote, base, e);
    }

    // Never truncate: if promotion failed the old content stays in place.
    if let Err(e) = OpenOptions::new().create(true).append(true).open(base) {
        log.record(RotationStep::Create, base, e);
    }

    if log.failures.is_empty() {
        tracing::info!(path = %base.display(), max_generations, "log rotated");
        Ok(())
    } else {
        Err(Error::PartialRotation(log.failures))
    }
}

/// Read the active log's size and rotate it when it has reached the threshold.
///
/// A missing active log is never due. Metadata errors other than "not found"
/// are returned; step failures during rotation come back as
/// [`RotationOutcome::Partial`].
pub fn check_and_maybe_rotate(active: &Path, policy: &RotationPolicy) -> Result<RotationOutcome> {
    let size = match fs::metadata(active) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(RotationOutcome::NoRotation),
        Err(e) => return Err(Error::Io(e)),
    };

    if size < policy.max_size_bytes {
        return Ok(RotationOutcome::NoRotation);
    }

    tracing::debug!(
        path = %active.display(),
        size,
        max_size = policy.max_size_bytes,
        "size threshold reached"
    );

    match rotate(active, policy.max_generations) {
        Ok(()) => Ok(RotationOutcome::Rotated),
        Err(Error::PartialRotation(failures)) => Ok(RotationOutcome::Partial(failures)),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[test]
    fn test_generation_path() {
        let base = Path::new("/var/log/app.log");
        assert_eq!(generation_path(base, 1), PathBuf::from("/var/log/app.log.1"));
        assert_eq!(generation_path(base, 12), PathBuf::from("/var/log/app.log.12"));
    }

    #[test]
    fn test_rotate_promotes_and_recreates() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "current\n");

        rotate(&base, 3).unwrap();

        assert_eq!(read(&generation_path(&base, 1)), "current\n");
        assert_eq!(fs::metadata(&base).unwrap().len(), 0);
    }

    #[test]
    fn test_rotate_shifts_from_highest_index_down() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "c0");
        write(&generation_path(&base, 1), "c1");
        write(&generation_path(&base, 2), "c2");

        rotate(&base, 3).unwrap();

        assert_eq!(read(&generation_path(&base, 1)), "c0");
        assert_eq!(read(&generation_path(&base, 2)), "c1");
        assert_eq!(read(&generation_path(&base, 3)), "c2");
    }

    #[test]
    fn test_rotate_evicts_oldest() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "c0");
        write(&generation_path(&base, 1), "c1");
        write(&generation_path(&base, 2), "c2");

        rotate(&base, 2).unwrap();

        assert_eq!(read(&generation_path(&base, 1)), "c0");
        assert_eq!(read(&generation_path(&base, 2)), "c1");
        assert!(!generation_path(&base, 3).exists());
    }

    #[test]
    fn test_rotate_with_gap_in_generations() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "c0");
        write(&generation_path(&base, 2), "c2");

        rotate(&base, 4).unwrap();

        assert_eq!(read(&generation_path(&base, 1)), "c0");
        assert!(!generation_path(&base, 2).exists());
        assert_eq!(read(&generation_path(&base, 3)), "c2");
    }

    #[test]
    fn test_rotate_without_active_log_still_creates_one() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");

        rotate(&base, 3).unwrap();

        assert!(base.exists());
        assert!(!generation_path(&base, 1).exists());
    }

    #[test]
    fn test_rotate_zero_generations_discards_content() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "gone");

        rotate(&base, 0).unwrap();

        assert_eq!(fs::metadata(&base).unwrap().len(), 0);
        assert!(!generation_path(&base, 1).exists());
    }

    #[test]
    fn test_rotate_missing_directory_is_partial() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("missing").join("app.log");

        let err = rotate(&base, 2).unwrap_err();
        match err {
            Error::PartialRotation(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].step, RotationStep::Create);
                assert_eq!(failures[0].path, base);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_evict_failure_does_not_abort_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "c0");
        write(&generation_path(&base, 1), "c1");
        // A directory squatting on the oldest generation cannot be removed as a file.
        fs::create_dir(generation_path(&base, 3)).unwrap();
        write(&generation_path(&base, 3).join("blocker"), "x");

        let err = rotate(&base, 3).unwrap_err();
        let Error::PartialRotation(failures) = err else {
            panic!("expected partial rotation");
        };
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].step, RotationStep::Evict);

        assert_eq!(read(&generation_path(&base, 1)), "c0");
        assert_eq!(read(&generation_path(&base, 2)), "c1");
        assert_eq!(fs::metadata(&base).unwrap().len(), 0);
    }

    #[test]
    fn test_check_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "0123456789");
        let policy = RotationPolicy {
            max_size_bytes: 11,
            max_generations: 2,
        };

        let outcome = check_and_maybe_rotate(&base, &policy).unwrap();
        assert!(matches!(outcome, RotationOutcome::NoRotation));
        assert!(!generation_path(&base, 1).exists());
    }

    #[test]
    fn test_check_at_threshold_rotates() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "0123456789");
        let policy = RotationPolicy {
            max_size_bytes: 10,
            max_generations: 2,
        };

        let outcome = check_and_maybe_rotate(&base, &policy).unwrap();
        assert!(matches!(outcome, RotationOutcome::Rotated));
        assert!(outcome.rotated());
        assert_eq!(read(&generation_path(&base, 1)), "0123456789");
        assert_eq!(fs::metadata(&base).unwrap().len(), 0);
    }

    #[test]
    fn test_check_missing_active_log() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        let policy = RotationPolicy {
            max_size_bytes: 1,
            max_generations: 2,
        };

        let outcome = check_and_maybe_rotate(&base, &policy).unwrap();
        assert!(matches!(outcome, RotationOutcome::NoRotation));
        assert!(!base.exists());
    }

    #[test]
    fn test_rotation_is_repeatable() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("app.log");
        write(&base, "data");

        rotate(&base, 2).unwrap();
        rotate(&base, 2).unwrap();

        assert_eq!(read(&generation_path(&base, 2)), "data");
        assert_eq!(read(&generation_path(&base, 1)), "");
        assert_eq!(read(&base), "");
    }
}
