use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing_subscriber::fmt::MakeWriter;

use crate::error::WriteError;
use crate::rotation::{self, RotationOutcome, RotationPolicy, StepFailure};
use crate::{LogConfig, Severity};

/// A single log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: OffsetDateTime,
    pub severity: Severity,
    pub message: String,
}

impl LogRecord {
    /// Create a record stamped with the current local time (UTC if the local
    /// offset cannot be determined).
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self::at(now(), severity, message)
    }

    /// Create a record with an explicit timestamp.
    pub fn at(timestamp: OffsetDateTime, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            severity,
            message: message.into(),
        }
    }

    /// Render as `[YYYY-MM-DD HH:MM:SS] [LEVEL] message\n`.
    ///
    /// Line breaks inside the message are escaped so the record stays on one line.
    pub fn format_line(&self) -> Result<String, time::error::Format> {
        Ok(format!(
            "[{}] [{}] {}\n",
            format_timestamp(self.timestamp)?,
            self.severity,
            escape_line_breaks(&self.message)
        ))
    }
}

pub(crate) fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub(crate) fn format_timestamp(timestamp: OffsetDateTime) -> Result<String, time::error::Format> {
    timestamp.format(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
}

fn escape_line_breaks(message: &str) -> String {
    if !message.contains(['\n', '\r']) {
        return message.to_string();
    }
    message.replace('\r', "\\r").replace('\n', "\\n")
}

/// Append one record to the active log.
///
/// The file is opened in append mode, written with a single call, flushed and
/// closed again. It is never created here: a missing file or directory yields
/// [`WriteError::Unavailable`].
pub fn append(record: &LogRecord, active: &Path) -> Result<(), WriteError> {
    let line = record.format_line()?;
    append_bytes(line.as_bytes(), active)
}

pub(crate) fn append_bytes(bytes: &[u8], active: &Path) -> Result<(), WriteError> {
    let unavailable = |source| WriteError::Unavailable {
        path: active.to_path_buf(),
        source,
    };

    let mut file = OpenOptions::new()
        .append(true)
        .open(active)
        .map_err(unavailable)?;
    file.write_all(bytes).map_err(unavailable)?;
    file.flush().map_err(unavailable)?;
    Ok(())
}

/// Append one `ERROR` record listing the failed rotation steps.
///
/// Best effort, and no size check follows: reporting never re-enters rotation.
pub(crate) fn report_partial_rotation(active: &Path, failures: &[StepFailure]) {
    let detail = failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    let record = LogRecord::new(
        Severity::Error,
        format!("log rotation partially applied: {}", detail),
    );
    if let Err(e) = append(&record, active) {
        tracing::warn!(path = %active.display(), error = %e, "rotation failure report dropped");
    }
}

/// Create the log directory and an empty active log if either is missing.
pub(crate) fn ensure_active_log(active: &Path) -> io::Result<()> {
    if let Some(parent) = active.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(active)?;
    Ok(())
}

/// An `io::Write` sink that feeds the active log and applies the size check
/// after every write.
///
/// Each `write` call is one open/append/close cycle, so several processes can
/// share the file and rotations done elsewhere are picked up on the next write.
/// Use it as a `tracing_subscriber` writer to route tracing output into the
/// rotating log.
#[derive(Debug, Clone)]
pub struct RotatingWriter {
    /// Path of the active log.
    active: PathBuf,
    /// Rotation parameters applied after each write.
    policy: RotationPolicy,
}

impl RotatingWriter {
    /// Create a new rotating writer, creating the directory and active log if needed.
    pub fn new(active: &Path, policy: RotationPolicy) -> io::Result<Self> {
        ensure_active_log(active)?;
        Ok(Self {
            active: active.to_path_buf(),
            policy,
        })
    }

    /// Create a rotating writer for the active log described by `config`.
    pub fn from_config(config: &LogConfig) -> io::Result<Self> {
        Self::new(&config.active_log_path(), config.policy())
    }

    /// Path of the active log.
    pub fn path(&self) -> &Path {
        &self.active
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        append_bytes(buf, &self.active)?;
        match rotation::check_and_maybe_rotate(&self.active, &self.policy) {
            Ok(RotationOutcome::Partial(failures)) => {
                report_partial_rotation(&self.active, &failures);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(path = %self.active.display(), error = %e, "size check failed");
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        // Every write already flushed and closed its handle.
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for RotatingWriter {
    type Writer = RotatingWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rotation::generation_path;
    use time::macros::datetime;

    fn fixed_record(severity: Severity, message: &str) -> LogRecord {
        LogRecord::at(datetime!(2026-01-09 08:05:03 UTC), severity, message)
    }

    #[test]
    fn test_format_line() {
        let line = fixed_record(Severity::Warn, "disk almost full")
            .format_line()
            .unwrap();
        assert_eq!(line, "[2026-01-09 08:05:03] [WARN] disk almost full\n");
    }

    #[test]
    fn test_format_line_escapes_newlines() {
        let line = fixed_record(Severity::Error, "first\nsecond\r\n")
            .format_line()
            .unwrap();
        assert_eq!(line, "[2026-01-09 08:05:03] [ERROR] first\\nsecond\\r\\n\n");
        assert_eq!(line.matches('\n').count(), 1);
    }

    #[test]
    fn test_new_record_has_current_timestamp() {
        let before = OffsetDateTime::now_utc();
        let record = LogRecord::new(Severity::Info, "hi");
        assert!(record.timestamp >= before - time::Duration::seconds(1));
        assert_eq!(record.message, "hi");
    }

    #[test]
    fn test_append_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        ensure_active_log(&path).unwrap();

        append(&fixed_record(Severity::Info, "one"), &path).unwrap();
        append(&fixed_record(Severity::Debug, "two"), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[2026-01-09 08:05:03] [INFO] one",
                "[2026-01-09 08:05:03] [DEBUG] two"
            ]
        );
    }

    #[test]
    fn test_append_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        let err = append(&fixed_record(Severity::Info, "lost"), &path).unwrap_err();
        assert!(matches!(err, WriteError::Unavailable { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn test_append_missing_directory_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone").join("app.log");

        let err = append(&fixed_record(Severity::Info, "lost"), &path).unwrap_err();
        assert!(matches!(err, WriteError::Unavailable { ref path, .. } if path.ends_with("app.log")));
    }

    #[test]
    fn test_ensure_active_log_creates_parent_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested/inner");
        let path = nested.join("app.log");
        assert!(!nested.exists());

        ensure_active_log(&path).unwrap();

        assert!(path.exists());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn test_ensure_active_log_keeps_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "existing content\n").unwrap();

        ensure_active_log(&path).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "existing content\n");
    }

    #[test]
    fn test_rotating_writer_appends_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy {
            max_size_bytes: 1024,
            max_generations: 3,
        };
        let mut writer = RotatingWriter::new(&path, policy).unwrap();

        writer.write_all(b"hello world\n").unwrap();
        writer.flush().unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "hello world\n");
        assert!(!generation_path(&path, 1).exists());
    }

    #[test]
    fn test_rotating_writer_size_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy {
            max_size_bytes: 50,
            max_generations: 3,
        };
        let mut writer = RotatingWriter::new(&path, policy).unwrap();

        for i in 0..5 {
            writer
                .write_all(format!("line {} - some padding text here\n", i).as_bytes())
                .unwrap();
        }

        assert!(path.exists(), "active log should exist");
        assert!(generation_path(&path, 1).exists(), "app.log.1 should exist");
        assert!(!generation_path(&path, 4).exists());
    }

    #[test]
    fn test_rotating_writer_reports_partial_rotation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy {
            max_size_bytes: 10,
            max_generations: 2,
        };
        let oldest = generation_path(&path, 2);
        fs::create_dir(&oldest).unwrap();
        fs::write(oldest.join("blocker"), "x").unwrap();
        let mut writer = RotatingWriter::new(&path, policy).unwrap();

        writer.write_all(b"0123456789abcdef\n").unwrap();

        assert_eq!(
            fs::read_to_string(generation_path(&path, 1)).unwrap(),
            "0123456789abcdef\n"
        );
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(
            content.contains("[ERROR] log rotation partially applied: evict step failed"),
            "unexpected active log: {content:?}"
        );
    }

    #[test]
    fn test_make_writer_targets_same_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");
        let policy = RotationPolicy {
            max_size_bytes: 1024,
            max_generations: 1,
        };
        let writer = RotatingWriter::new(&path, policy).unwrap();

        let mut a = writer.make_writer();
        let mut b = writer.make_writer();
        a.write_all(b"a\n").unwrap();
        b.write_all(b"b\n").unwrap();

        assert_eq!(writer.path(), path.as_path());
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\n");
    }
}
