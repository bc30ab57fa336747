//! Collaborator-facing facade over the rotating log.

use std::path::PathBuf;

use crate::error::WriteError;
use crate::level::should_write;
use crate::retention::{self, GenerationPattern};
use crate::rotation::{self, RotationOutcome, StepFailure};
use crate::writer::{self, LogRecord};
use crate::{Error, LogConfig, Result, Severity};

/// What happened to a record handed to [`Logger::write`].
#[derive(Debug)]
pub enum WriteStatus {
    /// Below the configured minimum severity; nothing was written.
    Filtered,
    /// Appended; carries the outcome of the size check that followed.
    Written(RotationOutcome),
    /// The active log was unavailable; the record was dropped.
    Skipped(WriteError),
}

impl WriteStatus {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteStatus::Written(_))
    }
}

/// Rotating log bound to one configuration snapshot.
///
/// The snapshot is explicit state of this value; every operation derives its
/// parameters from it at call time, and [`Logger::reconfigure`] swaps it
/// between calls.
#[derive(Debug, Clone)]
pub struct Logger {
    config: LogConfig,
}

impl Logger {
    /// Validate `config`, create the log directory and make sure an active log exists.
    pub fn open(config: LogConfig) -> Result<Self> {
        config.validate()?;
        writer::ensure_active_log(&config.active_log_path())?;
        Ok(Self { config })
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Replace the configuration snapshot used by later calls.
    pub fn reconfigure(&mut self, config: LogConfig) -> Result<()> {
        config.validate()?;
        if config.active_log_path() != self.config.active_log_path() {
            writer::ensure_active_log(&config.active_log_path())?;
        }
        self.config = config;
        Ok(())
    }

    /// Path of the active log.
    pub fn active_log_path(&self) -> PathBuf {
        self.config.active_log_path()
    }

    /// Write one record if it passes the level filter, then check the size.
    ///
    /// Never fails: an unavailable log drops the record, and a rotation
    /// problem is reported in the returned status and appended to the log as
    /// an `ERROR` record.
    pub fn write(&self, severity: Severity, message: impl Into<String>) -> WriteStatus {
        if !should_write(severity, self.config.min_level) {
            return WriteStatus::Filtered;
        }

        let active = self.active_log_path();
        let record = LogRecord::new(severity, message);
        if let Err(e) = writer::append(&record, &active) {
            tracing::debug!(path = %active.display(), error = %e, "log record dropped");
            return WriteStatus::Skipped(e);
        }

        let outcome = match rotation::check_and_maybe_rotate(&active, &self.config.policy()) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::debug!(path = %active.display(), error = %e, "size check failed");
                RotationOutcome::NoRotation
            }
        };
        if let RotationOutcome::Partial(failures) = &outcome {
            self.report_failures(failures);
        }
        WriteStatus::Written(outcome)
    }

    /// Rotate now regardless of size.
    ///
    /// Returns [`Error::PartialRotation`] listing the failed steps; those are
    /// also recorded in the active log.
    pub fn force_rotate(&self) -> Result<()> {
        let active = self.active_log_path();
        match rotation::rotate(&active, self.config.max_generations) {
            Err(Error::PartialRotation(failures)) => {
                self.report_failures(&failures);
                Err(Error::PartialRotation(failures))
            }
            other => other,
        }
    }

    /// Run the size check and rotate if due.
    pub fn check(&self) -> Result<RotationOutcome> {
        let outcome =
            rotation::check_and_maybe_rotate(&self.active_log_path(), &self.config.policy())?;
        if let RotationOutcome::Partial(failures) = &outcome {
            self.report_failures(failures);
        }
        Ok(outcome)
    }

    /// Remove generations older than `max_age_days`; returns how many were removed.
    pub fn sweep(&self, max_age_days: u64) -> Result<usize> {
        let pattern = GenerationPattern::new(&self.config.active_file_name());
        retention::sweep(&self.config.log_dir, &pattern, max_age_days)
    }

    /// Sweep with the configured `retention_days`.
    pub fn sweep_expired(&self) -> Result<usize> {
        self.sweep(self.config.retention_days)
    }

    fn report_failures(&self, failures: &[StepFailure]) {
        writer::report_partial_rotation(&self.active_log_path(), failures);
    }
}
