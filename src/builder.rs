//! Builder pattern for configuring and opening the rotating log.
//!
//! # Example
//!
//! ```rust,no_run
//! use lazyrotate::Severity;
//!
//! let logger = lazyrotate::builder()
//!     .with_log_dir("/var/log/myapp")
//!     .with_base_name("myapp")
//!     .with_max_size(1024 * 1024)
//!     .with_max_generations(3)
//!     .with_level(Severity::Warn)
//!     .open()
//!     .expect("Failed to open log");
//!
//! logger.write(Severity::Error, "something broke");
//! ```

use std::path::PathBuf;

use crate::tracing_init::init_logging;
use crate::{LogConfig, Logger, Result, Severity};

/// A builder for configuring and opening a [`Logger`].
#[derive(Debug, Clone)]
pub struct LogBuilder {
    config: LogConfig,
}

impl LogBuilder {
    /// Create a new LogBuilder with default configuration.
    pub fn new() -> Self {
        Self {
            config: LogConfig::new(),
        }
    }

    /// Create a LogBuilder from an existing configuration.
    pub fn from_config(config: LogConfig) -> Self {
        Self { config }
    }

    /// Set the directory holding the active log and its generations.
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.config = self.config.with_log_dir(log_dir);
        self
    }

    /// Set the base file name (the active log is `<base_name>.log`).
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.config = self.config.with_base_name(base_name);
        self
    }

    /// Set the rotation threshold in bytes.
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.config = self.config.with_max_size(max_size_bytes);
        self
    }

    /// Set how many rotated generations are kept.
    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.config = self.config.with_max_generations(max_generations);
        self
    }

    /// Set the retention age used by [`Logger::sweep_expired`].
    pub fn with_retention_days(mut self, retention_days: u64) -> Self {
        self.config = self.config.with_retention_days(retention_days);
        self
    }

    /// Set the minimum severity written.
    pub fn with_level(mut self, level: Severity) -> Self {
        self.config = self.config.with_min_level(level);
        self
    }

    /// Enable or disable console diagnostics.
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config = self.config.with_console(enabled);
        self
    }

    /// Set the console output format ("text" or "json").
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.config = self.config.with_format(format);
        self
    }

    /// Get the current configuration without opening anything.
    pub fn build(self) -> LogConfig {
        self.config
    }

    /// Validate the configuration and open the log.
    pub fn open(self) -> Result<Logger> {
        Logger::open(self.config)
    }

    /// Open the log and route `tracing` events into it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The configuration is invalid
    /// - The log directory or active log cannot be created
    /// - The tracing subscriber is already initialized
    pub fn init(self) -> Result<Logger> {
        init_logging(&self.config, None)?;
        Logger::open(self.config)
    }
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}
