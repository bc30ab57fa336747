//! # Lazyrotate
//!
//! Size-bounded log rotation with a fixed number of generations and
//! age-based retention.
//!
//! ## Features
//!
//! - One active log per directory, appended with one open/append/close per record
//! - Rotation into `<name>.log.1 .. <name>.log.N` once the active log reaches a size threshold
//! - Age-based sweeping of rotated generations
//! - Minimum-severity filtering
//! - Integration with the `tracing` ecosystem
//!
//! ## Example
//!
//! ```rust,no_run
//! use lazyrotate::{LogConfig, Logger, Severity};
//!
//! let config = LogConfig::new()
//!     .with_log_dir("/var/log/myapp")
//!     .with_base_name("myapp")
//!     .with_max_size(10 * 1024 * 1024);
//! let logger = Logger::open(config)?;
//!
//! logger.write(Severity::Info, "service started");
//! logger.force_rotate()?;
//! let removed = logger.sweep(30)?;
//! # Ok::<(), lazyrotate::Error>(())
//! ```

pub mod builder;
pub mod config;
pub mod error;
pub mod follow;
pub mod level;
pub mod logger;
pub mod retention;
pub mod rotation;
pub mod tracing_init;
pub mod writer;

pub use builder::LogBuilder;
pub use config::LogConfig;
pub use error::{Error, Result, WriteError};
pub use level::{Severity, should_write};
pub use logger::{Logger, WriteStatus};
pub use retention::GenerationPattern;
pub use rotation::{RotationOutcome, RotationPolicy, RotationStep, StepFailure};
pub use tracing_init::{BracketFormat, init_logging};
pub use writer::{LogRecord, RotatingWriter};

/// Start configuring a log with the builder API.
pub fn builder() -> LogBuilder {
    LogBuilder::new()
}
