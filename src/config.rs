use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize, de};

use crate::rotation::RotationPolicy;
use crate::{Error, Result, Severity};

/// Default size threshold for the active log (10 MiB).
pub const DEFAULT_MAX_SIZE_BYTES: u64 = 10 * 1024 * 1024;
/// Default number of rotated generations kept.
pub const DEFAULT_MAX_GENERATIONS: usize = 5;
/// Largest accepted `max_generations`.
pub const MAX_GENERATIONS_LIMIT: usize = 10_000;
/// Default age, in days, after which rotated generations are swept.
pub const DEFAULT_RETENTION_DAYS: u64 = 30;

/// Parse a size string with optional units (K/M/G, case-insensitive), defaulting to bytes if no unit.
pub fn parse_size(s: &str) -> Result<u64> {
    let s = s.trim();
    let Some(last) = s.chars().last() else {
        return Err(Error::Config("empty size string".to_string()));
    };

    let (num_str, multiplier) = if last.is_ascii_alphabetic() {
        let multiplier = match last.to_ascii_uppercase() {
            'K' => 1024,
            'M' => 1024 * 1024,
            'G' => 1024 * 1024 * 1024,
            unit => {
                return Err(Error::Config(format!(
                    "invalid unit: {}, supported: K/M/G",
                    unit
                )));
            }
        };
        (&s[..s.len() - 1], multiplier)
    } else {
        (s, 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid number: {}", num_str)))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| Error::Config("size too large".to_string()))
}

/// Size value that can be a number of bytes or a string with units.
#[derive(Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(u64),
    String(String),
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeValue::deserialize(deserializer)? {
        SizeValue::Number(n) => Ok(n),
        SizeValue::String(s) => parse_size(&s).map_err(de::Error::custom),
    }
}

/// Parameter snapshot for the rotating log.
///
/// A `LogConfig` is a plain value: it is handed to every operation explicitly
/// and may be replaced between calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Directory holding the active log and its generations
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// Base file name; the active log is `<log_dir>/<base_name>.log`
    #[serde(default = "default_base_name")]
    pub base_name: String,
    /// Size threshold in bytes (accepts "512K", "10M", "1G")
    #[serde(
        default = "default_max_size_bytes",
        deserialize_with = "deserialize_size"
    )]
    pub max_size_bytes: u64,
    /// Number of rotated generations to keep
    #[serde(default = "default_max_generations")]
    pub max_generations: usize,
    /// Age in days after which generations are swept
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// Minimum severity written to the active log
    #[serde(default)]
    pub min_level: Severity,
    /// Enable console diagnostics
    #[serde(default)]
    pub console: bool,
    /// Console format ("text" or "json")
    #[serde(default = "default_format")]
    pub format: String,
}

impl LogConfig {
    /// Create a new LogConfig with defaults
    pub fn new() -> Self {
        Self {
            log_dir: default_log_dir(),
            base_name: default_base_name(),
            max_size_bytes: DEFAULT_MAX_SIZE_BYTES,
            max_generations: DEFAULT_MAX_GENERATIONS,
            retention_days: DEFAULT_RETENTION_DAYS,
            min_level: Severity::default(),
            console: false,
            format: default_format(),
        }
    }

    /// Set the log directory
    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Set the base file name
    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    /// Set the size threshold in bytes
    pub fn with_max_size(mut self, max_size_bytes: u64) -> Self {
        self.max_size_bytes = max_size_bytes;
        self
    }

    /// Set the size threshold from a string such as "10M".
    ///
    /// Fails with [`Error::Config`] when the value is not numeric.
    pub fn with_max_size_str(mut self, max_size: &str) -> Result<Self> {
        self.max_size_bytes = parse_size(max_size)?;
        Ok(self)
    }

    /// Set the number of generations kept
    pub fn with_max_generations(mut self, max_generations: usize) -> Self {
        self.max_generations = max_generations;
        self
    }

    /// Set the retention age in days
    pub fn with_retention_days(mut self, retention_days: u64) -> Self {
        self.retention_days = retention_days;
        self
    }

    /// Set the minimum severity
    pub fn with_min_level(mut self, min_level: Severity) -> Self {
        self.min_level = min_level;
        self
    }

    /// Set the minimum severity by name.
    ///
    /// Unknown names fail here with [`Error::Config`], so the level filter
    /// never sees an invalid value.
    pub fn with_level_str(mut self, level: &str) -> Result<Self> {
        self.min_level = level.parse()?;
        Ok(self)
    }

    /// Enable console diagnostics
    pub fn with_console(mut self, console: bool) -> Self {
        self.console = console;
        self
    }

    /// Set console format
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    /// Check the snapshot for values the rotation core cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.base_name.is_empty() {
            return Err(Error::Config("base_name must not be empty".to_string()));
        }
        if self.base_name.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "base_name must not contain path separators: {}",
                self.base_name
            )));
        }
        if self.max_size_bytes == 0 {
            return Err(Error::Config(
                "max_size_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_generations == 0 {
            return Err(Error::Config(
                "max_generations must be at least 1".to_string(),
            ));
        }
        if self.max_generations > MAX_GENERATIONS_LIMIT {
            return Err(Error::Config(format!(
                "max_generations must be at most {}, got {}",
                MAX_GENERATIONS_LIMIT, self.max_generations
            )));
        }
        if self.format != "text" && self.format != "json" {
            return Err(Error::Config(format!(
                "unknown format: {}, expected text or json",
                self.format
            )));
        }
        Ok(())
    }

    /// File name of the active log, e.g. `app.log`.
    pub fn active_file_name(&self) -> String {
        format!("{}.log", self.base_name)
    }

    /// Path of the active log.
    pub fn active_log_path(&self) -> PathBuf {
        self.log_dir.join(self.active_file_name())
    }

    /// Rotation parameters for the next size check.
    pub fn policy(&self) -> RotationPolicy {
        RotationPolicy {
            max_size_bytes: self.max_size_bytes,
            max_generations: self.max_generations,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_base_name() -> String {
    "app".to_string()
}

fn default_max_size_bytes() -> u64 {
    DEFAULT_MAX_SIZE_BYTES
}

fn default_max_generations() -> usize {
    DEFAULT_MAX_GENERATIONS
}

fn default_retention_days() -> u64 {
    DEFAULT_RETENTION_DAYS
}

fn default_format() -> String {
    "text".to_string()
}
