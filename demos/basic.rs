//! Basic usage example.
//!
//! Opens a log in a temporary directory with the builder API, writes a few
//! records and prints the active log.

use lazyrotate::Severity;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;

    let logger = lazyrotate::builder()
        .with_log_dir(temp_dir.path())
        .with_base_name("basic")
        .with_level(Severity::Info)
        .open()?;

    logger.write(Severity::Debug, "This debug message is filtered out");
    logger.write(Severity::Info, "This is an info message");
    logger.write(Severity::Warn, "This is a warning message");
    logger.write(Severity::Error, "This is an error message");

    print!("{}", std::fs::read_to_string(logger.active_log_path())?);

    Ok(())
}
