//! Size-based rotation example.
//!
//! Writes enough records to rotate a 1KB log several times, keeping three
//! generations, then sweeps them.

use lazyrotate::{LogConfig, Logger, Severity};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let temp_dir = tempfile::tempdir()?;

    let config = LogConfig::new()
        .with_log_dir(temp_dir.path())
        .with_base_name("test")
        .with_max_size_str("1K")?
        .with_max_generations(3);
    let logger = Logger::open(config)?;

    for i in 0..100 {
        logger.write(Severity::Info, format!("Log message number {}", i));
    }

    let mut names: Vec<_> = std::fs::read_dir(temp_dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    for name in &names {
        println!("{}", name);
    }

    println!("swept {} generation(s)", logger.sweep(0)?);

    Ok(())
}
