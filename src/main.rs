use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lazyrotate::follow::{Follower, tail};
use lazyrotate::{Error, LogConfig, Logger, RotationOutcome, Severity, WriteStatus};

#[derive(Parser)]
#[command(
    name = "lazyrotate",
    version,
    about = "Write to, rotate and sweep a size-bounded log"
)]
struct Cli {
    /// Load settings from a TOML file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the active log and its generations
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Base name of the active log (<base-name>.log)
    #[arg(long)]
    base_name: Option<String>,

    /// Print diagnostics to stderr, repeat for more detail
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a record to the active log
    Write {
        /// Severity: DEBUG, INFO, WARN or ERROR
        #[arg(short, long, default_value = "INFO")]
        level: Severity,

        #[arg(required = true)]
        message: Vec<String>,
    },
    /// Rotate if the active log has reached the size threshold
    Check,
    /// Rotate now
    Rotate,
    /// Remove generations older than the retention age
    Sweep {
        /// Age in days (defaults to retention_days)
        #[arg(long)]
        days: Option<u64>,
    },
    /// Print the active log path
    Path,
    /// Print the last lines of the active log
    Tail {
        /// Number of lines
        #[arg(short = 'n', long, default_value_t = 10)]
        lines: usize,

        /// Keep printing new lines until interrupted
        #[arg(short, long)]
        follow: bool,

        /// Poll interval in milliseconds
        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },
}

fn load_config(cli: &Cli) -> Result<LogConfig> {
    let mut config: LogConfig = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            toml::from_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => LogConfig::new(),
    };

    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(name) = &cli.base_name {
        config.base_name = name.clone();
    }
    if cli.verbose > 0 {
        config.console = true;
    }

    config.validate()?;
    Ok(config)
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = load_config(&cli)?;
    if let Err(e) = lazyrotate::init_logging(&config, Some(cli.verbose)) {
        eprintln!("warning: diagnostics unavailable: {e}");
    }
    let logger = Logger::open(config).context("failed to open log")?;

    match cli.command {
        Command::Write { level, message } => {
            if let WriteStatus::Skipped(e) = logger.write(level, message.join(" ")) {
                eprintln!("warning: record not written: {e}");
            }
        }
        Command::Check => match logger.check()? {
            RotationOutcome::NoRotation => println!("below threshold, not rotated"),
            RotationOutcome::Rotated => println!("rotated {}", logger.active_log_path().display()),
            RotationOutcome::Partial(failures) => {
                eprintln!("rotation partially applied:");
                for failure in &failures {
                    eprintln!("  {failure}");
                }
                return Ok(ExitCode::FAILURE);
            }
        },
        Command::Rotate => match logger.force_rotate() {
            Ok(()) => println!("rotated {}", logger.active_log_path().display()),
            Err(Error::PartialRotation(failures)) => {
                eprintln!("rotation partially applied:");
                for failure in &failures {
                    eprintln!("  {failure}");
                }
                return Ok(ExitCode::FAILURE);
            }
            Err(e) => return Err(e.into()),
        },
        Command::Sweep { days } => {
            let days = days.unwrap_or(logger.config().retention_days);
            let removed = logger.sweep(days)?;
            println!("removed {removed} generation(s) older than {days} day(s)");
        }
        Command::Path => println!("{}", logger.active_log_path().display()),
        Command::Tail {
            lines,
            follow,
            interval_ms,
        } => {
            let path = logger.active_log_path();
            for line in tail(&path, lines)? {
                println!("{line}");
            }
            if follow {
                let mut follower = Follower::from_end(&path)?;
                let interval = Duration::from_millis(interval_ms);
                loop {
                    for line in follower.poll()? {
                        println!("{line}");
                    }
                    thread::sleep(interval);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    match run(Cli::parse()) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
