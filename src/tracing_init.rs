use std::fmt;
use std::sync::Mutex;

use once_cell::sync::Lazy;
use tracing::{Event, Subscriber};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt, util::SubscriberInitExt};

use crate::writer::{RotatingWriter, format_timestamp, now as local_now};
use crate::{Error, LogConfig, Result, Severity};

/// Target prefix of this crate's own diagnostics.
const CRATE_TARGET: &str = "lazyrotate";

static LOG_GUARD: Lazy<Mutex<Option<tracing_appender::non_blocking::WorkerGuard>>> =
    Lazy::new(|| Mutex::new(None));

/// Event formatter producing `[YYYY-MM-DD HH:MM:SS] [LEVEL] message` lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketFormat;

impl<S, N> FormatEvent<S, N> for BracketFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let timestamp = format_timestamp(local_now()).map_err(|_| fmt::Error)?;
        let severity = Severity::from(*event.metadata().level());
        write!(writer, "[{}] [{}] ", timestamp, severity)?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Initialize tracing with the given configuration and optional CLI verbosity override.
///
/// Events are written to the active log through a [`RotatingWriter`] behind a
/// non-blocking worker, and to the console when `config.console` is set. The
/// crate's own diagnostics never reach the file layer, so a failing rotation
/// cannot feed itself.
pub fn init_logging(config: &LogConfig, cli_verbose: Option<u8>) -> Result<()> {
    config.validate()?;

    let log_spec = effective_log_spec(config, cli_verbose);
    let env_filter = EnvFilter::try_new(&log_spec).map_err(|e| Error::Init(e.to_string()))?;

    let writer = RotatingWriter::from_config(config)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(writer);
    *LOG_GUARD
        .lock()
        .map_err(|e| Error::Init(e.to_string()))? = Some(guard);

    let file_min = tracing::Level::from(config.min_level);
    let file_layer = tracing_subscriber::fmt::layer()
        .event_format(BracketFormat)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_filter(filter_fn(move |meta| {
            !meta.target().starts_with(CRATE_TARGET) && *meta.level() <= file_min
        }));

    let console_layer = config.console.then(|| {
        let fmt_layer_builder = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(std::io::stderr);

        if config.format == "json" {
            fmt_layer_builder.json().boxed()
        } else {
            fmt_layer_builder.boxed()
        }
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Init(e.to_string()))?;

    Ok(())
}

/// Determine the effective filter specification, considering config and CLI overrides.
fn effective_log_spec(config: &LogConfig, cli_verbose: Option<u8>) -> String {
    // RUST_LOG takes precedence over everything
    if let Ok(rust_log) = std::env::var("RUST_LOG")
        && !rust_log.is_empty()
    {
        return rust_log;
    }

    let level = config.min_level.as_directive();

    // CLI verbose flag overrides config level
    if let Some(verbose) = cli_verbose {
        return match verbose {
            0 => level.to_string(),
            1 => format!("{},{}=debug", level, CRATE_TARGET),
            2 => format!("{},{}=trace", level, CRATE_TARGET),
            _ => "trace".to_string(),
        };
    }

    format!("{},{}={}", level, CRATE_TARGET, level)
}
