//! Tracing setup.
//!
//! stderr always gets the log (plain or JSON). When `logging.directory` is
//! set, a daily-rolling file in that directory gets a plain copy too.

use chatrelay_config::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// `RUST_LOG` wins; otherwise `debug` with `--verbose`, else the config level.
pub fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        "debug".into()
    } else {
        config.level.clone()
    }
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process or buffered file lines are lost.
pub fn init(
    config: &LoggingConfig,
    verbose: bool,
) -> Result<Option<WorkerGuard>, Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(config, verbose)))?;

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr).with_target(false));
    let text_layer = (!config.json)
        .then(|| fmt::layer().with_writer(std::io::stderr).with_target(false));

    let (file_layer, guard) = match &config.directory {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}
