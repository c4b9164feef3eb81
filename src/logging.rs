//! Structured logging and tracing for chargemanager
//!
//! Console output plus an optional daily-rolling log file, both driven by
//! the tracing ecosystem. Components obtain a [`StructuredLogger`] through
//! [`get_logger`] so every record carries its component name.

use crate::config::LoggingConfig;
use crate::error::{ChargeManagerError, Result};
use once_cell::sync::OnceCell;
use std::path::Path;
use std::sync::Once;
use tracing::{Level, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

mod level;
mod structured;

pub use level::{level_rank, min_level, parse_log_level};
pub use structured::{LogContext, StructuredLogger, get_logger, get_logger_with_context};

// Keep the non-blocking worker guard alive for the entire process lifetime
static LOG_GUARD: OnceCell<WorkerGuard> = OnceCell::new();
static INIT_ONCE: Once = Once::new();
static INIT_ERROR: OnceCell<String> = OnceCell::new();

/// Initialize logging system based on configuration
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    INIT_ONCE.call_once(|| {
        let init_result = (|| -> Result<()> {
            let level = parse_log_level(&config.level)?;
            let filter = build_env_filter(level);

            match config.file.as_deref() {
                Some(file) if !should_use_console_only() => {
                    init_file_logging(config, file, filter, level)
                }
                _ => {
                    init_console_only_logging(filter, config.json_format, level);
                    Ok(())
                }
            }
        })();

        if let Err(e) = init_result {
            let _ = INIT_ERROR.set(e.to_string());
        }
    });

    if let Some(err) = INIT_ERROR.get() {
        return Err(ChargeManagerError::config(err.clone()));
    }
    Ok(())
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("chargemanager={},rumqttc=warn", level).into())
}

fn should_use_console_only() -> bool {
    cfg!(test) || std::env::var_os("CHARGEMANAGER_DISABLE_FILE_LOG").is_some()
}

fn console_layer<S>(json_format: bool, level: Level) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + 'static,
{
    let base = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false);
    if json_format {
        base.json()
            .with_filter(LevelFilter::from_level(level))
            .boxed()
    } else {
        base.with_filter(LevelFilter::from_level(level)).boxed()
    }
}

fn init_console_only_logging(filter: EnvFilter, json_format: bool, level: Level) {
    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer(json_format, level))
        .try_init()
        .ok();

    info!("Logging initialized - level: {:?}, console-only", level);
}

fn init_file_logging(
    config: &LoggingConfig,
    file: &str,
    filter: EnvFilter,
    level: Level,
) -> Result<()> {
    // A path with an extension names the file; anything else is a directory
    let p = Path::new(file);
    let dir = if p.extension().is_some() {
        p.parent().unwrap_or(p)
    } else {
        p
    };

    let file_appender = rolling::Builder::new()
        .rotation(rolling::Rotation::DAILY)
        .filename_prefix("chargemanager")
        .filename_suffix("log")
        .max_log_files(config.backup_count.max(1) as usize)
        .build(dir)
        .map_err(|e| {
            ChargeManagerError::io(format!("Failed to create log file appender: {}", e))
        })?;

    let (non_blocking_appender, guard) = non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let file_layer = {
        let base = fmt::layer()
            .with_writer(non_blocking_appender)
            .with_ansi(false)
            .with_target(false)
            .with_thread_ids(false)
            .with_file(false);
        if config.json_format {
            base.json()
                .with_filter(LevelFilter::from_level(level))
                .boxed()
        } else {
            base.with_filter(LevelFilter::from_level(level)).boxed()
        }
    };

    let subscriber = tracing_subscriber::registry().with(filter).with(file_layer);

    if config.console_output {
        subscriber
            .with(console_layer(config.json_format, level))
            .try_init()
            .map_err(|e| ChargeManagerError::config(e.to_string()))?;
    } else {
        subscriber
            .try_init()
            .map_err(|e| ChargeManagerError::config(e.to_string()))?;
    }

    info!(
        "Logging initialized - level: {:?}, file: {}",
        level,
        dir.display()
    );
    Ok(())
}
