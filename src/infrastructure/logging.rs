//! Logging system configuration and initialization
//!
//! - Console and/or file output (non-blocking writer)
//! - Optional structured JSON for the file layer
//! - `RUST_LOG` overrides the configured level
//! - KST (Korea Standard Time) timestamps

#![allow(clippy::uninlined_format_args)]

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{FixedOffset, Utc};
use lazy_static::lazy_static;
use tracing::{Subscriber, info};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    Layer,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<tracing_appender::non_blocking::WorkerGuard>> = Mutex::new(Vec::new());
}

/// Dependency targets capped unless the level asks for `trace`
const QUIET_DIRECTIVES: [&str; 6] = [
    "sqlx::query=warn",
    "sqlx::migrate=info",
    "sqlx::sqlite=warn",
    "reqwest=info",
    "hyper=warn",
    "h2=warn",
];

/// Custom time formatter for KST (UTC+9)
struct KstTimeFormatter;

impl FormatTime for KstTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        let now = Utc::now();
        match FixedOffset::east_opt(9 * 3600) {
            Some(kst) => write!(w, "{}", now.with_timezone(&kst).format("%Y-%m-%d %H:%M:%S%.3f %Z")),
            None => write!(w, "{}", now.format("%Y-%m-%d %H:%M:%S%.3f UTC")),
        }
    }
}

/// Build the filter from `RUST_LOG`, falling back to the configured level.
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    let mut filter = EnvFilter::try_new(&config.level)
        .with_context(|| format!("Invalid log level '{}'", config.level))?;

    if !config.level.to_lowercase().contains("trace") {
        for directive in QUIET_DIRECTIVES {
            filter = filter.add_directive(directive.parse()?);
        }
        // Keep our application logs at the requested level
        filter = filter.add_directive(format!("comment_vault_lib={}", config.level).parse()?);
    }

    Ok(filter)
}

/// Human-readable stderr layer (stdout is reserved for command output)
fn console_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::Layer::new()
        .with_writer(std::io::stderr)
        .with_timer(KstTimeFormatter)
        .with_target(false)
}

fn file_writer(log_dir: &Path, log_file_name: &str) -> Result<non_blocking::NonBlocking> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {:?}", log_dir))?;

    let (writer, guard) = non_blocking(rolling::never(log_dir, log_file_name));
    LOG_GUARDS
        .lock()
        .map_err(|_| anyhow!("Log guard holder is poisoned"))?
        .push(guard);
    Ok(writer)
}

/// Initialize the global subscriber. Fails if it is already set or nothing
/// would be written.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;
    let registry = Registry::default().with(env_filter);
    let log_dir = config.resolved_log_directory();

    match (config.file_output, config.console_output) {
        (true, console) => {
            let writer = file_writer(&log_dir, &config.log_file_name)?;

            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_timer(KstTimeFormatter)
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false);
                registry.with(file_layer).with(console.then(console_layer)).try_init()?;
            } else {
                // time + level + message only
                let file_layer = fmt::Layer::new()
                    .with_writer(writer)
                    .with_timer(KstTimeFormatter)
                    .with_target(false)
                    .with_ansi(false);
                registry.with(file_layer).with(console.then(console_layer)).try_init()?;
            }
        }
        (false, true) => {
            registry.with(console_layer()).try_init()?;
        }
        (false, false) => {
            return Err(anyhow!("No logging output configured"));
        }
    }

    info!("📋 Logging initialized (level: {}, json: {})", config.level, config.json_format);
    if config.file_output {
        info!("📁 Log file: {:?}", log_dir.join(&config.log_file_name));
    }
    Ok(())
}
