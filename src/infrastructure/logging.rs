//! Logging system configuration and initialization
//!
//! - Console and/or file output
//! - Structured JSON logging (optional)
//! - Configuration based level control, `RUST_LOG` overrides it
//! - ICT (Indochina Time, UTC+7) timestamps, the source site's zone
//! - Previous log file renamed with its timestamp on startup

use anyhow::{Result, anyhow};
use chrono::{DateTime, FixedOffset, Offset, Utc};
use lazy_static::lazy_static;
use std::path::Path;
use std::sync::Mutex;
use tracing::{Subscriber, info, warn};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, time::FormatTime},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;

// Global guard to keep the log file writer alive
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Dependencies whose debug output drowns the crawler's own
const NOISY_TARGETS: &[&str] = &["reqwest", "hyper", "hyper_util", "h2", "html5ever", "selectors", "cookie_store"];

const ICT_OFFSET_SECONDS: i32 = 7 * 3600;

fn ict_offset() -> FixedOffset {
    FixedOffset::east_opt(ICT_OFFSET_SECONDS).unwrap_or_else(|| Utc.fix())
}

fn to_ict(time: DateTime<Utc>) -> DateTime<FixedOffset> {
    time.with_timezone(&ict_offset())
}

/// Custom time formatter for ICT (UTC+7)
struct IctTimeFormatter;

impl FormatTime for IctTimeFormatter {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", to_ict(Utc::now()).format("%Y-%m-%d %H:%M:%S%.3f %:z"))
    }
}

/// Base filter from configuration, used when `RUST_LOG` is unset.
///
/// Noisy dependency targets are capped at `warn` unless `trace` is requested.
pub fn default_filter(config: &LoggingConfig) -> EnvFilter {
    let mut filter = EnvFilter::new(&config.level);

    if !config.level.to_lowercase().contains("trace") {
        for target in NOISY_TARGETS {
            filter = filter.add_directive(format!("{target}=warn").parse().unwrap());
        }
    }

    for (module, level) in &config.module_filters {
        match format!("{module}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("Ignoring invalid log filter {module}={level}: {e}"),
        }
    }

    filter
}

/// Rename an existing log file with its modification time so each run starts fresh
fn rotate_existing_log_file(log_dir: &Path, log_file_name: &str) -> Result<()> {
    let log_file_path = log_dir.join(log_file_name);
    if !log_file_path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&log_file_path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let file_time = metadata
        .modified()
        .or_else(|_| metadata.created())
        .unwrap_or_else(|_| std::time::SystemTime::now());

    let stamp = to_ict(file_time.into()).format("%Y%m%dT%H%M%S");
    let file_stem = log_file_name.trim_end_matches(".log");
    let rotated_path = log_dir.join(format!("{file_stem}.{stamp}.log"));

    std::fs::rename(&log_file_path, &rotated_path).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            log_file_path.display(),
            rotated_path.display(),
            e
        )
    })?;

    Ok(())
}

fn file_layer<S>(writer: NonBlocking, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = fmt::Layer::new()
        .with_writer(writer)
        .with_timer(IctTimeFormatter)
        .with_ansi(false);

    if json {
        layer
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        layer.with_target(false).boxed()
    }
}

/// Initialize logging from configuration.
///
/// Override the filter with `RUST_LOG`, e.g.
/// `RUST_LOG="debug,reqwest=debug" smce-crawler config.toml`.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    if !config.file_output && !config.console_output {
        return Err(anyhow!("No logging output configured"));
    }

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(config));

    let file = if config.file_output {
        std::fs::create_dir_all(&config.log_dir)
            .map_err(|e| anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e))?;
        rotate_existing_log_file(&config.log_dir, &config.file_name)?;

        let (writer, guard) = non_blocking(rolling::never(&config.log_dir, &config.file_name));
        LOG_GUARDS
            .lock()
            .map_err(|_| anyhow!("Log guard registry poisoned"))?
            .push(guard);
        Some(file_layer(writer, config.json_format))
    } else {
        None
    };

    let console = config.console_output.then(|| {
        fmt::Layer::new()
            .with_writer(std::io::stdout)
            .with_timer(IctTimeFormatter)
            .with_target(false)
    });

    Registry::default()
        .with(env_filter)
        .with(file)
        .with(console)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    info!("Logging system initialized");
    info!("Log level: {}", config.level);
    if config.file_output {
        info!("Log file: {:?}", config.log_dir.join(&config.file_name));
    }
    if config.level.to_lowercase().contains("trace") {
        warn!("TRACE level active - dependency logs are not filtered");
    }

    Ok(())
}

/// Log build and platform information for diagnostics
pub fn log_system_info() {
    info!("=== SMCE Crawler ===");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Operating system: {} ({})", std::env::consts::OS, std::env::consts::ARCH);
    if let Ok(current_dir) = std::env::current_dir() {
        info!("Working directory: {:?}", current_dir);
    }
}
