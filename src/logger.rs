//! Logging setup for hosts embedding the chart.

use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::Local;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::{ChartError, Result};
use crate::setting::{config_dir, LogSettings};

/// Parse a level name, falling back to INFO
pub fn level_from_str(level: &str) -> Level {
    level.trim().parse().unwrap_or(Level::INFO)
}

/// Install the global subscriber. `RUST_LOG` directives are honored on top
/// of the configured level. Fails if a subscriber is already installed.
pub fn init_logger(settings: &LogSettings) -> Result<()> {
    let level = level_from_str(&settings.level);
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    let console_layer = settings.console.then(|| {
        fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_ansi(true)
    });

    let file_layer = if settings.file {
        let path = log_file_path(settings)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Some(
            fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_ansi(false),
        )
    } else {
        None
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ChartError::Logger(e.to_string()))?;

    tracing::info!(level = %level, file = settings.file, "logger initialized");
    Ok(())
}

/// Dated log file inside the configured or default log directory
pub fn log_file_path(settings: &LogSettings) -> Result<PathBuf> {
    let folder = match &settings.directory {
        Some(directory) => directory.clone(),
        None => config_dir()?.join("log"),
    };
    let today = Local::now().format("%Y%m%d");
    Ok(folder.join(format!("kline_chart_{today}.log")))
}
