//! Persisted chart settings.
//!
//! Stored as JSON under the user config directory. Every field has a
//! default so partial files load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chart::indicator::{MainIndicator, SecondaryIndicator};
use crate::chart::interaction::InertiaConfig;
use crate::chart::style::ChartStyle;
use crate::chart::viewport::ViewportState;
use crate::error::{ChartError, Result};

const APP_DIR: &str = "kline_chart";
const SETTINGS_FILE: &str = "settings.json";

/// Directory holding settings and log files
pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR))
        .ok_or(ChartError::ConfigDirUnavailable)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Minimum level: trace, debug, info, warn or error
    pub level: String,
    pub console: bool,
    /// Also write JSON lines to a dated file
    pub file: bool,
    /// Log file directory, defaults to `<config>/kline_chart/log`
    pub directory: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console: true,
            file: false,
            directory: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartSettings {
    pub style: ChartStyle,
    pub main_indicator: MainIndicator,
    pub secondary_indicators: Vec<SecondaryIndicator>,
    pub line_mode: bool,
    pub inertia: InertiaConfig,
    pub log: LogSettings,
    /// Last viewport, restored on open when present
    pub viewport: Option<ViewportState>,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            style: ChartStyle::default(),
            main_indicator: MainIndicator::default_ma(),
            secondary_indicators: vec![SecondaryIndicator::default_volume()],
            line_mode: false,
            inertia: InertiaConfig::default(),
            log: LogSettings::default(),
            viewport: None,
        }
    }
}

impl ChartSettings {
    pub fn default_path() -> Result<PathBuf> {
        Ok(config_dir()?.join(SETTINGS_FILE))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&content)?;
        tracing::info!(path = %path.display(), "settings loaded");
        Ok(settings)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::info!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Load from the default path, falling back to defaults when the file
    /// is missing or unreadable
    pub fn load_or_default() -> Self {
        let path = match Self::default_path() {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(error = %e, "using default settings");
                return Self::default();
            }
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "using default settings");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::indicator::{KdjParams, MacdParams};
    use crate::chart::style::InfoPanelLocale;

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(SETTINGS_FILE);

        let settings = ChartSettings {
            style: ChartStyle::dark().with_locale(InfoPanelLocale::En),
            main_indicator: MainIndicator::Bollinger { period: 20, k: 2.0 },
            secondary_indicators: vec![
                SecondaryIndicator::Macd(MacdParams::default()),
                SecondaryIndicator::Kdj(KdjParams::default()),
            ],
            line_mode: true,
            viewport: Some(ViewportState {
                scale: 1.4,
                scroll_offset: 320.0,
                auto_follow: false,
            }),
            ..Default::default()
        };
        settings.save(&path).unwrap();

        let loaded = ChartSettings::load(&path).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        fs::write(&path, r#"{"line_mode": true, "log": {"level": "debug"}}"#).unwrap();

        let loaded = ChartSettings::load(&path).unwrap();
        assert!(loaded.line_mode);
        assert_eq!(loaded.log.level, "debug");
        assert!(loaded.log.console);
        assert_eq!(loaded.main_indicator, MainIndicator::default_ma());
        assert_eq!(loaded.style, ChartStyle::default());
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(ChartSettings::load(&missing), Err(ChartError::Io(_))));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(ChartSettings::load(&broken), Err(ChartError::Json(_))));
    }
}
