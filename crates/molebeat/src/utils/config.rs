//! Configuration file management.
//!
//! Handles loading and saving user preferences to `~/.molebeat.toml`.

use anyhow::{Context, Result};
use molebeat_core::{AnalysisConfig, DEFAULT_TRIGGER_WINDOW};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_POLL_INTERVAL_US: u64 = 500;
const DEFAULT_TICKER_PERIOD_SECS: f64 = 1.0;
const DEFAULT_LOG_LEVEL: &str = "info";

const CONFIG_TEMPLATE: &str = r#"# molebeat configuration file

# Log level when RUST_LOG is not set (default: "info")
# log_level = "info"

# Last analysed audio file (auto-saved)
# last_file = "/path/to/song.wav"

# =============================================================================
# Beat Detection
# =============================================================================

# analysis_period_us = 10000      # Length of one analysis block
# low_freq = 60.0                 # Band of interest, Hz (inclusive)
# high_freq = 500.0
# threshold = 0.7                 # Normalized amplitude (0-1) that counts as a beat
# ignore_period_ms = 100          # Refractory gap after each beat
# calibration_skip_ms = 100       # Gap between blocks sampled for calibration

# =============================================================================
# Ticker
# =============================================================================

# ticker_mode = "musical"         # "musical" (beats of the song) or "periodic"
# ticker_period_secs = 1.0        # Period of the periodic ticker
# trigger_window_us = 2000        # How late a poll may still fire a beat
# poll_interval_us = 500          # Keep below trigger_window_us
"#;

/// Where game ticks come from
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TickerMode {
    #[default]
    Musical,
    Periodic,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: Option<String>,
    pub last_file: Option<String>,

    // Beat detection (flattened for simpler TOML)
    pub analysis_period_us: Option<u64>,
    pub low_freq: Option<f64>,
    pub high_freq: Option<f64>,
    pub threshold: Option<f64>,
    pub ignore_period_ms: Option<u64>,
    pub calibration_skip_ms: Option<u64>,

    // Ticker
    pub ticker_mode: Option<TickerMode>,
    pub ticker_period_secs: Option<f64>,
    pub trigger_window_us: Option<u64>,
    pub poll_interval_us: Option<u64>,

    /// Set on the fallback used when the file on disk failed to load; never written back
    #[serde(skip)]
    read_only: bool,
}

impl Config {
    fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".molebeat.toml"))
    }

    /// Load `~/.molebeat.toml`, writing the commented template on first run
    pub fn load() -> Result<Self> {
        let path = match Self::path() {
            Some(p) => p,
            None => return Ok(Self::default()),
        };

        if !path.exists() {
            // Best effort: a read-only home still gets the defaults
            let _ = fs::write(&path, CONFIG_TEMPLATE);
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Like [`Config::load`], but an unreadable file yields read-only defaults plus the error
    pub fn load_or_default() -> (Self, Option<anyhow::Error>) {
        match Self::load() {
            Ok(config) => (config, None),
            Err(e) => (Self::read_only_default(), Some(e)),
        }
    }

    pub fn read_only_default() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))
    }

    pub fn save(&self) -> Result<()> {
        if self.read_only {
            tracing::debug!("Config was not loaded from disk, leaving it untouched");
            return Ok(());
        }
        let path = Self::path().context("No home directory to save config in")?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if self.read_only {
            tracing::debug!("Not overwriting {:?} with fallback config", path);
            return Ok(());
        }
        let content = toml::to_string(self).context("Failed to serialize config")?;
        fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;
        tracing::debug!("Config saved to {:?}", path);
        Ok(())
    }

    pub fn set_last_file(&mut self, path: &Path) -> Result<()> {
        self.last_file = Some(path.display().to_string());
        self.save()
    }

    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    /// Beat detection parameters, library defaults for anything unset
    pub fn analysis(&self) -> AnalysisConfig {
        let defaults = AnalysisConfig::default();
        AnalysisConfig {
            analysis_period: self
                .analysis_period_us
                .map_or(defaults.analysis_period, Duration::from_micros),
            low_freq: self.low_freq.unwrap_or(defaults.low_freq),
            high_freq: self.high_freq.unwrap_or(defaults.high_freq),
            threshold: self.threshold.unwrap_or(defaults.threshold),
            ignore_period: self
                .ignore_period_ms
                .map_or(defaults.ignore_period, Duration::from_millis),
            calibration_skip: self
                .calibration_skip_ms
                .map_or(defaults.calibration_skip, Duration::from_millis),
        }
    }

    pub fn ticker_mode(&self) -> TickerMode {
        self.ticker_mode.unwrap_or_default()
    }

    /// Period of the periodic ticker; non-positive values fall back to the default
    pub fn ticker_period(&self) -> Duration {
        let secs = self
            .ticker_period_secs
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(DEFAULT_TICKER_PERIOD_SECS);
        Duration::from_secs_f64(secs)
    }

    pub fn trigger_window(&self) -> Duration {
        self.trigger_window_us
            .map_or(DEFAULT_TRIGGER_WINDOW, Duration::from_micros)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us.unwrap_or(DEFAULT_POLL_INTERVAL_US))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_is_all_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.analysis(), AnalysisConfig::default());
        assert_eq!(config.ticker_mode(), TickerMode::Musical);
        assert_eq!(config.trigger_window(), Duration::from_micros(2000));
        assert_eq!(config.poll_interval(), Duration::from_micros(500));
        assert_eq!(config.log_level(), "info");
    }

    #[test]
    fn test_overrides() {
        let config: Config = toml::from_str(
            r#"
            analysis_period_us = 20000
            low_freq = 40.0
            high_freq = 120.0
            threshold = 0.5
            ignore_period_ms = 250
            ticker_mode = "periodic"
            ticker_period_secs = 2.5
            "#,
        )
        .unwrap();

        let analysis = config.analysis();
        assert_eq!(analysis.analysis_period, Duration::from_millis(20));
        assert_eq!(analysis.low_freq, 40.0);
        assert_eq!(analysis.high_freq, 120.0);
        assert_eq!(analysis.threshold, 0.5);
        assert_eq!(analysis.ignore_period, Duration::from_millis(250));
        assert_eq!(analysis.calibration_skip, AnalysisConfig::default().calibration_skip);
        assert_eq!(config.ticker_mode(), TickerMode::Periodic);
        assert_eq!(config.ticker_period(), Duration::from_millis(2500));
    }

    #[test]
    fn test_bad_ticker_period_falls_back() {
        let config = Config {
            ticker_period_secs: Some(-3.0),
            ..Config::default()
        };
        assert_eq!(config.ticker_period(), Duration::from_secs(1));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molebeat.toml");
        let config = Config {
            last_file: Some("song.wav".into()),
            threshold: Some(0.4),
            ticker_mode: Some(TickerMode::Periodic),
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_unparsable_file_survives_fallback_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molebeat.toml");
        let original = "threshold = 0.4\nlow_freq = sixty\n";
        fs::write(&path, original).unwrap();

        assert!(Config::load_from(&path).is_err());
        let mut config = Config::read_only_default();
        assert_eq!(config.analysis(), AnalysisConfig::default());

        config.set_last_file(Path::new("song.wav")).unwrap();
        assert_eq!(config.last_file.as_deref(), Some("song.wav"));
        config.save_to(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), original);
    }

    #[test]
    fn test_unknown_ticker_mode_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("molebeat.toml");
        fs::write(&path, "ticker_mode = \"metronome\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
