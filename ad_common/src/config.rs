//! Typed configuration snapshot, loaded once from TOML.
//!
//! The host agent's own config facility — file discovery, live reload,
//! plugin bootstrap — lives elsewhere; what this module owns is the typed
//! snapshot of the detector's tunables and their TOML parsing, strict about
//! unknown fields the way the host agent's other config loaders are.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pattern::SimplePattern;

/// Errors raised while loading or validating a [`Config`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Process-wide configuration snapshot. Immutable once loaded; shared by
/// reference into every host and dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Config {
    /// `num secs to train`: maximum history window pulled per training call.
    pub train_secs: u64,
    /// `minimum num secs to train`: minimum acceptable coverage to proceed.
    pub min_train_secs: u64,
    /// `train every secs`: target full-sweep period for training all dimensions.
    pub train_every_secs: u64,
    /// `num samples to diff`.
    pub diff_n: usize,
    /// `num samples to smooth`.
    pub smooth_n: usize,
    /// `num samples to lag`.
    pub lag_n: usize,
    /// `hosts to skip from training`.
    pub hosts_to_skip: String,
    /// `charts to skip from training`.
    pub charts_to_skip: String,
    /// `anomaly score threshold`.
    pub anomaly_score_threshold: f64,
    /// `anomalous host at this percent of anomalous units`.
    pub anomaly_rate_threshold: f64,
    /// `anomaly detector window size`.
    pub ad_window_size: usize,
    /// `anomaly detector window rate threshold`.
    pub ad_window_rate_threshold: f64,
    /// `anomaly detector unit rate threshold`.
    pub ad_unit_rate_threshold: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            train_secs: 3600,
            min_train_secs: 1800,
            train_every_secs: 1800,
            diff_n: 1,
            smooth_n: 3,
            lag_n: 5,
            hosts_to_skip: "!*".to_string(),
            charts_to_skip: "!system.cpu *".to_string(),
            anomaly_score_threshold: 0.1,
            // See DESIGN.md for the rationale behind 0.5 (a bare majority
            // of dimensions anomalous) as the default here.
            anomaly_rate_threshold: 0.5,
            ad_window_size: 120,
            ad_window_rate_threshold: 0.25,
            ad_unit_rate_threshold: 0.1,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.min_train_secs > self.train_secs {
            return Err(ConfigError::ValidationError(
                "minimum num secs to train must not exceed num secs to train".to_string(),
            ));
        }
        if self.smooth_n == 0 {
            return Err(ConfigError::ValidationError(
                "num samples to smooth must be at least 1".to_string(),
            ));
        }
        if self.ad_window_size == 0 {
            return Err(ConfigError::ValidationError(
                "anomaly detector window size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `threshold = ADWindowSize * ADWindowRateThreshold`, the set-bit
    /// threshold fed into the host's [`crate::window::RollingBitWindow`].
    pub fn ad_window_threshold(&self) -> usize {
        ((self.ad_window_size as f64) * self.ad_window_rate_threshold).round() as usize
    }

    pub fn hosts_to_skip(&self) -> SimplePattern {
        SimplePattern::parse(&self.hosts_to_skip)
    }

    pub fn charts_to_skip(&self) -> SimplePattern {
        SimplePattern::parse(&self.charts_to_skip)
    }
}
