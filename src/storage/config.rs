//! Engine and simulation configuration.
//!
//! Loaded from `config.toml` in the application data directory; a missing file
//! yields the defaults.

use crate::metrics::{AccumulationPolicy, ScoringPolicy, SpeedAveraging};
use crate::sensors::location::{MAX_VALID_SPEED_KMH, MIN_VALID_SPEED_KMH};
use crate::sensors::{MAX_SIMULATED_RATE_HZ, STANDARD_GRAVITY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Scoring engine settings
    pub engine: EngineConfig,
    /// Simulated sensor settings
    pub simulation: SimulationSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            engine: EngineConfig::default(),
            simulation: SimulationSettings::default(),
        }
    }
}

/// Settings fixed for the lifetime of a session controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Gravity baseline subtracted from the acceleration magnitude (m/s²)
    pub gravity: f64,
    /// How net acceleration is accumulated
    pub accumulation: AccumulationPolicy,
    /// How the average acceleration is scored
    pub scoring: ScoringPolicy,
    /// Speed gate and averaging
    pub speed: SpeedSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gravity: STANDARD_GRAVITY,
            accumulation: AccumulationPolicy::default(),
            scoring: ScoringPolicy::default(),
            speed: SpeedSettings::default(),
        }
    }
}

impl EngineConfig {
    /// Defaults with plain additive accumulation.
    pub fn additive() -> Self {
        Self {
            accumulation: AccumulationPolicy::Additive,
            ..Default::default()
        }
    }

    /// Check every value range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.gravity.is_finite() && self.gravity >= 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "gravity must be a non-negative number, got {}",
                self.gravity
            )));
        }
        self.accumulation
            .validate()
            .map_err(ConfigError::InvalidValue)?;
        self.scoring.validate().map_err(ConfigError::InvalidValue)?;
        self.speed.validate()
    }
}

/// Speed validity gate, averaging mode and fix polling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedSettings {
    /// Lowest accepted speed (km/h)
    pub min_valid_kmh: f64,
    /// Highest accepted speed (km/h)
    pub max_valid_kmh: f64,
    /// How valid readings are averaged
    pub averaging: SpeedAveraging,
    /// Interval between fix requests in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for SpeedSettings {
    fn default() -> Self {
        Self {
            min_valid_kmh: MIN_VALID_SPEED_KMH,
            max_valid_kmh: MAX_VALID_SPEED_KMH,
            averaging: SpeedAveraging::default(),
            poll_interval_ms: 2000,
        }
    }
}

impl SpeedSettings {
    /// Check the gate bounds and poll interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_valid_kmh >= 0.0 && self.min_valid_kmh <= self.max_valid_kmh)
            || !self.max_valid_kmh.is_finite()
        {
            return Err(ConfigError::InvalidValue(format!(
                "speed range [{}, {}] is not valid",
                self.min_valid_kmh, self.max_valid_kmh
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Profile of the simulated motion and location sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Motion sample rate (Hz)
    pub motion_rate_hz: f64,
    /// Peak longitudinal acceleration (m/s²)
    pub wobble_amplitude: f64,
    /// Wobble frequency (Hz)
    pub wobble_frequency_hz: f64,
    /// Travel speed (km/h)
    pub cruise_speed_kmh: f64,
    /// Whether fixes carry a reported speed
    pub report_speed: bool,
    /// Delay before each fix resolves (ms)
    pub fix_latency_ms: u64,
    /// Starting latitude in degrees
    pub start_latitude: f64,
    /// Starting longitude in degrees
    pub start_longitude: f64,
    /// Length of the demo session (seconds)
    pub duration_secs: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            motion_rate_hz: 60.0,
            wobble_amplitude: 1.5,
            wobble_frequency_hz: 0.2,
            cruise_speed_kmh: 50.0,
            report_speed: true,
            fix_latency_ms: 100,
            start_latitude: 52.3676,
            start_longitude: 4.9041,
            duration_secs: 10,
        }
    }
}

impl SimulationSettings {
    /// Check the sample rate, wobble, speed and starting position.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.motion_rate_hz > 0.0 && self.motion_rate_hz <= MAX_SIMULATED_RATE_HZ) {
            return Err(ConfigError::InvalidValue(format!(
                "motion_rate_hz must be in (0, {}], got {}",
                MAX_SIMULATED_RATE_HZ, self.motion_rate_hz
            )));
        }
        if !(self.wobble_amplitude.is_finite() && self.wobble_frequency_hz.is_finite()) {
            return Err(ConfigError::InvalidValue(
                "wobble amplitude and frequency must be finite".to_string(),
            ));
        }
        if !(self.cruise_speed_kmh.is_finite() && self.cruise_speed_kmh >= 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "cruise_speed_kmh must be a non-negative number, got {}",
                self.cruise_speed_kmh
            )));
        }
        if !(self.start_latitude.abs() <= 90.0 && self.start_longitude.abs() <= 180.0) {
            return Err(ConfigError::InvalidValue(format!(
                "start position ({}, {}) is not a coordinate",
                self.start_latitude, self.start_longitude
            )));
        }
        Ok(())
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "drivescore", "DriveScore")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from the default location.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let mut config = load_config_from(&get_config_path())?;
    config.data_dir = get_data_dir();
    Ok(config)
}

/// Load configuration from `path`, falling back to defaults if it is missing.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    let mut config = if path.exists() {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        toml::from_str::<AppConfig>(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?
    } else {
        AppConfig::default()
    };

    if let Some(parent) = path.parent() {
        config.data_dir = parent.to_path_buf();
    }

    Ok(config)
}

/// Save application configuration to the default location.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    save_config_to(config, &get_config_path())
}

/// Save configuration to `path`, creating parent directories as needed.
pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
