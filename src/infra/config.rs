//! Configuration loading from TOML files
//!
//! Config file is selected via the --config command line argument,
//! default: config/dev.toml. Defaults mirror the kiosk acquisition
//! constants: 7 stability units, 15 s stage budget, 3 attempts / 30 s
//! lockout cool-down.

use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct SensorConfig {
    /// Measurement service address (TCP, newline-delimited JSON)
    pub addr: String,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitConfig {
    /// Results endpoint URL
    pub url: String,
    #[serde(default = "default_submit_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_submit_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Deserialize)]
pub struct AcquisitionConfig {
    /// Stability units required to complete a stage (one unit per second
    /// of uninterrupted reception)
    #[serde(default = "default_max_stability")]
    pub max_stability: u32,
    /// Hard per-stage budget without any signal before escalation
    #[serde(default = "default_stage_timeout_secs")]
    pub stage_timeout_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            max_stability: default_max_stability(),
            stage_timeout_secs: default_stage_timeout_secs(),
        }
    }
}

fn default_max_stability() -> u32 {
    7
}

fn default_stage_timeout_secs() -> u64 {
    15
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// File holding the identity token written by the face-verification step
    #[serde(default = "default_token_file")]
    pub token_file: String,
    /// File receiving the result snapshot for the completion view
    #[serde(default = "default_snapshot_file")]
    pub snapshot_file: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { token_file: default_token_file(), snapshot_file: default_snapshot_file() }
    }
}

fn default_token_file() -> String {
    "state/face_id".to_string()
}

fn default_snapshot_file() -> String {
    "state/results.json".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockoutConfig {
    #[serde(default = "default_lockout_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_lockout_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_lockout_max_attempts(),
            cooldown_secs: default_lockout_cooldown_secs(),
        }
    }
}

fn default_lockout_max_attempts() -> u32 {
    3
}

fn default_lockout_cooldown_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    pub sensor: SensorConfig,
    pub submit: SubmitConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lockout: LockoutConfig,
}

/// Main configuration struct used throughout the application
#[derive(Debug, Clone)]
pub struct Config {
    sensor_addr: String,
    sensor_reconnect_delay_ms: u64,
    submit_url: String,
    submit_timeout_ms: u64,
    max_stability: u32,
    stage_timeout_secs: u64,
    token_file: String,
    snapshot_file: String,
    lockout_max_attempts: u32,
    lockout_cooldown_secs: u64,
    config_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sensor_addr: "127.0.0.1:9050".to_string(),
            sensor_reconnect_delay_ms: 1000,
            submit_url: "http://127.0.0.1:3000/health".to_string(),
            submit_timeout_ms: 5000,
            max_stability: 7,
            stage_timeout_secs: 15,
            token_file: "state/face_id".to_string(),
            snapshot_file: "state/results.json".to_string(),
            lockout_max_attempts: 3,
            lockout_cooldown_secs: 30,
            config_file: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let toml_config: TomlConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            sensor_addr: toml_config.sensor.addr,
            sensor_reconnect_delay_ms: toml_config.sensor.reconnect_delay_ms,
            submit_url: toml_config.submit.url,
            submit_timeout_ms: toml_config.submit.timeout_ms,
            max_stability: toml_config.acquisition.max_stability,
            stage_timeout_secs: toml_config.acquisition.stage_timeout_secs,
            token_file: toml_config.session.token_file,
            snapshot_file: toml_config.session.snapshot_file,
            lockout_max_attempts: toml_config.lockout.max_attempts,
            lockout_cooldown_secs: toml_config.lockout.cooldown_secs,
            config_file: path.display().to_string(),
        })
    }

    /// Load configuration - tries the TOML file first, falls back to defaults
    pub fn load_from_path(path: &str) -> Self {
        match Self::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Warning: {}. Using defaults.", e);
                Self::default()
            }
        }
    }

    // Getters for all config fields
    pub fn sensor_addr(&self) -> &str {
        &self.sensor_addr
    }

    pub fn sensor_reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.sensor_reconnect_delay_ms)
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_millis(self.submit_timeout_ms)
    }

    pub fn max_stability(&self) -> u32 {
        self.max_stability
    }

    pub fn stage_timeout_secs(&self) -> u64 {
        self.stage_timeout_secs
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    pub fn token_file(&self) -> &str {
        &self.token_file
    }

    pub fn snapshot_file(&self) -> &str {
        &self.snapshot_file
    }

    pub fn lockout_max_attempts(&self) -> u32 {
        self.lockout_max_attempts
    }

    pub fn lockout_cooldown(&self) -> Duration {
        Duration::from_secs(self.lockout_cooldown_secs)
    }

    pub fn config_file(&self) -> &str {
        &self.config_file
    }

    /// Builder method for tests to shrink the stage budget
    #[cfg(test)]
    pub fn with_stage_timeout_secs(mut self, secs: u64) -> Self {
        self.stage_timeout_secs = secs;
        self
    }

    /// Builder method for tests to change the stability target
    #[cfg(test)]
    pub fn with_max_stability(mut self, max: u32) -> Self {
        self.max_stability = max;
        self
    }
}
