//! Configuration management for the cookie bakery demo.
//!
//! This module handles loading, validation, and conversion of demo configuration
//! from TOML files and command-line arguments.

use bakery_event_system::{BakeTiming, FlattenStrategy, DEFAULT_NOTIFICATION_LIMIT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::info;

/// Default demo module for serde deserialization
fn default_module() -> String {
    "router".to_string()
}

/// Default initially selected strategy
fn default_initial_strategy() -> String {
    FlattenStrategy::Switch.name().to_string()
}

/// Default for bus_capacity
fn default_bus_capacity() -> usize {
    64
}

/// Default for notification_limit
fn default_notification_limit() -> usize {
    DEFAULT_NOTIFICATION_LIMIT
}

/// Default for stats_interval_secs
fn default_stats_interval_secs() -> u64 {
    60
}

fn default_min_delay_ms() -> u64 {
    BakeTiming::DEFAULT_MIN_DELAY_MS
}

fn default_max_delay_ms() -> u64 {
    BakeTiming::DEFAULT_MAX_DELAY_MS
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application configuration loaded from TOML file.
///
/// This is the main configuration structure that encompasses all demo settings
/// including module selection, bake timing, and logging. Every section and
/// every field has a default, so a partial (or empty) file still loads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Demo module configuration settings
    #[serde(default)]
    pub demo: DemoSettings,
    /// Simulated bake timing settings
    #[serde(default)]
    pub timing: TimingSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Demo module configuration settings.
///
/// Controls which pipeline module runs, how the event bus is sized, and how
/// much observable history is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemoSettings {
    /// Demo module to run: "router" (one re-routed pipeline) or
    /// "listeners" (four always-on pipelines)
    #[serde(default = "default_module")]
    pub module: String,
    /// Strategy selected when the demo starts
    #[serde(default = "default_initial_strategy")]
    pub initial_strategy: String,
    /// Capacity of the add-cookie event bus
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,
    /// Maximum entries retained in the notification log (0 disables it)
    #[serde(default = "default_notification_limit")]
    pub notification_limit: usize,
    /// Seconds between periodic statistics reports (0 disables them)
    #[serde(default = "default_stats_interval_secs")]
    pub stats_interval_secs: u64,
}

/// Simulated bake timing configuration.
///
/// Each accepted event bakes for a random duration drawn from
/// `[min_delay_ms, max_delay_ms)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Minimum bake duration in milliseconds
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    /// Maximum bake duration in milliseconds (exclusive)
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

/// Logging system configuration.
///
/// Controls log output format and levels.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for DemoSettings {
    fn default() -> Self {
        Self {
            module: default_module(),
            initial_strategy: default_initial_strategy(),
            bus_capacity: default_bus_capacity(),
            notification_limit: default_notification_limit(),
            stats_interval_secs: default_stats_interval_secs(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            demo: DemoSettings::default(),
            timing: TimingSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, creates a default configuration file at the specified path
    /// and returns the default configuration.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// The loaded or default configuration, or an error if loading/creation failed.
    pub async fn load_from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path).await?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            // Create default config file
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content).await?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Converts the timing section to the oven's [`BakeTiming`].
    pub fn bake_timing(&self) -> BakeTiming {
        BakeTiming::new(self.timing.min_delay_ms, self.timing.max_delay_ms)
    }

    /// Parses the configured initial strategy.
    pub fn initial_strategy(&self) -> Result<FlattenStrategy, String> {
        self.demo.initial_strategy.parse()
    }

    /// Validates the configuration for consistency and correctness.
    ///
    /// Checks the module name, strategy name, bus sizing, bake timing, and
    /// log level for validity.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the configuration is valid, or an error string describing the issue.
    pub fn validate(&self) -> Result<(), String> {
        // Validate module name
        let valid_modules = ["router", "listeners"];
        if !valid_modules.contains(&self.demo.module.as_str()) {
            return Err(format!(
                "Invalid demo module: {}. Must be one of: {valid_modules:?}",
                &self.demo.module
            ));
        }

        // Validate initial strategy
        self.initial_strategy()?;

        if self.demo.bus_capacity == 0 {
            return Err("demo.bus_capacity must be greater than 0".to_string());
        }

        // Validate bake timing
        if self.timing.min_delay_ms >= self.timing.max_delay_ms {
            return Err("timing.min_delay_ms must be less than timing.max_delay_ms".to_string());
        }

        // Validate log level
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {valid_levels:?}",
                &self.logging.level
            ));
        }

        Ok(())
    }
}
