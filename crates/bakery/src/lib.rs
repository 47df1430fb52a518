//! # Cookie Bakery - Flattening Strategy Demo
//!
//! Interactive terminal demo of the four reactive flattening strategies
//! (switch, concat, merge, exhaust) applied to simulated oven bakes. This
//! entry point handles CLI parsing, configuration loading, and application
//! lifecycle management.
//!
//! ## Quick Start
//!
//! ```bash
//! # Run with default configuration (single re-routed pipeline)
//! bakery
//!
//! # Run the four always-on pipelines instead
//! bakery --module listeners
//!
//! # Start on a different strategy with verbose logs
//! bakery --strategy concat --log-level debug
//!
//! # Scripted tour of all four strategies
//! bakery --showcase
//!
//! # JSON logging for machine consumption
//! bakery --json-logs
//! ```
//!
//! ## Configuration
//!
//! The demo loads configuration from a TOML file (default: `config.toml`).
//! If the file doesn't exist, a default configuration will be created.
//!
//! ## Signal Handling
//!
//! The demo shuts down gracefully on:
//! - SIGINT (Ctrl+C)
//! - SIGTERM (Unix systems)
//!
//! A second signal while shutdown is in progress exits immediately.

use tracing::error;

mod app;
mod cli;
mod config;
mod logging;
mod signals;

use app::Application;
use cli::CliArgs;
use config::AppConfig;

/// Main entry point for the bakery demo.
///
/// Handles the complete application lifecycle including:
/// 1. Command-line argument parsing
/// 2. Configuration loading and validation
/// 3. Logging system initialization
/// 4. Application creation and execution
/// 5. Error handling and cleanup
///
/// # Exit Codes
///
/// * **0**: Successful execution and shutdown
/// * **1**: Error during startup, configuration, or runtime
///
/// Note: This function is called from an async context (main with #[tokio::main]),
/// so it should NOT have #[tokio::main] itself.
pub async fn init() -> Result<(), Box<dyn std::error::Error>> {
    // Parse CLI arguments first
    let args = CliArgs::parse();

    // Load configuration to get logging settings
    let mut config = AppConfig::load_from_file(&args.config_path)
        .await
        .unwrap_or_default();

    // The log-level override has to land before the subscriber is built
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }

    // Setup logging before anything else
    if let Err(e) = logging::setup_logging(&config.logging, args.json_logs) {
        eprintln!("❌ Failed to setup logging: {e}");
        std::process::exit(1);
    }

    // Create and run application
    match Application::new(args).await {
        Ok(app) => {
            if let Err(e) = app.run().await {
                error!("❌ Application error: {:?}", e);
                std::process::exit(1);
            }
        }
        Err(e) => {
            error!("❌ Failed to start application: {e:?}");
            std::process::exit(1);
        }
    }

    Ok(())
}

// Re-export the config types for potential library usage
pub use config::{DemoSettings, LoggingSettings, TimingSettings};

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_event_system::FlattenStrategy;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());

        // Test conversion to the oven's timing
        let timing = config.bake_timing();
        assert_eq!(timing.min_delay_ms, 1000);
        assert_eq!(timing.max_delay_ms, 3000);
        assert_eq!(config.initial_strategy(), Ok(FlattenStrategy::Switch));
    }

    #[tokio::test]
    async fn test_config_validation() {
        let mut config = AppConfig::default();

        // Test invalid module name
        config.demo.module = "carousel".to_string();
        assert!(config.validate().is_err());

        // Test inverted bake timing
        config.demo.module = "listeners".to_string();
        config.timing.min_delay_ms = 500;
        config.timing.max_delay_ms = 100;
        assert!(config.validate().is_err());

        // Test invalid log level
        config.timing.max_delay_ms = 900;
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_cli_parsing() {
        // Test CLI argument structure
        let args = CliArgs {
            config_path: PathBuf::from("test.toml"),
            module: Some("listeners".to_string()),
            strategy: Some("merge".to_string()),
            log_level: Some("debug".to_string()),
            json_logs: true,
            showcase: false,
        };

        assert_eq!(args.config_path, PathBuf::from("test.toml"));
        assert_eq!(args.module, Some("listeners".to_string()));
        assert_eq!(args.strategy, Some("merge".to_string()));
        assert_eq!(args.log_level, Some("debug".to_string()));
        assert!(args.json_logs);
        assert!(!args.showcase);
    }

    #[tokio::test]
    async fn test_application_creation() {
        let dir = tempfile::tempdir().unwrap();
        let args = CliArgs {
            config_path: dir.path().join("bakery.toml"),
            module: None,
            strategy: Some("exhaust".to_string()),
            log_level: None,
            json_logs: false,
            showcase: false,
        };
        let config_path = args.config_path.clone();

        let app = Application::new(args).await.unwrap();

        // A default config file is created on first run
        assert!(config_path.exists());
        drop(app);
    }
}
