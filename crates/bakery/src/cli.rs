//! Command-line interface handling for the cookie bakery demo.
//!
//! This module provides command-line argument parsing and CLI interface management
//! using the `clap` crate for robust argument handling.

use clap::{Arg, Command};
use std::path::PathBuf;

/// Command line arguments parsed from user input.
///
/// This structure holds all the command-line options that can be used to
/// override configuration file settings or provide runtime parameters.
#[derive(Debug, Clone)]
pub struct CliArgs {
    /// Path to the configuration file
    pub config_path: PathBuf,
    /// Optional override for the demo module ("router" or "listeners")
    pub module: Option<String>,
    /// Optional override for the initially selected strategy
    pub strategy: Option<String>,
    /// Optional override for log level
    pub log_level: Option<String>,
    /// Whether to force JSON log output
    pub json_logs: bool,
    /// Whether to run the scripted showcase instead of the interactive prompt
    pub showcase: bool,
}

impl CliArgs {
    /// Parses command line arguments using clap.
    ///
    /// Sets up the command-line interface with all available options and
    /// returns a structured representation of the parsed arguments.
    ///
    /// # Returns
    ///
    /// A `CliArgs` instance containing all parsed command-line options.
    ///
    /// # Panics
    ///
    /// This function will panic if required arguments are missing, though
    /// all arguments have sensible defaults defined in the clap configuration.
    pub fn parse() -> Self {
        let matches = Command::new("Cookie Bakery")
            .version("0.3.0")
            .about("Interactive demo of the four flattening strategies over simulated bakes")
            .arg(
                Arg::new("config")
                    .short('c')
                    .long("config")
                    .value_name("FILE")
                    .help("Configuration file path")
                    .default_value("config.toml"),
            )
            .arg(
                Arg::new("module")
                    .short('m')
                    .long("module")
                    .value_name("MODULE")
                    .help("Demo module to run (router or listeners)"),
            )
            .arg(
                Arg::new("strategy")
                    .short('s')
                    .long("strategy")
                    .value_name("STRATEGY")
                    .help("Initially selected strategy (switch, concat, merge, exhaust)"),
            )
            .arg(
                Arg::new("log-level")
                    .short('l')
                    .long("log-level")
                    .value_name("LEVEL")
                    .help("Log level (trace, debug, info, warn, error)"),
            )
            .arg(
                Arg::new("json-logs")
                    .long("json-logs")
                    .help("Output logs in JSON format")
                    .action(clap::ArgAction::SetTrue),
            )
            .arg(
                Arg::new("showcase")
                    .long("showcase")
                    .help("Run a scripted tour of all four strategies, then exit")
                    .action(clap::ArgAction::SetTrue),
            )
            .get_matches();

        Self {
            config_path: PathBuf::from(
                matches
                    .get_one::<String>("config")
                    .expect("Default config path should always be set"),
            ),
            module: matches.get_one::<String>("module").cloned(),
            strategy: matches.get_one::<String>("strategy").cloned(),
            log_level: matches.get_one::<String>("log-level").cloned(),
            json_logs: matches.get_flag("json-logs"),
            showcase: matches.get_flag("showcase"),
        }
    }
}
