//! Main application logic and lifecycle management.
//!
//! This module contains the core `Application` struct that orchestrates
//! demo startup, the interactive prompt (or the scripted showcase), periodic
//! statistics reporting, and graceful shutdown.

use crate::{
    cli::CliArgs,
    config::AppConfig,
    logging::display_banner,
    signals::{wait_for_shutdown, wait_for_shutdown_silent},
};
use bakery_event_system::{
    BakeryContext, BakeryStats, CookieDemo, FlattenStrategy, ParallelListeners, StrategyRouter,
};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Outcome of one prompt command.
#[derive(Debug, PartialEq)]
enum PromptFlow {
    Continue,
    Quit,
}

/// Main application struct for the bakery demo.
///
/// The `Application` struct manages the complete lifecycle of the demo,
/// including configuration loading, module startup, the interactive prompt,
/// periodic statistics, and graceful shutdown handling.
///
/// # Architecture
///
/// * **Configuration Management**: Loads and validates configuration from files and CLI
/// * **Module Orchestration**: Starts the configured demo module behind [`CookieDemo`]
/// * **Health Monitoring**: Periodic statistics reports while the demo runs
/// * **Graceful Shutdown**: Handles termination signals and cleanup procedures
pub struct Application {
    /// Loaded application configuration
    config: AppConfig,
    /// Shared observable state
    context: Arc<BakeryContext>,
    /// Running demo module
    demo: Box<dyn CookieDemo>,
    /// Unique ID for this demo session, stamped on periodic reports
    session_id: Uuid,
    /// Whether to run the scripted showcase instead of the prompt
    showcase: bool,
}

impl Application {
    /// Creates a new application instance.
    ///
    /// Loads configuration, applies CLI overrides, validates settings, and
    /// starts the configured demo module.
    ///
    /// # Arguments
    ///
    /// * `args` - Parsed command-line arguments
    ///
    /// # Returns
    ///
    /// A configured `Application` instance ready to run, or an error if
    /// initialization failed.
    ///
    /// # Process
    ///
    /// 1. Load configuration from file (creating default if missing)
    /// 2. Apply command-line argument overrides
    /// 3. Validate merged configuration
    /// 4. Display startup banner
    /// 5. Start the demo module and honor the initial strategy
    pub async fn new(args: CliArgs) -> Result<Self, Box<dyn std::error::Error>> {
        info!("🔧 Loading configuration from: {}", args.config_path.display());
        let mut config = AppConfig::load_from_file(&args.config_path).await?;

        // Apply CLI overrides
        if let Some(module) = args.module {
            config.demo.module = module;
        }

        if let Some(strategy) = args.strategy {
            config.demo.initial_strategy = strategy;
        }

        if let Some(log_level) = args.log_level {
            config.logging.level = log_level;
        }

        if args.json_logs {
            config.logging.json_format = true;
        }

        // Validate configuration
        if let Err(e) = config.validate() {
            return Err(format!("Configuration validation failed: {e}").into());
        }
        info!("✅ Configuration loaded and validated successfully");

        // Display banner after logging is setup
        display_banner();

        let context = Arc::new(BakeryContext::with_notification_limit(
            config.demo.notification_limit,
        ));
        let timing = config.bake_timing();

        let demo: Box<dyn CookieDemo> = match config.demo.module.as_str() {
            "listeners" => Box::new(ParallelListeners::start(
                context.clone(),
                timing,
                config.demo.bus_capacity,
            )),
            _ => Box::new(StrategyRouter::start(
                context.clone(),
                timing,
                config.demo.bus_capacity,
            )),
        };

        // The selection starts on the default strategy; honor a configured
        // override without firing a redundant re-selection
        let initial_strategy = config.initial_strategy()?;
        if initial_strategy != demo.selected_strategy() {
            demo.select_strategy(initial_strategy)?;
        }

        let session_id = Uuid::new_v4();

        // Log startup information
        info!("🚀 Cookie Bakery - Flattening Strategy Demo");
        info!("🏗️ Module: {}", demo.name());
        info!("🎫 Session: {}", session_id);
        info!(
            "📂 Config: {} | Oven: {}..{}ms per bake",
            args.config_path.display(),
            config.timing.min_delay_ms,
            config.timing.max_delay_ms
        );

        Ok(Self {
            config,
            context,
            demo,
            session_id,
            showcase: args.showcase,
        })
    }

    /// Runs the application until the user quits or a signal arrives.
    ///
    /// Starts the periodic statistics task, hands control to the interactive
    /// prompt (or the scripted showcase), and performs a phased graceful
    /// shutdown afterwards.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the application ran and shut down successfully, or an error
    /// if there was a critical failure during execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        info!("🌟 Opening the cookie bakery");

        self.log_configuration_summary();

        let Self {
            config,
            context,
            demo,
            session_id,
            showcase,
        } = self;

        // Display initial statistics
        let initial_stats = context.stats().await;
        info!("📊 Initial State:");
        info!("  - Selected strategy: {}", demo.selected_strategy());
        info!("  - Calls started: {}", initial_stats.calls_started);
        info!("  - Responses logged: {}", initial_stats.responses_logged);

        // Start monitoring task for real-time statistics
        let monitoring_handle = if config.demo.stats_interval_secs > 0 {
            let context = context.clone();
            let interval_secs = config.demo.stats_interval_secs;

            Some(tokio::spawn(async move {
                let mut interval =
                    tokio::time::interval(tokio::time::Duration::from_secs(interval_secs));
                // The first tick fires immediately; skip it so reports start
                // one full interval in
                interval.tick().await;
                let mut last_completed = 0u64;

                loop {
                    interval.tick().await;

                    let stats = context.stats().await;
                    let completed_this_period = stats.calls_completed - last_completed;
                    last_completed = stats.calls_completed;

                    info!(
                        "📊 Bakery Health [{}] - {} bakes finished | {} in flight | {} responses logged",
                        session_id, completed_this_period, stats.in_flight, stats.responses_logged
                    );
                }
            }))
        } else {
            None
        };

        // Display ready message
        info!("✅ The bakery is open!");

        if showcase {
            info!("🎬 Showcase mode: touring all four strategies");
            if let Err(e) = run_showcase(demo.as_ref(), &context, &config).await {
                error!("❌ Showcase error: {e}");
            }
        } else {
            info!("⌨️ Type 'help' for commands | 'quit' or Ctrl+C to close");
            run_prompt(demo.as_ref(), &context).await;
        }

        // A second signal while shutdown is in progress exits immediately
        tokio::spawn(async move {
            if let Err(e) = wait_for_shutdown_silent().await {
                error!("Failed to arm the force-quit signal handler: {e}");
                return;
            }

            warn!("⚠️ Second shutdown signal - exiting without cleanup");
            std::process::exit(1);
        });

        info!("🛑 Beginning graceful shutdown...");

        // Phase 1: Stop the periodic reports
        info!("📡 Phase 1: Stopping statistics reports...");
        if let Some(handle) = monitoring_handle {
            handle.abort();
        }

        // Phase 2: Give in-flight bakes a chance to finish. The bound covers
        // one full bake at the configured maximum, so a drained concat backlog
        // may still be cut off.
        info!("⏳ Phase 2: Waiting for in-flight bakes...");
        let max_wait_cycles = (config.timing.max_delay_ms / 100 + 5) as u32;
        let mut wait_cycles = 0;

        while wait_cycles < max_wait_cycles {
            if context.in_flight_count() == 0 {
                break;
            }

            tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
            wait_cycles += 1;
        }

        if wait_cycles >= max_wait_cycles {
            info!(
                "⏰ Timeout reached, abandoning {} in-flight bake(s)",
                context.in_flight_count()
            );
        } else {
            info!("✅ All bakes settled");
        }

        // Phase 3: Stop the module tasks
        info!("🧹 Phase 3: Stopping the {} module...", demo.name());
        if let Err(e) = demo.shutdown().await {
            error!("❌ Module shutdown failed: {e}");
        } else {
            info!("✅ Module stopped cleanly");
        }

        // Display final statistics
        log_final_statistics(&context).await;

        info!("✅ Cookie bakery shutdown complete");
        info!("👋 Thanks for stopping by!");

        Ok(())
    }

    /// Logs the configuration summary at startup.
    fn log_configuration_summary(&self) {
        info!("📋 Configuration Summary:");
        info!("  🧩 Module: {}", self.demo.name());
        info!("  🔀 Initial strategy: {}", self.demo.selected_strategy());
        info!(
            "  🍪 Bake time: {}..{}ms",
            self.config.timing.min_delay_ms, self.config.timing.max_delay_ms
        );
        info!("  🚌 Bus capacity: {}", self.config.demo.bus_capacity);
        info!(
            "  📜 Notification history: {} entries",
            self.config.demo.notification_limit
        );
    }
}

/// Runs the interactive prompt until `quit`, end of input, or a signal.
async fn run_prompt(demo: &dyn CookieDemo, context: &Arc<BakeryContext>) {
    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            result = lines.next_line() => match result {
                Ok(Some(line)) => {
                    if handle_command(line.trim(), demo, context).await == PromptFlow::Quit {
                        break;
                    }
                }
                Ok(None) => {
                    info!("📡 End of input - closing the bakery");
                    break;
                }
                Err(e) => {
                    error!("❌ Failed to read command: {e}");
                    break;
                }
            },
            result = &mut shutdown => {
                if let Err(e) = result {
                    error!("❌ Signal handler error: {e}");
                }
                break;
            }
        }
    }
}

/// Executes one prompt command. Unknown input prints the command reference.
async fn handle_command(
    line: &str,
    demo: &dyn CookieDemo,
    context: &Arc<BakeryContext>,
) -> PromptFlow {
    let mut parts = line.split_whitespace();
    let command = match parts.next() {
        Some(word) => word,
        None => return PromptFlow::Continue,
    };

    match command {
        "add" => {
            let count = match parts.next() {
                Some(raw) => match raw.parse::<usize>() {
                    Ok(n) if n > 0 => n,
                    _ => {
                        error!("❌ Usage: add [count]");
                        return PromptFlow::Continue;
                    }
                },
                None => 1,
            };

            for _ in 0..count {
                if let Err(e) = demo.add_one_cookie() {
                    error!("❌ Could not fire event: {e}");
                    break;
                }
            }
        }
        "select" => match parts.next().map(str::parse::<FlattenStrategy>) {
            Some(Ok(strategy)) => {
                if let Err(e) = demo.select_strategy(strategy) {
                    error!("❌ Could not change strategy: {e}");
                }
            }
            Some(Err(e)) => error!("❌ {e}"),
            None => error!("❌ Usage: select <switch|concat|merge|exhaust>"),
        },
        "clear" => demo.clear_cookies().await,
        "show" => match parts.next() {
            Some("--json") => print_responses_json(context).await,
            None => print_responses(context).await,
            Some(_) => error!("❌ Usage: show [--json]"),
        },
        "log" => print_notifications(context).await,
        "stats" => match parts.next() {
            Some("--json") => print_stats_json(context, demo.selected_strategy()).await,
            None => print_stats(&context.stats().await, demo.selected_strategy()),
            Some(_) => error!("❌ Usage: stats [--json]"),
        },
        "help" => print_help(),
        "quit" | "exit" => return PromptFlow::Quit,
        other => {
            warn!("❓ Unknown command: {other}");
            print_help();
        }
    }

    PromptFlow::Continue
}

/// Prints the response log in completion order, plus anything still baking.
async fn print_responses(context: &Arc<BakeryContext>) {
    let responses = context.responses().await;
    let ids: Vec<u64> = responses.iter().map(|id| id.value()).collect();
    info!("📜 Responses ({} total, completion order): {:?}", ids.len(), ids);

    for call in context.in_flight_snapshot() {
        info!("  🍪 call {} still baking [{}]", call.call_id, call.strategy);
    }
}

/// Prints the response log and in-flight registry as one compact JSON object.
async fn print_responses_json(context: &Arc<BakeryContext>) {
    let payload = serde_json::json!({
        "responses": context.responses().await,
        "in_flight": context.in_flight_snapshot(),
    });
    info!("📜 {payload}");
}

/// Prints the most recent notifications, oldest first.
async fn print_notifications(context: &Arc<BakeryContext>) {
    let notifications = context.notifications().await;
    if notifications.is_empty() {
        info!("📜 No notifications recorded yet");
        return;
    }

    let start = notifications.len().saturating_sub(10);
    info!(
        "📜 Notifications ({} recorded, showing last {}):",
        notifications.len(),
        notifications.len() - start
    );
    for notification in &notifications[start..] {
        info!("  - {notification}");
    }
}

/// Prints a statistics snapshot.
fn print_stats(stats: &BakeryStats, selected: FlattenStrategy) {
    info!("📊 Bakery Statistics:");
    info!("  - Selected strategy: {selected}");
    info!("  - Events fired: {}", stats.events_fired);
    info!("  - Calls started: {}", stats.calls_started);
    info!("  - Calls completed: {}", stats.calls_completed);
    info!("  - Calls abandoned: {}", stats.calls_abandoned);
    info!("  - Events dropped: {}", stats.events_dropped);
    info!("  - In flight now: {}", stats.in_flight);
    info!("  - Responses logged: {}", stats.responses_logged);
    info!("  - Last call ID: {}", stats.last_call_id);
}

/// Prints the statistics snapshot as one compact JSON object.
async fn print_stats_json(context: &Arc<BakeryContext>, selected: FlattenStrategy) {
    let payload = serde_json::json!({
        "selected_strategy": selected,
        "stats": context.stats().await,
    });
    info!("📊 {payload}");
}

/// Prints the prompt command reference.
fn print_help() {
    info!("⌨️ Commands:");
    info!("  add [count]    - fire add-cookie event(s)");
    info!("  select <name>  - pick strategy: switch, concat, merge, exhaust");
    info!("  clear          - empty the response log");
    info!("  show [--json]  - print responses and in-flight bakes");
    info!("  log            - print recent notifications");
    info!("  stats [--json] - print bakery statistics");
    info!("  quit           - close the bakery");
}

/// Runs the scripted strategy tour: for each strategy, fires a burst of
/// rapid events and reports what reached the response log.
async fn run_showcase(
    demo: &dyn CookieDemo,
    context: &Arc<BakeryContext>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    const BURST: usize = 3;
    let max_delay = config.timing.max_delay_ms;

    for strategy in FlattenStrategy::ALL {
        info!("──────────────────────────────────────────");
        info!("🔀 {} - {}", strategy, strategy_blurb(strategy));

        demo.clear_cookies().await;
        demo.select_strategy(strategy)?;

        for _ in 0..BURST {
            demo.add_one_cookie()?;
            tokio::time::sleep(tokio::time::Duration::from_millis(150)).await;
        }

        // Concat works the burst off one bake at a time; the others settle
        // within a single bake
        let budget = match strategy {
            FlattenStrategy::Concat => max_delay * BURST as u64,
            _ => max_delay,
        };
        tokio::time::sleep(tokio::time::Duration::from_millis(budget + 500)).await;

        let responses = context.responses().await;
        let ids: Vec<u64> = responses.iter().map(|id| id.value()).collect();
        info!(
            "📜 [{}] {} of {} events reached the log: {:?}",
            strategy,
            ids.len(),
            BURST,
            ids
        );
    }

    info!("──────────────────────────────────────────");
    print_stats(&context.stats().await, demo.selected_strategy());
    Ok(())
}

/// One-line description of how a strategy treats overlapping events.
fn strategy_blurb(strategy: FlattenStrategy) -> &'static str {
    match strategy {
        FlattenStrategy::Switch => "the newest event wins; earlier bakes are abandoned",
        FlattenStrategy::Concat => "events queue and bake strictly one at a time",
        FlattenStrategy::Merge => "every event starts baking immediately, in parallel",
        FlattenStrategy::Exhaust => "events are ignored while a bake is running",
    }
}

/// Logs final statistics during shutdown.
async fn log_final_statistics(context: &Arc<BakeryContext>) {
    let final_stats = context.stats().await;
    info!("📊 Final Statistics:");
    info!("  - Events fired: {}", final_stats.events_fired);
    info!("  - Calls started: {}", final_stats.calls_started);
    info!("  - Calls completed: {}", final_stats.calls_completed);
    info!("  - Calls abandoned: {}", final_stats.calls_abandoned);
    info!("  - Events dropped: {}", final_stats.events_dropped);
}

#[cfg(test)]
mod tests {
    use super::*;
    use bakery_event_system::{create_bakery_context, BakeTiming};
    use std::path::PathBuf;

    fn test_args(config_path: PathBuf) -> CliArgs {
        CliArgs {
            config_path,
            module: None,
            strategy: None,
            log_level: None,
            json_logs: false,
            showcase: false,
        }
    }

    #[tokio::test]
    async fn test_application_starts_the_router_module() {
        let dir = tempfile::tempdir().unwrap();
        let app = Application::new(test_args(dir.path().join("config.toml")))
            .await
            .unwrap();

        assert_eq!(app.demo.name(), "router");
        assert_eq!(app.demo.selected_strategy(), FlattenStrategy::Switch);
        assert_eq!(app.context.last_call_id(), 0);
    }

    #[tokio::test]
    async fn test_application_honors_module_and_strategy_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = test_args(dir.path().join("config.toml"));
        args.module = Some("listeners".to_string());
        args.strategy = Some("concat".to_string());

        let app = Application::new(args).await.unwrap();

        assert_eq!(app.demo.name(), "listeners");
        assert_eq!(app.demo.selected_strategy(), FlattenStrategy::Concat);
    }

    #[tokio::test]
    async fn test_application_rejects_invalid_module() {
        let dir = tempfile::tempdir().unwrap();
        let mut args = test_args(dir.path().join("config.toml"));
        args.module = Some("carousel".to_string());

        assert!(Application::new(args).await.is_err());
    }

    #[tokio::test]
    async fn test_quit_and_add_commands() {
        let context = create_bakery_context();
        let demo: Box<dyn CookieDemo> = Box::new(StrategyRouter::start(
            context.clone(),
            BakeTiming::new(20, 30),
            16,
        ));

        assert_eq!(
            handle_command("quit", demo.as_ref(), &context).await,
            PromptFlow::Quit
        );
        assert_eq!(
            handle_command("", demo.as_ref(), &context).await,
            PromptFlow::Continue
        );
        assert_eq!(
            handle_command("add 2", demo.as_ref(), &context).await,
            PromptFlow::Continue
        );
        assert_eq!(
            handle_command("show --json", demo.as_ref(), &context).await,
            PromptFlow::Continue
        );

        // Give the routing task a moment to pick the events up
        tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        assert_eq!(context.stats().await.events_fired, 2);

        demo.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_select_command_changes_the_strategy() {
        let context = create_bakery_context();
        let demo: Box<dyn CookieDemo> = Box::new(StrategyRouter::start(
            context.clone(),
            BakeTiming::new(20, 30),
            16,
        ));

        handle_command("select merge", demo.as_ref(), &context).await;
        assert_eq!(demo.selected_strategy(), FlattenStrategy::Merge);

        // Garbage input leaves the selection alone
        handle_command("select tumble", demo.as_ref(), &context).await;
        assert_eq!(demo.selected_strategy(), FlattenStrategy::Merge);

        demo.shutdown().await.unwrap();
    }
}
