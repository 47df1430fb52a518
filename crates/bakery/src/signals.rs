//! Signal handling for graceful demo shutdown.
//!
//! This module provides cross-platform signal handling so the demo can close
//! the bakery cleanly when a termination signal arrives, and exit immediately
//! if a second signal arrives while shutdown is already in progress.

use tokio::signal;
use tracing::info;

/// Waits for a shutdown signal and logs its arrival.
///
/// Listens for termination signals (SIGINT, SIGTERM on Unix; Ctrl+C on Windows)
/// and returns when one is received.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT and SIGTERM signals
/// * **Windows**: Handles Ctrl+C signal
///
/// # Returns
///
/// `Ok(())` when a shutdown signal is received, or an error if signal
/// handling setup failed.
pub async fn wait_for_shutdown() -> Result<(), Box<dyn std::error::Error>> {
    wait_for_shutdown_silent().await?;
    info!("📡 Received shutdown signal - closing the bakery");
    Ok(())
}

/// Waits for a shutdown signal without logging anything.
///
/// The graceful path calls this a second time after shutdown has begun:
/// another signal while cleanup is running exits the process immediately.
pub async fn wait_for_shutdown_silent() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => (),
            _ = sigterm.recv() => ()
        }
    }

    #[cfg(windows)]
    signal::ctrl_c().await?;

    Ok(())
}
