//! # Demo Driving Surface
//!
//! This module defines the interface the terminal app (or a test) uses to
//! drive a demo module, without caring whether the strategy-routed pipeline
//! or the parallel listeners are behind it. The surface mirrors the three
//! user actions of the terminal prompt plus access to everything observable.
//!
//! ## Design Principles
//!
//! - **Minimal Interface**: Only the user actions and the observable outputs
//!   are exposed
//! - **Uniformity**: Both demo modules implement the same trait, so the app
//!   hosts either behind a `Box<dyn CookieDemo>`
//! - **Async Support**: Operations that touch the shared logs are async

use crate::context::BakeryContext;
use crate::events::PipelineError;
use crate::types::FlattenStrategy;
use async_trait::async_trait;
use std::sync::Arc;

/// Uniform driving surface for a running demo module.
///
/// The three mutating operations correspond to the prompt's user
/// actions: requesting a cookie, clearing the response log, and picking a
/// flattening strategy. Everything observable is reached through the shared
/// [`BakeryContext`].
///
/// # Examples
///
/// ```rust,no_run
/// use bakery_event_system::{
///     create_bakery_context, BakeTiming, CookieDemo, FlattenStrategy, StrategyRouter,
/// };
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let context = create_bakery_context();
/// let demo: Box<dyn CookieDemo> =
///     Box::new(StrategyRouter::start(context.clone(), BakeTiming::default(), 64));
///
/// demo.select_strategy(FlattenStrategy::Concat)?;
/// demo.add_one_cookie()?;
/// demo.add_one_cookie()?;
///
/// tokio::time::sleep(std::time::Duration::from_secs(7)).await;
/// println!("responses: {:?}", context.responses().await);
///
/// demo.shutdown().await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait CookieDemo: Send + Sync {
    /// Short name of the module, used in logs and the startup banner.
    fn name(&self) -> &'static str;

    /// Fires one add-cookie event onto the module's event bus.
    ///
    /// # Returns
    ///
    /// `Ok(())` once the event is on the bus, or
    /// [`PipelineError::BusClosed`] if no pipeline task is listening anymore.
    fn add_one_cookie(&self) -> Result<(), PipelineError>;

    /// Sets the selected strategy.
    ///
    /// Module A replaces its active routing (abandoning in-flight work);
    /// Module B changes which pipeline's filter passes future events.
    /// Re-selecting the current strategy is a real emission, not a no-op.
    fn select_strategy(&self, strategy: FlattenStrategy) -> Result<(), PipelineError>;

    /// The currently selected strategy.
    fn selected_strategy(&self) -> FlattenStrategy;

    /// Empties the response log. In-flight calls and the call counter are
    /// untouched; survivors append to the cleared log when they complete.
    async fn clear_cookies(&self);

    /// The shared context holding every observable output.
    fn context(&self) -> &Arc<BakeryContext>;

    /// Stops the module's background task(s), dropping any in-flight bakes.
    async fn shutdown(self: Box<Self>) -> Result<(), PipelineError>;
}
