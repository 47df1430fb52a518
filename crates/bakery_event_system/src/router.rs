//! # Strategy-Routed Pipeline (Module A)
//!
//! One background task owns one [`FlattenMachine`] and re-routes the event
//! stream through whichever strategy is currently selected. Selecting a
//! strategy replaces the active routing: every in-flight bake of the old
//! routing is abandoned, a queued concat backlog is discarded, and a fresh
//! machine state takes over for subsequent events. Every selection emission
//! resets the routing this way, including re-selecting the strategy that is
//! already active.
//!
//! ## Processing Order
//!
//! The routing loop is biased: elapsed completions are observed first, then
//! selection changes, then new events. A bake whose delay has already elapsed
//! therefore appends before a later user action can tear it down.

use crate::context::BakeryContext;
use crate::demo::CookieDemo;
use crate::events::{AddCookieEvent, PipelineError};
use crate::flatten::FlattenMachine;
use crate::oven::{BakeTiming, Oven};
use crate::types::FlattenStrategy;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Handle to the strategy-routed demo pipeline.
///
/// Created with [`StrategyRouter::start`], which spawns the routing task.
/// Dropping the handle without calling
/// [`shutdown`](CookieDemo::shutdown) closes the channels, which stops the
/// task once it observes them closed.
#[derive(Debug)]
pub struct StrategyRouter {
    context: Arc<BakeryContext>,
    events_tx: broadcast::Sender<AddCookieEvent>,
    selection_tx: watch::Sender<FlattenStrategy>,
    task: JoinHandle<()>,
}

impl StrategyRouter {
    /// Starts the routing task with the default initial strategy (switch).
    ///
    /// # Arguments
    ///
    /// * `context` - Shared context the pipeline mutates
    /// * `timing` - Delay bounds for simulated bakes
    /// * `bus_capacity` - Event bus capacity; a burst larger than this while
    ///   the loop is busy gets the oldest events discarded with a lag warning
    pub fn start(context: Arc<BakeryContext>, timing: BakeTiming, bus_capacity: usize) -> Self {
        let (events_tx, events_rx) = broadcast::channel(bus_capacity.max(1));
        let (selection_tx, selection_rx) = watch::channel(FlattenStrategy::default());
        let oven = Oven::new(Arc::clone(&context), timing);

        let task = tokio::spawn(run_routing_loop(events_rx, selection_rx, oven));
        info!(
            "🚀 Strategy router started (initial strategy: {})",
            FlattenStrategy::default()
        );

        Self {
            context,
            events_tx,
            selection_tx,
            task,
        }
    }
}

#[async_trait]
impl CookieDemo for StrategyRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn add_one_cookie(&self) -> Result<(), PipelineError> {
        let event = AddCookieEvent::new(
            self.context.next_event_sequence(),
            *self.selection_tx.borrow(),
        );
        info!("📨 [router] add-cookie event {} fired", event.sequence);
        self.events_tx
            .send(event)
            .map(|_| ())
            .map_err(|e| PipelineError::BusClosed(format!("routing task stopped: {e}")))
    }

    fn select_strategy(&self, strategy: FlattenStrategy) -> Result<(), PipelineError> {
        self.selection_tx
            .send(strategy)
            .map_err(|e| PipelineError::SelectionClosed(format!("routing task stopped: {e}")))
    }

    fn selected_strategy(&self) -> FlattenStrategy {
        *self.selection_tx.borrow()
    }

    async fn clear_cookies(&self) {
        self.context.clear_responses().await;
        info!("🧹 [router] response log cleared");
    }

    fn context(&self) -> &Arc<BakeryContext> {
        &self.context
    }

    async fn shutdown(self: Box<Self>) -> Result<(), PipelineError> {
        info!("🛑 [router] shutting down");
        let Self { task, .. } = *self;
        task.abort();
        match task.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(PipelineError::ShutdownFailed(e.to_string())),
        }
    }
}

/// The routing loop: one machine, re-created on every selection emission.
async fn run_routing_loop(
    mut events_rx: broadcast::Receiver<AddCookieEvent>,
    mut selection_rx: watch::Receiver<FlattenStrategy>,
    oven: Oven,
) {
    let mut machine = FlattenMachine::new(*selection_rx.borrow_and_update());

    loop {
        tokio::select! {
            biased;

            Some(call_id) = machine.next_completion(), if !machine.is_idle() => {
                machine.finish_call(call_id, &oven).await;
            }
            changed = selection_rx.changed() => match changed {
                Ok(()) => {
                    let strategy = *selection_rx.borrow_and_update();
                    info!("🔀 [router] strategy selected: {} (routing replaced)", strategy);
                    machine.reroute(strategy, &oven).await;
                }
                Err(_) => break,
            },
            event = events_rx.recv() => match event {
                Ok(event) => machine.handle_event(event, &oven).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ [router] event bus lagged, {} events skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!("👋 [router] routing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NotificationKind;
    use crate::types::CallId;
    use std::time::Duration;

    fn start_fast_router() -> (Arc<BakeryContext>, StrategyRouter) {
        let context = Arc::new(BakeryContext::new());
        let router = StrategyRouter::start(Arc::clone(&context), BakeTiming::new(50, 60), 64);
        (context, router)
    }

    #[tokio::test]
    async fn test_router_starts_on_switch() {
        let (_context, router) = start_fast_router();
        assert_eq!(router.selected_strategy(), FlattenStrategy::Switch);
        assert_eq!(router.name(), "router");
        Box::new(router).shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_selection_change_abandons_in_flight_work() {
        let (context, router) = start_fast_router();

        router.add_one_cookie().unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(context.in_flight_count(), 1);

        router.select_strategy(FlattenStrategy::Merge).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // Call 1 was abandoned by the reroute and never appended
        assert!(context.responses().await.is_empty());
        let stats = context.stats().await;
        assert_eq!(stats.calls_abandoned, 1);
        assert_eq!(stats.in_flight, 0);

        // The abandonment shows up in the call history
        let notifications = context.notifications().await;
        assert!(notifications
            .iter()
            .any(|n| matches!(n.kind, NotificationKind::Abandoned { call_id: CallId(1) })));

        Box::new(router).shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_reselecting_current_strategy_resets_the_routing() {
        let (context, router) = start_fast_router();
        router.select_strategy(FlattenStrategy::Concat).unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;

        for _ in 0..3 {
            router.add_one_cookie().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(5)).await;

        // One baking, two queued; re-selecting concat discards the backlog
        router.select_strategy(FlattenStrategy::Concat).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(context.responses().await.is_empty());
        let stats = context.stats().await;
        assert_eq!(stats.calls_started, 1);
        assert_eq!(stats.calls_abandoned, 1);

        // The routing still works after the reset
        router.add_one_cookie().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(context.responses().await, vec![CallId(2)]);

        Box::new(router).shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_operations_fail_after_shutdown_stops_the_task() {
        let (_context, router) = start_fast_router();

        let events_tx = router.events_tx.clone();
        Box::new(router).shutdown().await.unwrap();

        // The routing task is gone, so the bus has no subscribers left
        let event = AddCookieEvent::new(1, FlattenStrategy::Switch);
        assert!(events_tx.send(event).is_err());
    }
}
