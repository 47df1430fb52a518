//! # Parallel Filtered Listeners (Module B)
//!
//! Four permanently-active pipeline tasks, one per strategy, all subscribed
//! to the same event bus. Every pipeline sees every event; an event is
//! accepted only by the pipeline whose strategy was selected at the moment
//! the event was fired, so exactly one filter passes per event. Unlike the
//! strategy router, nothing is ever torn down: each machine keeps its own
//! in-flight set and backlog across selection changes, and a concat backlog
//! accumulated before switching away keeps draining afterwards.
//!
//! Filtering on the fire-time stamp (rather than each task reading the live
//! selection at its own processing instant) is what keeps the four
//! independently-scheduled tasks in agreement about every event.

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
use tracing::{debug, info, trace, warn};

/// Handle to the four always-on listener pipelines.
///
/// Created with [`ParallelListeners::start`]. All four pipelines share one
/// context and one oven, so call IDs stay globally ordered no matter which
/// pipeline starts a call.
#[derive(Debug)]
pub struct ParallelListeners {
    context: Arc<BakeryContext>,
    events_tx: broadcast::Sender<AddCookieEvent>,
    selection_tx: watch::Sender<FlattenStrategy>,
    tasks: Vec<JoinHandle<()>>,
}

impl ParallelListeners {
    /// Spawns one listener task per strategy, all subscribed to a fresh bus.
    ///
    /// # Arguments
    ///
    /// * `context` - Shared context the pipelines mutate
    /// * `timing` - Delay bounds for simulated bakes
    /// * `bus_capacity` - Event bus capacity per pipeline subscription
    pub fn start(context: Arc<BakeryContext>, timing: BakeTiming, bus_capacity: usize) -> Self {
        let (events_tx, _) = broadcast::channel(bus_capacity.max(1));
        let (selection_tx, _) = watch::channel(FlattenStrategy::default());
        let oven = Oven::new(Arc::clone(&context), timing);

        let tasks = FlattenStrategy::ALL
            .iter()
            .map(|&strategy| {
                tokio::spawn(run_listener_loop(
                    strategy,
                    events_tx.subscribe(),
                    oven.clone(),
                ))
            })
            .collect();
        info!(
            "🚀 Parallel listeners started, one pipeline per strategy (initial selection: {})",
            FlattenStrategy::default()
        );

        Self {
            context,
            events_tx,
            selection_tx,
            tasks,
        }
    }
}

#[async_trait]
impl CookieDemo for ParallelListeners {
    fn name(&self) -> &'static str {
        "listeners"
    }

    fn add_one_cookie(&self) -> Result<(), PipelineError> {
        let event = AddCookieEvent::new(
            self.context.next_event_sequence(),
            *self.selection_tx.borrow(),
        );
        info!(
            "📨 [listeners] add-cookie event {} fired for the {} pipeline",
            event.sequence, event.selected
        );
        self.events_tx
            .send(event)
            .map(|_| ())
            .map_err(|e| PipelineError::BusClosed(format!("listener tasks stopped: {e}")))
    }

    fn select_strategy(&self, strategy: FlattenStrategy) -> Result<(), PipelineError> {
        // send_replace: the selection is read at fire time, no receiver needed
        let previous = self.selection_tx.send_replace(strategy);
        info!(
            "🔀 [listeners] strategy selected: {} (was {})",
            strategy, previous
        );
        Ok(())
    }

    fn selected_strategy(&self) -> FlattenStrategy {
        *self.selection_tx.borrow()
    }

    async fn clear_cookies(&self) {
        self.context.clear_responses().await;
        info!("🧹 [listeners] response log cleared");
    }

    fn context(&self) -> &Arc<BakeryContext> {
        &self.context
    }

    async fn shutdown(self: Box<Self>) -> Result<(), PipelineError> {
        info!("🛑 [listeners] shutting down all pipelines");
        let Self { tasks, .. } = *self;
        let mut first_error = None;
        for task in tasks {
            task.abort();
            match task.await {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => {}
                Err(e) => {
                    warn!("⚠️ [listeners] pipeline task failed to stop: {e}");
                    first_error.get_or_insert(PipelineError::ShutdownFailed(e.to_string()));
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// One always-on pipeline: filter on the fire-time stamp, then flatten.
async fn run_listener_loop(
    strategy: FlattenStrategy,
    mut events_rx: broadcast::Receiver<AddCookieEvent>,
    oven: Oven,
) {
    let mut machine = FlattenMachine::new(strategy);

    loop {
        tokio::select! {
            biased;

            Some(call_id) = machine.next_completion(), if !machine.is_idle() => {
                machine.finish_call(call_id, &oven).await;
            }
            event = events_rx.recv() => match event {
                Ok(event) if event.selected == strategy => {
                    machine.handle_event(event, &oven).await;
                }
                Ok(event) => {
                    trace!(
                        "[{}] event {} ignored (fired for {})",
                        strategy, event.sequence, event.selected
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("⚠️ [{}] event bus lagged, {} events skipped", strategy, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!("👋 [{}] listener pipeline stopped", strategy);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CallId;
    use std::time::Duration;

    fn start_fast_listeners() -> (Arc<BakeryContext>, ParallelListeners) {
        let context = Arc::new(BakeryContext::new());
        let listeners =
            ParallelListeners::start(Arc::clone(&context), BakeTiming::new(50, 60), 64);
        (context, listeners)
    }

    #[tokio::test]
    async fn test_event_routes_only_through_the_selected_pipeline() {
        let (context, listeners) = start_fast_listeners();
        assert_eq!(listeners.selected_strategy(), FlattenStrategy::Switch);

        listeners.add_one_cookie().unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;

        // One pipeline accepted it; three ignored it
        assert_eq!(context.responses().await, vec![CallId(1)]);
        assert_eq!(context.stats().await.calls_started, 1);

        Box::new(listeners).shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_concat_backlog_keeps_draining_after_switching_away() {
        let (context, listeners) = start_fast_listeners();

        listeners.select_strategy(FlattenStrategy::Concat).unwrap();
        for _ in 0..3 {
            listeners.add_one_cookie().unwrap();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;

        // First event is baking, two wait in the concat backlog
        assert_eq!(context.in_flight_count(), 1);
        assert_eq!(context.last_call_id(), 1);

        // Switching away must not reset the concat pipeline's state
        listeners.select_strategy(FlattenStrategy::Merge).unwrap();
        listeners.add_one_cookie().unwrap();

        tokio::time::sleep(Duration::from_millis(400)).await;

        let responses = context.responses().await;
        assert_eq!(responses.len(), 4);
        assert_eq!(context.stats().await.calls_abandoned, 0);

        // The concat pipeline finished its backlog in arrival order
        let merge_call = CallId(2);
        let concat_order: Vec<CallId> = responses
            .iter()
            .copied()
            .filter(|id| *id != merge_call)
            .collect();
        assert_eq!(concat_order, vec![CallId(1), CallId(3), CallId(4)]);

        Box::new(listeners).shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_busy_exhaust_pipeline_stays_busy_across_selection_changes() {
        let (context, listeners) = start_fast_listeners();

        listeners.select_strategy(FlattenStrategy::Exhaust).unwrap();
        listeners.add_one_cookie().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(context.in_flight_count(), 1);

        // Selection round trip while call 1 is still baking
        listeners.select_strategy(FlattenStrategy::Merge).unwrap();
        listeners.select_strategy(FlattenStrategy::Exhaust).unwrap();
        listeners.add_one_cookie().unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;

        // The exhaust machine was still busy, so the second event was dropped
        assert_eq!(context.responses().await, vec![CallId(1)]);
        assert_eq!(context.stats().await.events_dropped, 1);
        assert_eq!(context.last_call_id(), 1);

        Box::new(listeners).shutdown().await.unwrap();
    }
}
