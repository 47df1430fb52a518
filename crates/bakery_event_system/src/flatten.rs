//! # Flattening State Machine
//!
//! This module reimplements the four reactive flattening operators as one
//! explicit state machine instead of depending on a reactive-streams library.
//! A machine is either idle or busy (its in-flight set is empty or not), and
//! each strategy answers the same question differently: what happens when a
//! new event arrives while calls are still baking?
//!
//! - **switch**: abandon everything in flight, start the new call
//! - **concat**: push the event onto a backlog; calls run one at a time in
//!   arrival order
//! - **merge**: start the new call immediately, in parallel
//! - **exhaust**: drop the event entirely while busy
//!
//! The backlog holds *events*, not pre-built futures: a call ID is only drawn
//! from the shared counter at the moment its bake actually starts, so IDs
//! stay strictly increasing in initiation order even when several pipelines
//! share one counter.
//!
//! Each machine is owned by exactly one pipeline task. Nothing here is
//! locked; mutation happens only between the owning task's await points.

use crate::events::AddCookieEvent;
use crate::oven::Oven;
use crate::types::{CallId, FlattenStrategy};
use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::VecDeque;
use tracing::{debug, warn};

/// Per-pipeline flattening state: the active strategy, the in-flight bakes,
/// and (for concat) the backlog of events waiting their turn.
///
/// Completion side effects live inside the bake futures held in the in-flight
/// set, so abandoning work is simply dropping those futures. The machine
/// records the abandonment in the shared context before doing so, which keeps
/// the in-flight registry and the notification log truthful.
pub struct FlattenMachine {
    strategy: FlattenStrategy,
    in_flight: FuturesUnordered<BoxFuture<'static, CallId>>,
    in_flight_ids: Vec<CallId>,
    backlog: VecDeque<AddCookieEvent>,
}

impl FlattenMachine {
    /// Creates an idle machine for the given strategy.
    pub fn new(strategy: FlattenStrategy) -> Self {
        Self {
            strategy,
            in_flight: FuturesUnordered::new(),
            in_flight_ids: Vec::new(),
            backlog: VecDeque::new(),
        }
    }

    /// The strategy this machine currently applies.
    pub fn strategy(&self) -> FlattenStrategy {
        self.strategy
    }

    /// True when nothing is baking. A non-empty backlog implies busy, because
    /// events are only queued while a call is in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Number of calls this machine currently has baking.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight_ids.len()
    }

    /// Number of events waiting in the concat backlog.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }

    /// Applies the machine's strategy to one incoming event.
    pub async fn handle_event(&mut self, event: AddCookieEvent, oven: &Oven) {
        match self.strategy {
            FlattenStrategy::Switch => {
                self.abandon_in_flight(oven).await;
                self.launch(oven).await;
            }
            FlattenStrategy::Concat => {
                if self.is_idle() {
                    self.launch(oven).await;
                } else {
                    debug!(
                        "⏳ [concat] event {} queued behind {} pending",
                        event.sequence,
                        self.backlog.len()
                    );
                    self.backlog.push_back(event);
                }
            }
            FlattenStrategy::Merge => {
                self.launch(oven).await;
            }
            FlattenStrategy::Exhaust => {
                if self.is_idle() {
                    self.launch(oven).await;
                } else {
                    warn!(
                        "🚫 [exhaust] event {} dropped, oven busy with call {}",
                        event.sequence,
                        self.in_flight_ids
                            .first()
                            .map(|id| id.value())
                            .unwrap_or_default()
                    );
                    oven.context()
                        .record_dropped_event(event.sequence, self.strategy)
                        .await;
                }
            }
        }
    }

    /// Waits for the next in-flight bake to complete.
    ///
    /// Returns `None` immediately when the machine is idle, so pipeline loops
    /// guard this arm with [`is_idle`](Self::is_idle). Cancel-safe: dropping
    /// the returned future loses nothing, completions stay queued in the
    /// in-flight set until polled out.
    pub async fn next_completion(&mut self) -> Option<CallId> {
        self.in_flight.next().await
    }

    /// Bookkeeping after a completed bake: under concat, the next queued event
    /// (if any) starts baking now.
    pub async fn finish_call(&mut self, call_id: CallId, oven: &Oven) {
        self.in_flight_ids.retain(|id| *id != call_id);
        if self.strategy == FlattenStrategy::Concat {
            if let Some(event) = self.backlog.pop_front() {
                debug!(
                    "▶ [concat] event {} dequeued, {} still pending",
                    event.sequence,
                    self.backlog.len()
                );
                self.launch(oven).await;
            }
        }
    }

    /// Replaces the active routing: abandons all in-flight bakes, discards any
    /// backlog, and switches to the new strategy.
    ///
    /// Discarded backlog events never started, so they consume no call IDs.
    /// Called for every selection emission, including re-selecting the current
    /// strategy, which deliberately resets the routing the same way.
    pub async fn reroute(&mut self, new_strategy: FlattenStrategy, oven: &Oven) {
        self.abandon_in_flight(oven).await;
        if !self.backlog.is_empty() {
            debug!(
                "🗑 [{}] {} queued events discarded on reroute",
                self.strategy,
                self.backlog.len()
            );
            self.backlog.clear();
        }
        self.strategy = new_strategy;
    }

    async fn launch(&mut self, oven: &Oven) {
        let (call_id, bake) = oven.bake(self.strategy).await;
        self.in_flight_ids.push(call_id);
        self.in_flight.push(bake);
    }

    async fn abandon_in_flight(&mut self, oven: &Oven) {
        if self.in_flight_ids.is_empty() {
            return;
        }
        for call_id in self.in_flight_ids.drain(..) {
            warn!("⚠️ [{}] call {} abandoned before completing", self.strategy, call_id);
            oven.context().abandon_call(call_id, self.strategy).await;
        }
        // Dropping the set drops the bake futures, so none of them can append
        self.in_flight = FuturesUnordered::new();
    }
}

impl std::fmt::Debug for FlattenMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlattenMachine")
            .field("strategy", &self.strategy)
            .field("in_flight", &self.in_flight_ids)
            .field("backlog", &self.backlog.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::BakeryContext;
    use crate::oven::BakeTiming;
    use std::sync::Arc;

    fn test_oven(context: &Arc<BakeryContext>) -> Oven {
        Oven::new(Arc::clone(context), BakeTiming::new(5, 8))
    }

    fn next_event(context: &BakeryContext, strategy: FlattenStrategy) -> AddCookieEvent {
        AddCookieEvent::new(context.next_event_sequence(), strategy)
    }

    async fn drain(machine: &mut FlattenMachine, oven: &Oven) {
        while let Some(call_id) = machine.next_completion().await {
            machine.finish_call(call_id, oven).await;
        }
    }

    #[tokio::test]
    async fn test_switch_keeps_only_the_latest_call() {
        let context = Arc::new(BakeryContext::new());
        let oven = test_oven(&context);
        let mut machine = FlattenMachine::new(FlattenStrategy::Switch);

        for _ in 0..3 {
            let event = next_event(&context, FlattenStrategy::Switch);
            machine.handle_event(event, &oven).await;
        }
        assert_eq!(machine.in_flight_count(), 1);

        drain(&mut machine, &oven).await;

        assert_eq!(context.responses().await, vec![CallId(3)]);
        let stats = context.stats().await;
        assert_eq!(stats.calls_started, 3);
        assert_eq!(stats.calls_abandoned, 2);
        assert_eq!(stats.calls_completed, 1);
    }

    #[tokio::test]
    async fn test_concat_runs_strictly_in_arrival_order() {
        let context = Arc::new(BakeryContext::new());
        let oven = test_oven(&context);
        let mut machine = FlattenMachine::new(FlattenStrategy::Concat);

        for _ in 0..3 {
            let event = next_event(&context, FlattenStrategy::Concat);
            machine.handle_event(event, &oven).await;
        }

        // Only the first event started; the rest wait their turn as events
        assert_eq!(machine.in_flight_count(), 1);
        assert_eq!(machine.backlog_len(), 2);
        assert_eq!(context.last_call_id(), 1);

        drain(&mut machine, &oven).await;

        assert_eq!(
            context.responses().await,
            vec![CallId(1), CallId(2), CallId(3)]
        );
        assert_eq!(context.stats().await.calls_abandoned, 0);
    }

    #[tokio::test]
    async fn test_merge_bakes_everything_in_parallel() {
        let context = Arc::new(BakeryContext::new());
        let oven = test_oven(&context);
        let mut machine = FlattenMachine::new(FlattenStrategy::Merge);

        for _ in 0..3 {
            let event = next_event(&context, FlattenStrategy::Merge);
            machine.handle_event(event, &oven).await;
        }
        assert_eq!(machine.in_flight_count(), 3);

        drain(&mut machine, &oven).await;

        let mut responses = context.responses().await;
        assert_eq!(responses.len(), 3);
        responses.sort();
        assert_eq!(responses, vec![CallId(1), CallId(2), CallId(3)]);
        assert_eq!(context.stats().await.calls_completed, 3);
    }

    #[tokio::test]
    async fn test_exhaust_drops_events_while_busy() {
        let context = Arc::new(BakeryContext::new());
        let oven = test_oven(&context);
        let mut machine = FlattenMachine::new(FlattenStrategy::Exhaust);

        machine
            .handle_event(next_event(&context, FlattenStrategy::Exhaust), &oven)
            .await;
        machine
            .handle_event(next_event(&context, FlattenStrategy::Exhaust), &oven)
            .await;

        // The second event was rejected without drawing a call ID
        assert_eq!(machine.in_flight_count(), 1);
        assert_eq!(context.last_call_id(), 1);
        assert_eq!(context.stats().await.events_dropped, 1);

        drain(&mut machine, &oven).await;
        assert_eq!(context.responses().await, vec![CallId(1)]);

        // Idle again: the next event starts the next consecutive call
        machine
            .handle_event(next_event(&context, FlattenStrategy::Exhaust), &oven)
            .await;
        assert_eq!(context.last_call_id(), 2);
        drain(&mut machine, &oven).await;
        assert_eq!(context.responses().await, vec![CallId(1), CallId(2)]);
    }

    #[tokio::test]
    async fn test_reroute_abandons_in_flight_and_discards_backlog() {
        let context = Arc::new(BakeryContext::new());
        let oven = test_oven(&context);
        let mut machine = FlattenMachine::new(FlattenStrategy::Concat);

        for _ in 0..3 {
            let event = next_event(&context, FlattenStrategy::Concat);
            machine.handle_event(event, &oven).await;
        }
        assert_eq!(machine.backlog_len(), 2);

        machine.reroute(FlattenStrategy::Merge, &oven).await;
        assert_eq!(machine.strategy(), FlattenStrategy::Merge);
        assert!(machine.is_idle());
        assert_eq!(machine.backlog_len(), 0);

        // The discarded backlog never consumed IDs, so the next call is 2
        machine
            .handle_event(next_event(&context, FlattenStrategy::Merge), &oven)
            .await;
        assert_eq!(context.last_call_id(), 2);

        drain(&mut machine, &oven).await;
        assert_eq!(context.responses().await, vec![CallId(2)]);
        assert_eq!(context.stats().await.calls_abandoned, 1);
    }

    #[tokio::test]
    async fn test_next_completion_returns_none_when_idle() {
        let mut machine = FlattenMachine::new(FlattenStrategy::Merge);
        assert_eq!(machine.next_completion().await, None);
    }
}
