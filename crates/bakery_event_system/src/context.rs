//! # Shared Bakery Context
//!
//! This module defines the shared state that both demo pipelines mutate: the
//! call counter, the response log, the notification log, and the in-flight
//! call registry. The context replaces the ambient globals of a typical UI
//! demo with one explicit object passed to every call site.
//!
//! ## Key Types
//!
//! - [`BakeryContext`] - Shared counter, logs, and registry
//! - [`InFlightCall`] - One entry in the in-flight registry
//! - [`BakeryStats`] - Point-in-time statistics snapshot
//!
//! ## Design Principles
//!
//! - **Explicit Sharing**: All mutable demo state lives here, behind an `Arc`
//! - **Monotonic Counter**: Call IDs only ever move forward and survive log
//!   clears
//! - **Bounded History**: The notification log is a ring so a long-running
//!   demo cannot grow without limit
//!
//! ## Thread Safety
//!
//! All operations are safe to call from multiple tasks concurrently. Locks
//! protect only short, await-free critical sections.

use crate::events::CallNotification;
use crate::types::{CallId, FlattenStrategy};
use crate::utils::current_timestamp;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

/// Default capacity of the notification ring.
pub const DEFAULT_NOTIFICATION_LIMIT: usize = 256;

// ============================================================================
// Registry Entry
// ============================================================================

/// One call currently baking, as tracked by the in-flight registry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InFlightCall {
    /// ID assigned when the call started
    pub call_id: CallId,
    /// Strategy of the pipeline that started it
    pub strategy: FlattenStrategy,
    /// Unix timestamp (milliseconds) when it started
    pub started_at: u64,
}

// ============================================================================
// Statistics Snapshot
// ============================================================================

/// Point-in-time view of everything the context has counted.
///
/// Snapshots are cheap to take and serialize; the demo binary's monitoring
/// task logs one periodically and the `stats` prompt command prints one on
/// demand.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BakeryStats {
    /// Add-cookie events fired on the bus
    pub events_fired: u64,
    /// Calls that actually started baking
    pub calls_started: u64,
    /// Calls that ran to completion and appended to the response log
    pub calls_completed: u64,
    /// In-flight calls torn down before completing
    pub calls_abandoned: u64,
    /// Events rejected while a pipeline was busy (exhaust)
    pub events_dropped: u64,
    /// Entries currently in the response log (clears reset this, not the counter)
    pub responses_logged: usize,
    /// Calls baking right now
    pub in_flight: usize,
    /// Highest call ID assigned so far (0 if no call has started)
    pub last_call_id: u64,
}

// ============================================================================
// Shared Context
// ============================================================================

/// Shared state for both demo pipelines.
///
/// The context owns the process-wide call counter, the response log (completion
/// order), the bounded notification log, the in-flight registry, and the
/// statistics counters. Pipelines never talk to each other directly; everything
/// observable flows through here.
///
/// # Examples
///
/// ```rust
/// use bakery_event_system::create_bakery_context;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let context = create_bakery_context();
/// assert!(context.responses().await.is_empty());
/// assert_eq!(context.stats().await.last_call_id, 0);
/// # }
/// ```
#[derive(Debug)]
pub struct BakeryContext {
    /// Process-wide monotonic call counter; the next call takes `value + 1`
    call_counter: AtomicU64,
    /// Bus-wide sequence counter for add-cookie events
    event_sequence: AtomicU64,
    /// Completed call IDs, in completion order
    responses: RwLock<Vec<CallId>>,
    /// Bounded ring of call notifications, oldest first
    notifications: RwLock<VecDeque<CallNotification>>,
    /// Maximum entries retained in the notification ring
    notification_limit: usize,
    /// Calls currently baking, keyed by call ID
    in_flight: DashMap<CallId, InFlightCall>,
    calls_started: AtomicU64,
    calls_completed: AtomicU64,
    calls_abandoned: AtomicU64,
    events_dropped: AtomicU64,
}

impl BakeryContext {
    /// Creates a context with the default notification limit.
    pub fn new() -> Self {
        Self::with_notification_limit(DEFAULT_NOTIFICATION_LIMIT)
    }

    /// Creates a context retaining at most `limit` notifications.
    ///
    /// A limit of zero disables notification retention entirely; the counters
    /// and the response log still work normally.
    pub fn with_notification_limit(limit: usize) -> Self {
        Self {
            call_counter: AtomicU64::new(0),
            event_sequence: AtomicU64::new(0),
            responses: RwLock::new(Vec::new()),
            notifications: RwLock::new(VecDeque::new()),
            notification_limit: limit,
            in_flight: DashMap::new(),
            calls_started: AtomicU64::new(0),
            calls_completed: AtomicU64::new(0),
            calls_abandoned: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
        }
    }

    /// Assigns the next event sequence number. Sequences start at 1.
    pub fn next_event_sequence(&self) -> u64 {
        self.event_sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Starts a call: assigns the next ID, registers it as in-flight, and
    /// records a started notification.
    ///
    /// The counter is shared across every pipeline holding this context, so
    /// IDs are strictly increasing in initiation order no matter which
    /// pipeline starts the call. Call IDs start at 1.
    pub async fn begin_call(&self, strategy: FlattenStrategy) -> CallId {
        let call_id = CallId(self.call_counter.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls_started.fetch_add(1, Ordering::SeqCst);
        self.in_flight.insert(
            call_id,
            InFlightCall {
                call_id,
                strategy,
                started_at: current_timestamp(),
            },
        );
        self.push_notification(CallNotification::started(call_id, strategy))
            .await;
        call_id
    }

    /// Completes a call: removes it from the registry, appends its ID to the
    /// response log, and records a completed notification.
    pub async fn complete_call(&self, call_id: CallId, strategy: FlattenStrategy) {
        self.in_flight.remove(&call_id);
        self.calls_completed.fetch_add(1, Ordering::SeqCst);
        self.responses.write().await.push(call_id);
        self.push_notification(CallNotification::completed(call_id, strategy))
            .await;
    }

    /// Abandons an in-flight call: removes it from the registry and records an
    /// abandoned notification. The call's ID will never reach the response log.
    pub async fn abandon_call(&self, call_id: CallId, strategy: FlattenStrategy) {
        self.in_flight.remove(&call_id);
        self.calls_abandoned.fetch_add(1, Ordering::SeqCst);
        self.push_notification(CallNotification::abandoned(call_id, strategy))
            .await;
    }

    /// Records an event rejected while its pipeline was busy. No call ID is
    /// consumed.
    pub async fn record_dropped_event(&self, sequence: u64, strategy: FlattenStrategy) {
        self.events_dropped.fetch_add(1, Ordering::SeqCst);
        self.push_notification(CallNotification::event_dropped(sequence, strategy))
            .await;
    }

    /// Empties the response log. The call counter, in-flight calls, and the
    /// notification log are untouched; calls still baking will append to the
    /// freshly cleared log when they complete.
    pub async fn clear_responses(&self) {
        self.responses.write().await.clear();
    }

    /// Returns a snapshot of the response log, in completion order.
    pub async fn responses(&self) -> Vec<CallId> {
        self.responses.read().await.clone()
    }

    /// Returns a snapshot of the notification log, oldest first.
    pub async fn notifications(&self) -> Vec<CallNotification> {
        self.notifications.read().await.iter().copied().collect()
    }

    /// Returns the calls currently baking, ordered by call ID.
    pub fn in_flight_snapshot(&self) -> Vec<InFlightCall> {
        let mut calls: Vec<InFlightCall> =
            self.in_flight.iter().map(|entry| *entry.value()).collect();
        calls.sort_by_key(|call| call.call_id);
        calls
    }

    /// Number of calls currently baking.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Highest call ID assigned so far; 0 if no call has started.
    pub fn last_call_id(&self) -> u64 {
        self.call_counter.load(Ordering::SeqCst)
    }

    /// Takes a statistics snapshot.
    pub async fn stats(&self) -> BakeryStats {
        BakeryStats {
            events_fired: self.event_sequence.load(Ordering::SeqCst),
            calls_started: self.calls_started.load(Ordering::SeqCst),
            calls_completed: self.calls_completed.load(Ordering::SeqCst),
            calls_abandoned: self.calls_abandoned.load(Ordering::SeqCst),
            events_dropped: self.events_dropped.load(Ordering::SeqCst),
            responses_logged: self.responses.read().await.len(),
            in_flight: self.in_flight.len(),
            last_call_id: self.call_counter.load(Ordering::SeqCst),
        }
    }

    async fn push_notification(&self, notification: CallNotification) {
        if self.notification_limit == 0 {
            return;
        }
        let mut ring = self.notifications.write().await;
        ring.push_back(notification);
        while ring.len() > self.notification_limit {
            ring.pop_front();
        }
    }
}

impl Default for BakeryContext {
    fn default() -> Self {
        Self::new()
    }
}
