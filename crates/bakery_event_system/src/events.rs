//! # Demo Events and Notifications
//!
//! This module defines the events that flow through the demo pipelines and the
//! notification records the pipelines leave behind for display. It also defines
//! the error type for pipeline plumbing failures.
//!
//! ## Event Categories
//!
//! ### User Events
//! Fired by user actions and dispatched on the pipeline event bus:
//! - Add-cookie events requesting one simulated bakery call
//!
//! ### Call Notifications
//! Observational records describing what happened to each call, kept in a
//! bounded log so the terminal can show the start/completion history rather
//! than only the final response log.
//!
//! ## Design Principles
//!
//! - **Type Safety**: Events and notifications are strongly typed structs
//! - **Serialization**: Built-in JSON serialization for log snapshots
//! - **Fire-time capture**: Events record the strategy selected when fired,
//!   so every pipeline routes an event the same way no matter when it
//!   processes it

use crate::types::{CallId, FlattenStrategy};
use crate::utils::current_timestamp;
use serde::{Deserialize, Serialize};

// ============================================================================
// User Events
// ============================================================================

/// Event fired each time the user requests a new cookie.
///
/// The payload is purely observational: the pipelines only need the fact that
/// the event occurred, plus the strategy that was selected at the moment it was
/// fired so the parallel listeners can agree on which single pipeline accepts
/// it. Events are transient and are not retained after dispatch.
///
/// # Examples
///
/// ```rust
/// use bakery_event_system::{AddCookieEvent, FlattenStrategy};
///
/// let event = AddCookieEvent::new(1, FlattenStrategy::Merge);
/// assert_eq!(event.sequence, 1);
/// assert_eq!(event.selected, FlattenStrategy::Merge);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AddCookieEvent {
    /// Bus-wide sequence number, assigned when the event is fired
    pub sequence: u64,
    /// Strategy that was selected at the moment the event was fired
    pub selected: FlattenStrategy,
    /// Unix timestamp (milliseconds) when the event was fired
    pub timestamp: u64,
}

impl AddCookieEvent {
    /// Creates a new add-cookie event stamped with the current time.
    ///
    /// # Arguments
    ///
    /// * `sequence` - Bus-wide sequence number for this event
    /// * `selected` - Strategy selected at fire time
    pub fn new(sequence: u64, selected: FlattenStrategy) -> Self {
        Self {
            sequence,
            selected,
            timestamp: current_timestamp(),
        }
    }
}

// ============================================================================
// Call Notifications
// ============================================================================

/// What happened to a simulated call (or to an event that never became one).
///
/// `Started`, `Completed` and `Abandoned` are tagged with the [`CallId`] they
/// describe. `EventDropped` is tagged with the event's bus sequence number
/// instead, because an exhaust-rejected event never starts a call and therefore
/// never consumes a call ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A call began baking
    Started {
        /// ID assigned to the call when it started
        call_id: CallId,
    },
    /// A call ran to completion and appended to the response log
    Completed {
        /// ID of the completed call
        call_id: CallId,
    },
    /// An in-flight call was torn down before completing; it will never append
    Abandoned {
        /// ID of the abandoned call
        call_id: CallId,
    },
    /// An event was rejected while the pipeline was busy (exhaust only)
    EventDropped {
        /// Bus sequence number of the rejected event
        sequence: u64,
    },
}

impl NotificationKind {
    /// Returns the call ID this notification describes, if it describes one.
    pub fn call_id(&self) -> Option<CallId> {
        match self {
            NotificationKind::Started { call_id }
            | NotificationKind::Completed { call_id }
            | NotificationKind::Abandoned { call_id } => Some(*call_id),
            NotificationKind::EventDropped { .. } => None,
        }
    }
}

/// One entry in the notification log.
///
/// Each record captures what happened, which pipeline strategy it happened
/// under, and when. The demo binary renders these as the textual call history;
/// tests read them to assert suppression behavior that the response log alone
/// cannot show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallNotification {
    /// What happened
    pub kind: NotificationKind,
    /// Strategy of the pipeline that produced this notification
    pub strategy: FlattenStrategy,
    /// Unix timestamp (milliseconds) when it happened
    pub timestamp: u64,
}

impl CallNotification {
    /// Records that a call started baking under the given strategy.
    pub fn started(call_id: CallId, strategy: FlattenStrategy) -> Self {
        Self {
            kind: NotificationKind::Started { call_id },
            strategy,
            timestamp: current_timestamp(),
        }
    }

    /// Records that a call completed and appended to the response log.
    pub fn completed(call_id: CallId, strategy: FlattenStrategy) -> Self {
        Self {
            kind: NotificationKind::Completed { call_id },
            strategy,
            timestamp: current_timestamp(),
        }
    }

    /// Records that an in-flight call was abandoned before completing.
    pub fn abandoned(call_id: CallId, strategy: FlattenStrategy) -> Self {
        Self {
            kind: NotificationKind::Abandoned { call_id },
            strategy,
            timestamp: current_timestamp(),
        }
    }

    /// Records that an event was rejected while the pipeline was busy.
    pub fn event_dropped(sequence: u64, strategy: FlattenStrategy) -> Self {
        Self {
            kind: NotificationKind::EventDropped { sequence },
            strategy,
            timestamp: current_timestamp(),
        }
    }
}

impl std::fmt::Display for CallNotification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            NotificationKind::Started { call_id } => {
                write!(f, "call {} started [{}]", call_id, self.strategy)
            }
            NotificationKind::Completed { call_id } => {
                write!(f, "call {} completed [{}]", call_id, self.strategy)
            }
            NotificationKind::Abandoned { call_id } => {
                write!(f, "call {} abandoned [{}]", call_id, self.strategy)
            }
            NotificationKind::EventDropped { sequence } => {
                write!(f, "event {} dropped [{}]", sequence, self.strategy)
            }
        }
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur in the pipeline plumbing.
///
/// The simulated calls themselves never fail; abandoned and dropped calls are
/// expected strategy outcomes, not errors. This enum covers the ways the
/// surrounding machinery can fail, such as publishing to a pipeline whose
/// background task has already stopped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The event bus has no live pipeline subscribed to it
    #[error("Event bus closed: {0}")]
    BusClosed(String),
    /// The strategy selection channel was dropped
    #[error("Selection channel closed: {0}")]
    SelectionClosed(String),
    /// A background pipeline task failed to stop cleanly
    #[error("Shutdown error: {0}")]
    ShutdownFailed(String),
    #[error("An unexpected error occurred: {0}")]
    Other(String),
}

// Tests module
mod tests;
