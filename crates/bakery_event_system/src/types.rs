//! # Core Type Definitions
//!
//! This module contains the fundamental types used throughout the Bakery Event System.
//! These types provide the building blocks for call identification and strategy
//! selection across both demo pipelines.
//!
//! ## Key Types
//!
//! - [`CallId`] - Unique identifier for one simulated bakery call
//! - [`FlattenStrategy`] - The four event-flattening policies a pipeline can apply
//!
//! ## Design Principles
//!
//! - **Type Safety**: Wrapper types prevent call numbers from being confused with
//!   plain counters or event sequence numbers
//! - **Ordering**: Call IDs are totally ordered so logs can assert initiation order
//! - **Serialization**: All types support JSON serialization for log snapshots

use serde::{Deserialize, Serialize};

// ============================================================================
// Core Types (Minimal set)
// ============================================================================

/// Unique identifier for a simulated bakery call.
///
/// This is a wrapper around the shared call counter's value, captured at the
/// moment a call actually starts baking. IDs are strictly increasing in
/// initiation order across every pipeline that shares a context, and are never
/// reused or reassigned.
///
/// # Examples
///
/// ```rust
/// use bakery_event_system::CallId;
///
/// let first = CallId(1);
/// let second = CallId(2);
/// assert!(first < second);
/// println!("Completed call {}", second);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CallId(pub u64);

impl CallId {
    /// Returns the raw call number.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CallId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four flattening strategies a pipeline can apply to incoming events.
///
/// Each strategy answers the same question differently: what happens when a new
/// add-cookie event arrives while a previous call is still baking?
///
/// - [`Switch`](FlattenStrategy::Switch) abandons the in-flight call and starts the new one
/// - [`Concat`](FlattenStrategy::Concat) queues the event until the oven is free
/// - [`Merge`](FlattenStrategy::Merge) bakes everything in parallel
/// - [`Exhaust`](FlattenStrategy::Exhaust) drops the event entirely while busy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlattenStrategy {
    /// Abandon in-flight work and start the newest; only the latest completion is observed
    Switch,
    /// Queue events and run them one at a time, strictly in arrival order
    Concat,
    /// Run every event's work immediately, in parallel
    Merge,
    /// Ignore events that arrive while work is in flight
    Exhaust,
}

impl FlattenStrategy {
    /// All strategies, in the order the parallel listeners are set up.
    pub const ALL: [FlattenStrategy; 4] = [
        FlattenStrategy::Switch,
        FlattenStrategy::Concat,
        FlattenStrategy::Merge,
        FlattenStrategy::Exhaust,
    ];

    /// Returns the lowercase name used in logs, config files, and prompt commands.
    pub fn name(&self) -> &'static str {
        match self {
            FlattenStrategy::Switch => "switch",
            FlattenStrategy::Concat => "concat",
            FlattenStrategy::Merge => "merge",
            FlattenStrategy::Exhaust => "exhaust",
        }
    }
}

impl std::fmt::Display for FlattenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FlattenStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "switch" => Ok(FlattenStrategy::Switch),
            "concat" => Ok(FlattenStrategy::Concat),
            "merge" => Ok(FlattenStrategy::Merge),
            "exhaust" => Ok(FlattenStrategy::Exhaust),
            other => Err(format!(
                "Unknown flattening strategy '{}'. Valid values: switch, concat, merge, exhaust",
                other
            )),
        }
    }
}

impl Default for FlattenStrategy {
    fn default() -> Self {
        Self::Switch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_call_id_ordering_and_display() {
        let earlier = CallId(3);
        let later = CallId(7);
        assert!(earlier < later);
        assert_eq!(earlier.value(), 3);
        assert_eq!(format!("{}", later), "7");
    }

    #[test]
    fn test_strategy_round_trips_through_names() {
        for strategy in FlattenStrategy::ALL {
            let parsed = FlattenStrategy::from_str(strategy.name());
            assert_eq!(parsed, Ok(strategy));
        }
    }

    #[test]
    fn test_strategy_parse_is_case_insensitive() {
        assert_eq!(
            FlattenStrategy::from_str("SWITCH"),
            Ok(FlattenStrategy::Switch)
        );
        assert_eq!(
            FlattenStrategy::from_str("  Merge "),
            Ok(FlattenStrategy::Merge)
        );
    }

    #[test]
    fn test_strategy_parse_rejects_unknown_names() {
        let result = FlattenStrategy::from_str("flatMap");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("flatmap"));
    }

    #[test]
    fn test_default_strategy_is_switch() {
        assert_eq!(FlattenStrategy::default(), FlattenStrategy::Switch);
    }
}
