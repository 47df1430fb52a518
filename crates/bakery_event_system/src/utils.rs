//! # Utility Functions
//!
//! This module provides utility functions and convenience methods for the
//! Bakery Event System. These functions simplify common operations and
//! provide consistent interfaces across the entire system.
//!
//! ## Key Functions
//!
//! - [`current_timestamp()`] - Consistent timestamp generation
//! - [`create_bakery_context()`] - Shared context factory function
//!
//! ## Design Goals
//!
//! - **Consistency**: All timestamps use the same generation method
//! - **Convenience**: Simple factory functions for common operations
//! - **Safety**: All functions handle edge cases gracefully

use crate::context::BakeryContext;
use std::sync::Arc;

// ============================================================================
// Utility Functions
// ============================================================================

/// Returns the current Unix timestamp in milliseconds.
///
/// This function provides a consistent way to get timestamps across the
/// entire system. All events and notifications should use this function for
/// timestamp generation to ensure consistency. Millisecond resolution matters
/// here: simulated calls complete within seconds of each other and their
/// notifications must still sort correctly.
///
/// # Panics
///
/// Panics if the system clock is set to a time before the Unix epoch
/// (January 1, 1970). This should never happen in practice on modern systems.
///
/// # Returns
///
/// Current time as milliseconds since Unix epoch (1970-01-01 00:00:00 UTC).
pub fn current_timestamp() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}

/// Creates a new shared bakery context with default limits.
///
/// This is the primary factory function for creating the context that both
/// demo pipelines mutate. It returns an `Arc<BakeryContext>` that can be
/// safely shared across multiple tasks and stored in various places.
///
/// The returned context starts with an untouched call counter, an empty
/// response log, and an empty notification log.
///
/// # Returns
///
/// A new `Arc<BakeryContext>` ready for use.
pub fn create_bakery_context() -> Arc<BakeryContext> {
    Arc::new(BakeryContext::new())
}
