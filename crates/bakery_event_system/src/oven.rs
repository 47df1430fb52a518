//! # Simulated Oven
//!
//! This module simulates the slow asynchronous call behind every accepted
//! add-cookie event: the oven. A bake assigns the next
//! call ID, waits a randomized delay, then appends the ID to the response
//! log. Bakes never fail; the only way a bake does not complete is being
//! dropped by its pipeline, which is exactly how strategies cancel work.
//!
//! ## Key Types
//!
//! - [`BakeTiming`] - Randomized delay bounds for a bake
//! - [`Oven`] - Starts bakes and hands back cancellable futures
//!
//! ## Cancellation
//!
//! The completion side effects (response-log append, completed notification)
//! live inside the returned future. Dropping the future before it resolves
//! suppresses them structurally; there is no completion callback to suppress
//! after the fact.

use crate::context::BakeryContext;
use crate::types::{CallId, FlattenStrategy};
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

// ============================================================================
// Bake Timing
// ============================================================================

/// Delay bounds for simulated bakes, sampled uniformly from
/// `[min_delay_ms, max_delay_ms)`.
///
/// The defaults give each bake one to three seconds in the oven. Tests
/// shrink the bounds to a few milliseconds; the strategy semantics are
/// delay-independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BakeTiming {
    /// Inclusive lower delay bound in milliseconds
    pub min_delay_ms: u64,
    /// Exclusive upper delay bound in milliseconds
    pub max_delay_ms: u64,
}

impl BakeTiming {
    /// Default lower delay bound: one second.
    pub const DEFAULT_MIN_DELAY_MS: u64 = 1000;
    /// Default upper delay bound: three seconds.
    pub const DEFAULT_MAX_DELAY_MS: u64 = 3000;

    /// Creates timing bounds of `[min_delay_ms, max_delay_ms)`.
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms,
        }
    }

    /// Samples one bake delay.
    ///
    /// If the bounds are inverted or equal the lower bound is used as-is, so
    /// sampling never panics on degenerate configuration.
    pub fn sample(&self) -> Duration {
        let millis = if self.max_delay_ms > self.min_delay_ms {
            rand::thread_rng().gen_range(self.min_delay_ms..self.max_delay_ms)
        } else {
            self.min_delay_ms
        };
        Duration::from_millis(millis)
    }
}

impl Default for BakeTiming {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_DELAY_MS, Self::DEFAULT_MAX_DELAY_MS)
    }
}

// ============================================================================
// Oven
// ============================================================================

/// Starts simulated bakes against a shared context.
///
/// The oven is cheap to clone; every pipeline of a demo module shares one
/// context through it, which is what keeps call IDs globally ordered across
/// pipelines.
///
/// # Examples
///
/// ```rust,no_run
/// use bakery_event_system::{create_bakery_context, BakeTiming, FlattenStrategy, Oven};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let oven = Oven::new(create_bakery_context(), BakeTiming::default());
/// let (call_id, bake) = oven.bake(FlattenStrategy::Merge).await;
/// let completed = bake.await;
/// assert_eq!(completed, call_id);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Oven {
    context: Arc<BakeryContext>,
    timing: BakeTiming,
}

impl Oven {
    /// Creates an oven over the given context and timing bounds.
    pub fn new(context: Arc<BakeryContext>, timing: BakeTiming) -> Self {
        Self { context, timing }
    }

    /// Returns the shared context this oven bakes against.
    pub fn context(&self) -> &Arc<BakeryContext> {
        &self.context
    }

    /// Starts one bake under the given strategy.
    ///
    /// Assigns the next call ID, records the started notification, samples the
    /// delay, and returns the ID together with the bake future. The caller
    /// owns the future: polling it to completion appends the ID to the
    /// response log exactly once; dropping it first means the call is
    /// abandoned and never appends.
    pub async fn bake(&self, strategy: FlattenStrategy) -> (CallId, BoxFuture<'static, CallId>) {
        let call_id = self.context.begin_call(strategy).await;
        let delay = self.timing.sample();
        info!(
            "🍪 [{}] call {} started baking ({}ms)",
            strategy,
            call_id,
            delay.as_millis()
        );

        let context = Arc::clone(&self.context);
        let future = async move {
            tokio::time::sleep(delay).await;
            context.complete_call(call_id, strategy).await;
            info!("✅ [{}] call {} came out of the oven", strategy, call_id);
            call_id
        }
        .boxed();

        (call_id, future)
    }
}
