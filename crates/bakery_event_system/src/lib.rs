//! # Bakery Event System
//!
//! An async demonstration of the four reactive flattening strategies — switch,
//! concat, merge, exhaust — applied to a stream of user events that each
//! trigger a simulated slow call (a cookie baking in the oven).
//!
//! ## Core Features
//!
//! - **Two Demo Modules**: a strategy-routed pipeline that is re-wired on
//!   every selection, and four always-on listener pipelines that filter by the
//!   selected strategy
//! - **Explicit State Machine**: the flattening operators are reimplemented as
//!   a small per-pipeline state machine instead of a reactive-streams library
//! - **Structural Cancellation**: completion side effects live inside each
//!   bake future, so abandoning work is dropping the future
//! - **Shared Context**: one object owns the monotonic call counter, the
//!   response log, the notification ring, and the in-flight registry
//! - **Uniform Surface**: both modules implement [`CookieDemo`], so a host
//!   drives either behind a trait object
//!
//! ## Architecture Overview
//!
//! The system composes three layers:
//!
//! ### Shared State
//! - **[`BakeryContext`]**: counter, logs, registry, statistics
//! - **[`Oven`]**: starts bakes, hands back cancellable futures
//!
//! ### Flattening Engine
//! - **[`FlattenMachine`]**: per-pipeline accept/queue/drop/abandon rules
//!
//! ### Demo Modules
//! - **[`StrategyRouter`]** (Module A): one task, one machine, replaced on
//!   every selection emission
//! - **[`ParallelListeners`]** (Module B): four permanent tasks, one machine
//!   each, filtering on the strategy stamped into each event at fire time
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use bakery_event_system::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = create_bakery_context();
//!     let demo: Box<dyn CookieDemo> = Box::new(ParallelListeners::start(
//!         context.clone(),
//!         BakeTiming::default(),
//!         64,
//!     ));
//!
//!     // Queue three cookies through the concat pipeline
//!     demo.select_strategy(FlattenStrategy::Concat)?;
//!     for _ in 0..3 {
//!         demo.add_one_cookie()?;
//!     }
//!
//!     // Let the oven work through the backlog
//!     tokio::time::sleep(std::time::Duration::from_secs(10)).await;
//!     println!("completed in order: {:?}", context.responses().await);
//!
//!     demo.shutdown().await?;
//!     Ok(())
//! }
//! ```


// Core modules
pub mod context;
pub mod demo;
pub mod events;
pub mod flatten;
pub mod listeners;
pub mod oven;
pub mod router;
pub mod types;
pub mod utils;

// Re-export commonly used items for convenience
pub use context::{BakeryContext, BakeryStats, InFlightCall, DEFAULT_NOTIFICATION_LIMIT};
pub use demo::CookieDemo;
pub use events::{AddCookieEvent, CallNotification, NotificationKind, PipelineError};
pub use flatten::FlattenMachine;
pub use listeners::ParallelListeners;
pub use oven::{BakeTiming, Oven};
pub use router::StrategyRouter;
pub use types::{CallId, FlattenStrategy};
pub use utils::{create_bakery_context, current_timestamp};

// External dependencies that embedders commonly need
pub use async_trait::async_trait;
pub use std::sync::Arc;
