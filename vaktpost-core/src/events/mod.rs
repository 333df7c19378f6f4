//! ## vaktpost-core::events
//! **Bounded handoff queues and the shared stop signal**
//!
//! The queues are the only mutable structures shared between worker loops.
//! Producers block when a queue is full; every wait is bounded so the stop
//! signal is observed at most one poll interval late.

pub mod queue;
pub mod stop;

pub use queue::{BoundedQueue, QueueError};
pub use stop::StopSignal;
