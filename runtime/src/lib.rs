//! isoc-runtime: actor execution for isolation-checked programs
//!
//! Each actor owns a serial FIFO queue drained by jobs on a shared tokio
//! worker pool. Isolated operations are scheduled with `Actor::run` (or
//! `run_on` for any `Executor`) and awaited through a `Completion`.

pub mod error;
pub mod executor;
pub mod global;
pub mod queue;
pub mod task;

pub use error::{Result, RuntimeError};
pub use executor::{run_on, Actor, Completion, Executor, Isolated};
pub use global::GlobalActors;
pub use queue::{ActorQueue, QueueState, QueueStats, DRAIN_BUDGET};
pub use task::{PartialTask, TaskPoll};
