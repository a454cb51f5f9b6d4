//! Virtual user scheduling and resource lifecycle engine
//!
//! A run goes through three phases:
//!
//! 1. **Setup**: [`PoolBuilder`] creates the shared resource pool in
//!    concurrent batches; any failure aborts the run.
//! 2. **Load**: [`Scheduler`] drives one tokio task per virtual user along
//!    the activity windows of the [`SchedulePlan`](stampede_core::SchedulePlan),
//!    each running a [`VirtualUser`] that records one outcome per request.
//! 3. **Evaluation**: the recorder snapshot is judged against the thresholds
//!    and returned as a [`Verdict`](stampede_core::Verdict).
//!
//! [`configure`] and [`RunHandle::execute`] wrap all three.

pub mod error;
pub mod monitor;
pub mod payload;
pub mod pool_builder;
pub mod run;
pub mod scheduler;
pub mod shutdown;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{RunError, SetupError};
pub use monitor::{LiveMonitor, Progress};
pub use payload::PayloadFactory;
pub use pool_builder::{build_pool, PoolBuilder};
pub use run::{configure, RunHandle};
pub use scheduler::{Scheduler, SchedulerReport};
pub use shutdown::{RunStop, StopReason};
pub use worker::{VirtualUser, VuWorker, WorkerContext};
