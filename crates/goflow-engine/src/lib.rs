//! Flow composition engine: sequential blocks, conditional chains, bounded
//! loops and concurrent fan-out over a shared context.
//!
//! A flow is built with [`FlowEngine`] and run with [`FlowEngine::wait`].
//! Nodes run in the order they were appended and share one result; the first
//! failing result makes every later node a no-op.
//!
//! ```ignore
//! let result = Flow::<Order>::new()
//!     .then(tasks![load_order])
//!     .when(|o| o.total > 100, tasks![apply_discount])
//!     .otherwise(tasks![charge_shipping])
//!     .parallel(parallel_tasks![notify_warehouse, notify_customer])
//!     .on_fail(|_, r| eprintln!("order failed: {:?}", r.error))
//!     .wait();
//! ```

pub mod branch;
pub mod engine;
pub mod node;
pub mod parallel;
pub mod report;
pub mod task;

pub use branch::ElseFlowEngine;
pub use engine::{Flow, FlowEngine};
pub use node::FlowNode;
pub use parallel::WorkerSettings;
pub use report::{FlowReport, NodeOutcome, NodeStatus};
pub use task::{
    condition, parallel_task, task, BeginHook, Callback, Condition, EndHook, ParallelTask, Task,
};

pub use goflow_core::{FlowError, FlowResult};
