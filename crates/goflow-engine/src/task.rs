use std::sync::Arc;

use goflow_core::FlowResult;

/// A sequential task. `None` means "ran, no change to flow status".
pub type Task<C, P> = Box<dyn FnMut(&mut C) -> Option<FlowResult<P>>>;

/// A task run concurrently with its siblings inside a parallel node.
///
/// Parallel tasks see the context by shared reference; writes need interior
/// mutability chosen by the caller.
pub type ParallelTask<C, P> = Box<dyn Fn(&C) -> Option<FlowResult<P>> + Send + Sync>;

/// Branch selector for `If`/`ElseIf` nodes.
pub type Condition<C> = Box<dyn Fn(&C) -> bool>;

/// Called with the node note before the node's tasks run.
pub type BeginHook<C> = Arc<dyn Fn(&str, &C)>;

/// Called with the node note and the shared result after the node's tasks run.
pub type EndHook<C, P> = Arc<dyn Fn(&str, &C, &FlowResult<P>)>;

/// Flow-level success or failure callback.
pub type Callback<C, P> = Box<dyn FnOnce(&C, &FlowResult<P>)>;

pub fn task<C, P, F>(f: F) -> Task<C, P>
where
    F: FnMut(&mut C) -> Option<FlowResult<P>> + 'static,
{
    Box::new(f)
}

pub fn parallel_task<C, P, F>(f: F) -> ParallelTask<C, P>
where
    F: Fn(&C) -> Option<FlowResult<P>> + Send + Sync + 'static,
{
    Box::new(f)
}

pub fn condition<C, F>(f: F) -> Condition<C>
where
    F: Fn(&C) -> bool + 'static,
{
    Box::new(f)
}

/// Box a list of closures into sequential tasks.
///
/// ```ignore
/// flow.then(tasks![load, validate, |d: &mut Data| { d.age += 1; None }]);
/// ```
#[macro_export]
macro_rules! tasks {
    ($($f:expr),* $(,)?) => {
        ::std::vec![$($crate::task($f)),*]
    };
}

/// Box a list of closures into parallel tasks.
#[macro_export]
macro_rules! parallel_tasks {
    ($($f:expr),* $(,)?) => {
        ::std::vec![$($crate::parallel_task($f)),*]
    };
}
