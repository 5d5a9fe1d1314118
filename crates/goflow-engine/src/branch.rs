use goflow_core::FlowResult;

use crate::engine::FlowEngine;
use crate::node::FlowNode;
use crate::report::FlowReport;
use crate::task::{ParallelTask, Task};

/// Builder returned while an if/else-if/else chain is open.
///
/// Wraps the parent [`FlowEngine`], so nodes land in the same list and share
/// the same context and result. `otherwise`, `then`, `repeat` and `parallel`
/// close the chain and hand the parent back.
pub struct ElseFlowEngine<C, P = ()> {
    flow: FlowEngine<C, P>,
}

impl<C, P> ElseFlowEngine<C, P> {
    pub(crate) fn new(flow: FlowEngine<C, P>) -> Self {
        Self { flow }
    }

    /// Append an `ElseIf` branch to the open chain.
    pub fn else_when<F>(mut self, condition: F, tasks: Vec<Task<C, P>>) -> Self
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.flow
            .push(FlowNode::else_if_branch(Some(Box::new(condition)), tasks));
        self
    }

    /// Append the trailing `Else` branch and close the chain.
    pub fn otherwise(mut self, tasks: Vec<Task<C, P>>) -> FlowEngine<C, P> {
        self.flow.push(FlowNode::else_branch(tasks));
        self.flow
    }

    /// Close the chain without an `Else` branch.
    pub fn end(self) -> FlowEngine<C, P> {
        self.flow
    }

    /// Start a new chain on the same flow.
    pub fn when<F>(self, condition: F, tasks: Vec<Task<C, P>>) -> Self
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.flow.when(condition, tasks)
    }

    pub fn then(self, tasks: Vec<Task<C, P>>) -> FlowEngine<C, P> {
        self.flow.then(tasks)
    }

    pub fn repeat(self, times: usize, tasks: Vec<Task<C, P>>) -> FlowEngine<C, P> {
        self.flow.repeat(times, tasks)
    }

    pub fn parallel(self, tasks: Vec<ParallelTask<C, P>>) -> FlowEngine<C, P> {
        self.flow.parallel(tasks)
    }

    pub fn note(self, note: impl Into<String>) -> Self {
        Self::new(self.flow.note(note))
    }

    pub fn on_begin<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &C) + 'static,
    {
        Self::new(self.flow.on_begin(hook))
    }

    pub fn on_end<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &C, &FlowResult<P>) + 'static,
    {
        Self::new(self.flow.on_end(hook))
    }

    pub fn global_on_begin<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &C) + 'static,
    {
        Self::new(self.flow.global_on_begin(hook))
    }

    pub fn global_on_end<F>(self, hook: F) -> Self
    where
        F: Fn(&str, &C, &FlowResult<P>) + 'static,
    {
        Self::new(self.flow.global_on_end(hook))
    }

    pub fn on_success<F>(self, callback: F) -> Self
    where
        F: FnOnce(&C, &FlowResult<P>) + 'static,
    {
        Self::new(self.flow.on_success(callback))
    }

    pub fn on_fail<F>(self, callback: F) -> Self
    where
        F: FnOnce(&C, &FlowResult<P>) + 'static,
    {
        Self::new(self.flow.on_fail(callback))
    }

    /// The flow this chain belongs to.
    pub fn flow(&self) -> &FlowEngine<C, P> {
        &self.flow
    }
}

impl<C: Sync, P: Send> ElseFlowEngine<C, P> {
    pub fn wait(self) -> FlowResult<P> {
        self.flow.wait()
    }

    pub fn wait_report(self) -> FlowReport<C, P> {
        self.flow.wait_report()
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::Flow;
    use crate::task::task;
    use crate::{NodeStatus, Task};
    use goflow_core::{FlowResult, NodeKind, SkipReason};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Data {
        age: i64,
        trace: Vec<&'static str>,
    }

    fn mark(name: &'static str) -> Task<Data, ()> {
        task(move |d: &mut Data| {
            d.trace.push(name);
            None
        })
    }

    #[test]
    fn test_chain_shares_parent_list() {
        let chain = Flow::<Data>::new()
            .then(vec![mark("a")])
            .when(|d| d.age > 0, vec![mark("b")])
            .else_when(|d| d.age < 0, vec![mark("c")]);

        let kinds: Vec<NodeKind> = chain
            .flow()
            .nodes()
            .iter()
            .map(|n| n.kind())
            .collect();
        assert_eq!(kinds, vec![NodeKind::Normal, NodeKind::If, NodeKind::ElseIf]);

        let flow = chain.otherwise(vec![mark("d")]);
        assert_eq!(flow.len(), 4);
        assert_eq!(flow.nodes()[3].kind(), NodeKind::Else);
    }

    #[test]
    fn test_wait_on_open_chain() {
        let result = Flow::<Data>::new()
            .when(|_| true, vec![mark("if")])
            .else_when(|_| true, vec![mark("elif")])
            .on_success(|d, _| assert_eq!(d.trace, vec!["if"]))
            .wait();
        assert!(result.is_success());
    }

    #[test]
    fn test_setters_delegate_to_parent() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let (begin, end) = (seen.clone(), seen.clone());

        let flow = Flow::<Data>::new()
            .when(|_| false, vec![mark("if")])
            .note("primary")
            .else_when(|_| true, vec![mark("elif")])
            .note("fallback")
            .on_begin(move |note, _| {
                begin.borrow_mut().push(format!("begin {note}"))
            })
            .global_on_end(move |note, _, r: &FlowResult<()>| {
                end.borrow_mut().push(format!("end {note} {}", r.is_success()))
            })
            .end();

        assert_eq!(flow.nodes()[0].note(), "primary");
        assert!(!flow.nodes()[0].has_begin_hook());
        assert!(flow.nodes()[1].has_begin_hook());

        flow.wait();
        assert_eq!(
            *seen.borrow(),
            vec!["end primary true", "begin fallback", "end fallback true"]
        );
    }

    #[test]
    fn test_consecutive_chains_are_independent() {
        let report = Flow::<Data>::new()
            .when(|_| true, vec![mark("first if")])
            .otherwise(vec![mark("first else")])
            .when(|_| false, vec![mark("second if")])
            .when(|_| true, vec![mark("third if")])
            .otherwise(vec![mark("third else")])
            .wait_report();

        assert_eq!(report.context.trace, vec!["first if", "third if"]);
        let skipped: Vec<usize> = report.skipped().map(|n| n.index).collect();
        assert_eq!(skipped, vec![1, 4]);
        assert!(report
            .skipped()
            .all(|n| n.status == NodeStatus::Skipped(SkipReason::BranchTaken)));
    }

    #[test]
    fn test_closing_with_loop_and_parallel() {
        let report = Flow::<Data>::new()
            .when(|_| true, vec![mark("if")])
            .repeat(2, vec![mark("loop")])
            .when(|_| false, vec![mark("never")])
            .parallel(vec![])
            .wait_report();

        assert_eq!(report.context.trace, vec!["if", "loop", "loop"]);
        assert_eq!(report.completed().count(), 4);
    }

    #[test]
    fn test_failing_branch_stops_flow() {
        let report = Flow::<Data>::new()
            .when(
                |_| true,
                vec![task(|_: &mut Data| {
                    Some(FlowResult::status(10000, "rejected"))
                })],
            )
            .else_when(|_| true, vec![mark("elif")])
            .then(vec![mark("after")])
            .wait_report();

        assert_eq!(report.result.status_code, 10000);
        assert!(report.context.trace.is_empty());
        let statuses: Vec<NodeStatus> = report.nodes.iter().map(|n| n.status).collect();
        assert_eq!(
            statuses,
            vec![
                NodeStatus::Completed,
                NodeStatus::Skipped(SkipReason::BranchTaken),
                NodeStatus::Skipped(SkipReason::PriorFailure),
            ]
        );
    }
}
