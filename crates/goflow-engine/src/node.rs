use tracing::debug;

use goflow_core::{FlowError, FlowResult, NodeKind, ResultCell, SkipReason};

use crate::parallel::{ParallelBlock, WorkerSettings};
use crate::report::NodeStatus;
use crate::task::{BeginHook, Condition, EndHook, ParallelTask, Task};

/// Variant-specific data of a node.
enum NodeBody<C, P> {
    /// Plain sequential block; also used for `Else`.
    Sequence(Vec<Task<C, P>>),
    /// `If` or `ElseIf`.
    Branch {
        condition: Option<Condition<C>>,
        tasks: Vec<Task<C, P>>,
    },
    Repeat {
        times: usize,
        tasks: Vec<Task<C, P>>,
    },
    Parallel(ParallelBlock<C, P>),
}

/// One unit of work in a flow.
///
/// All variants share [`FlowNode::run`]: the short-circuit gate, the hook
/// sequence and the write-back to the shared result. They differ only in what
/// their body executes.
pub struct FlowNode<C, P = ()> {
    kind: NodeKind,
    body: NodeBody<C, P>,
    skip: bool,
    note: String,
    begin_hook: Option<BeginHook<C>>,
    end_hook: Option<EndHook<C, P>>,
}

impl<C, P> FlowNode<C, P> {
    fn with_body(kind: NodeKind, body: NodeBody<C, P>) -> Self {
        Self {
            kind,
            body,
            skip: false,
            note: String::new(),
            begin_hook: None,
            end_hook: None,
        }
    }

    pub fn normal(tasks: Vec<Task<C, P>>) -> Self {
        Self::with_body(NodeKind::Normal, NodeBody::Sequence(tasks))
    }

    /// An `If` node. A `None` condition fails at run time with
    /// `FlowError::ConditionMissing`.
    pub fn if_branch(condition: Option<Condition<C>>, tasks: Vec<Task<C, P>>) -> Self {
        Self::with_body(NodeKind::If, NodeBody::Branch { condition, tasks })
    }

    pub fn else_if_branch(condition: Option<Condition<C>>, tasks: Vec<Task<C, P>>) -> Self {
        Self::with_body(NodeKind::ElseIf, NodeBody::Branch { condition, tasks })
    }

    pub fn else_branch(tasks: Vec<Task<C, P>>) -> Self {
        Self::with_body(NodeKind::Else, NodeBody::Sequence(tasks))
    }

    pub fn repeat(times: usize, tasks: Vec<Task<C, P>>) -> Self {
        Self::with_body(NodeKind::For, NodeBody::Repeat { times, tasks })
    }

    pub fn parallel(tasks: Vec<ParallelTask<C, P>>, workers: WorkerSettings) -> Self {
        Self::with_body(
            NodeKind::Parallel,
            NodeBody::Parallel(ParallelBlock::new(tasks, workers)),
        )
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn note(&self) -> &str {
        &self.note
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }

    pub fn task_count(&self) -> usize {
        match &self.body {
            NodeBody::Sequence(tasks)
            | NodeBody::Branch { tasks, .. }
            | NodeBody::Repeat { tasks, .. } => tasks.len(),
            NodeBody::Parallel(block) => block.len(),
        }
    }

    pub fn has_begin_hook(&self) -> bool {
        self.begin_hook.is_some()
    }

    pub fn has_end_hook(&self) -> bool {
        self.end_hook.is_some()
    }

    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = note.into();
    }

    pub fn set_begin_hook(&mut self, hook: BeginHook<C>) {
        self.begin_hook = Some(hook);
    }

    pub fn set_end_hook(&mut self, hook: EndHook<C, P>) {
        self.end_hook = Some(hook);
    }

    /// Suppress this node for the rest of the run.
    pub fn mark_skipped(&mut self) {
        self.skip = true;
    }

    /// Why this node would not run against `cell`, if it would not.
    pub fn gate(&self, cell: &ResultCell<P>) -> Option<SkipReason> {
        if self.skip {
            Some(SkipReason::BranchTaken)
        } else if cell.is_failing() {
            Some(SkipReason::PriorFailure)
        } else {
            None
        }
    }
}

impl<C: Sync, P: Send> FlowNode<C, P> {
    /// Run this node against the shared context and result.
    ///
    /// `rest` holds the nodes that follow this one in the flow; a taken
    /// conditional branch marks the contiguous `ElseIf`/`Else` nodes at its
    /// head as skipped.
    pub fn run(
        &mut self,
        ctx: &mut C,
        cell: &mut ResultCell<P>,
        rest: &mut [FlowNode<C, P>],
    ) -> NodeStatus {
        if let Some(reason) = self.gate(cell) {
            return NodeStatus::Skipped(reason);
        }

        if let Some(hook) = &self.begin_hook {
            hook(&self.note, ctx);
        }

        if let Some(result) = self.execute(ctx, rest) {
            cell.replace(result);
        }

        if let Some(hook) = &self.end_hook {
            hook(&self.note, ctx, cell.get());
        }

        NodeStatus::Completed
    }

    fn execute(&mut self, ctx: &mut C, rest: &mut [FlowNode<C, P>]) -> Option<FlowResult<P>> {
        match &mut self.body {
            NodeBody::Sequence(tasks) => run_tasks(tasks, ctx),
            NodeBody::Branch { condition, tasks } => {
                let Some(condition) = condition else {
                    return Some(FlowResult::error(FlowError::ConditionMissing));
                };
                if !condition(ctx) {
                    debug!(kind = %self.kind, note = %self.note, "Branch not taken");
                    return None;
                }
                let outcome = run_tasks(tasks, ctx);
                let skipped = skip_alternatives(rest);
                debug!(kind = %self.kind, note = %self.note, skipped, "Branch taken");
                outcome
            }
            NodeBody::Repeat { times, tasks } => {
                for iteration in 0..*times {
                    if let Some(failure) = run_tasks(tasks, ctx) {
                        debug!(iteration, times = *times, "Loop aborted on failure");
                        return Some(failure);
                    }
                }
                None
            }
            NodeBody::Parallel(block) => block.execute(ctx),
        }
    }
}

impl<C, P> std::fmt::Debug for FlowNode<C, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowNode")
            .field("kind", &self.kind)
            .field("note", &self.note)
            .field("skip", &self.skip)
            .field("tasks", &self.task_count())
            .finish()
    }
}

/// Run tasks in order, stopping at the first failing result.
fn run_tasks<C, P>(tasks: &mut [Task<C, P>], ctx: &mut C) -> Option<FlowResult<P>> {
    for task in tasks.iter_mut() {
        if let Some(result) = task(ctx) {
            if result.is_failing() {
                return Some(result);
            }
        }
    }
    None
}

/// Mark the contiguous alternative branches at the head of `rest` as skipped.
fn skip_alternatives<C, P>(rest: &mut [FlowNode<C, P>]) -> usize {
    let mut count = 0;
    for node in rest.iter_mut().take_while(|n| n.kind.is_alternative()) {
        node.mark_skipped();
        count += 1;
    }
    count
}
