use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info, info_span, warn};

use goflow_core::config::EngineConfig;
use goflow_core::{EventBus, FlowError, FlowEvent, FlowId, FlowResult, ResultCell};

use crate::branch::ElseFlowEngine;
use crate::node::FlowNode;
use crate::parallel::WorkerSettings;
use crate::report::{FlowReport, NodeOutcome, NodeStatus};
use crate::task::{BeginHook, Callback, EndHook, ParallelTask, Task};

pub type Flow<C, P = ()> = FlowEngine<C, P>;

/// Fluent builder and runner for a flow.
///
/// The builder owns the context, the node list and the shared result cell.
/// Nodes run in the order they were appended; once the result is failing every
/// later node is skipped.
pub struct FlowEngine<C, P = ()> {
    id: FlowId,
    context: C,
    nodes: Vec<FlowNode<C, P>>,
    result: ResultCell<P>,
    workers: WorkerSettings,
    event_bus: Option<Arc<EventBus>>,
    on_success: Option<Callback<C, P>>,
    on_fail: Option<Callback<C, P>>,
    /// Node count at the time of a rejected `prepare`.
    late_prepare: Option<usize>,
}

impl<C: Default, P> Default for FlowEngine<C, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Default, P> FlowEngine<C, P> {
    /// Create a flow over a default context.
    pub fn new() -> Self {
        Self::with_context(C::default())
    }
}

impl<C, P> FlowEngine<C, P> {
    /// Create a flow over an existing context.
    pub fn with_context(context: C) -> Self {
        let config = EngineConfig::default();
        Self {
            id: FlowId::new(),
            context,
            nodes: Vec::with_capacity(config.node_capacity),
            result: ResultCell::new(),
            workers: WorkerSettings::from(&config),
            event_bus: None,
            on_success: None,
            on_fail: None,
            late_prepare: None,
        }
    }

    /// Apply engine configuration. Affects parallel nodes appended afterwards.
    pub fn with_config(mut self, config: &EngineConfig) -> Self {
        self.nodes
            .reserve(config.node_capacity.saturating_sub(self.nodes.len()));
        self.workers = WorkerSettings::from(config);
        self
    }

    /// Publish lifecycle events to `bus` while the flow runs.
    pub fn with_event_bus(mut self, bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(bus);
        self
    }

    pub fn id(&self) -> &FlowId {
        &self.id
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn nodes(&self) -> &[FlowNode<C, P>] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Replace the context with `init(current, input)`.
    ///
    /// Must be called before any node is appended. A late call leaves the
    /// context untouched and makes `wait` fail with `FlowError::LatePrepare`
    /// without running any node.
    pub fn prepare<I, F>(mut self, init: F, input: I) -> Self
    where
        F: FnOnce(C, I) -> C,
    {
        if !self.nodes.is_empty() {
            warn!(
                flow_id = %self.id,
                nodes = self.nodes.len(),
                "Context prepared after nodes were appended; flow will fail"
            );
            self.late_prepare.get_or_insert(self.nodes.len());
            return self;
        }

        self.context = init(self.context, input);
        self
    }

    pub(crate) fn push(&mut self, node: FlowNode<C, P>) {
        debug!(flow_id = %self.id, index = self.nodes.len(), kind = %node.kind(), "Node appended");
        self.nodes.push(node);
    }

    /// Append a sequential block.
    pub fn then(mut self, tasks: Vec<Task<C, P>>) -> Self {
        self.push(FlowNode::normal(tasks));
        self
    }

    /// Append a block that runs its tasks `times` times.
    pub fn repeat(mut self, times: usize, tasks: Vec<Task<C, P>>) -> Self {
        self.push(FlowNode::repeat(times, tasks));
        self
    }

    /// Append a block whose tasks run concurrently.
    pub fn parallel(mut self, tasks: Vec<ParallelTask<C, P>>) -> Self {
        let node = FlowNode::parallel(tasks, self.workers.clone());
        self.push(node);
        self
    }

    /// Open a conditional chain with an `If` branch.
    pub fn when<F>(mut self, condition: F, tasks: Vec<Task<C, P>>) -> ElseFlowEngine<C, P>
    where
        F: Fn(&C) -> bool + 'static,
    {
        self.push(FlowNode::if_branch(Some(Box::new(condition)), tasks));
        ElseFlowEngine::new(self)
    }

    /// Set the note of the most recently appended node.
    pub fn note(mut self, note: impl Into<String>) -> Self {
        if let Some(node) = self.nodes.last_mut() {
            node.set_note(note);
        }
        self
    }

    /// Set the begin hook of the most recently appended node.
    pub fn on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C) + 'static,
    {
        if let Some(node) = self.nodes.last_mut() {
            node.set_begin_hook(Arc::new(hook));
        }
        self
    }

    /// Set the end hook of the most recently appended node.
    pub fn on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C, &FlowResult<P>) + 'static,
    {
        if let Some(node) = self.nodes.last_mut() {
            node.set_end_hook(Arc::new(hook));
        }
        self
    }

    /// Give every existing node without a begin hook this one.
    pub fn global_on_begin<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C) + 'static,
    {
        let hook: BeginHook<C> = Arc::new(hook);
        for node in self.nodes.iter_mut().filter(|n| !n.has_begin_hook()) {
            node.set_begin_hook(Arc::clone(&hook));
        }
        self
    }

    /// Give every existing node without an end hook this one.
    pub fn global_on_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str, &C, &FlowResult<P>) + 'static,
    {
        let hook: EndHook<C, P> = Arc::new(hook);
        for node in self.nodes.iter_mut().filter(|n| !n.has_end_hook()) {
            node.set_end_hook(Arc::clone(&hook));
        }
        self
    }

    /// Called after `wait` when the final result is not failing.
    pub fn on_success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&C, &FlowResult<P>) + 'static,
    {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Called after `wait` when the final result is failing.
    pub fn on_fail<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(&C, &FlowResult<P>) + 'static,
    {
        self.on_fail = Some(Box::new(callback));
        self
    }

    fn publish(&self, event: FlowEvent) {
        if let Some(bus) = &self.event_bus {
            bus.publish(event);
        }
    }
}

impl<C: Sync, P: Send> FlowEngine<C, P> {
    /// Run every node and return the final result.
    pub fn wait(self) -> FlowResult<P> {
        self.wait_report().result
    }

    /// Run every node and return the final result with per-node outcomes.
    pub fn wait_report(mut self) -> FlowReport<C, P> {
        let flow_id = self.id.clone();
        let span = info_span!("flow", flow_id = %flow_id);
        let _guard = span.enter();

        let started_at = Utc::now();
        let start = Instant::now();
        self.publish(FlowEvent::FlowStarted {
            flow_id: flow_id.clone(),
            nodes: self.nodes.len(),
        });

        if let Some(nodes) = self.late_prepare {
            warn!(nodes, "Refusing to run a flow whose context was replaced late");
            self.result
                .replace(FlowResult::error(FlowError::LatePrepare { nodes }));
        }

        let mut outcomes = Vec::with_capacity(self.nodes.len());
        for index in 0..self.nodes.len() {
            let (head, rest) = self.nodes.split_at_mut(index + 1);
            let node = &mut head[index];
            let kind = node.kind();
            let note = node.note().to_string();

            if node.gate(&self.result).is_none() {
                debug!(index, kind = %kind, note = %note, "Node started");
                if let Some(bus) = &self.event_bus {
                    bus.publish(FlowEvent::NodeStarted {
                        flow_id: flow_id.clone(),
                        index,
                        kind,
                        note: note.clone(),
                    });
                }
            }

            let node_start = Instant::now();
            let status = node.run(&mut self.context, &mut self.result, rest);
            let elapsed_ms = node_start.elapsed().as_millis() as u64;

            let event = match status {
                NodeStatus::Completed => {
                    let failing = self.result.is_failing();
                    debug!(index, kind = %kind, failing, elapsed_ms, "Node finished");
                    FlowEvent::NodeFinished {
                        flow_id: flow_id.clone(),
                        index,
                        kind,
                        note: note.clone(),
                        failing,
                        elapsed_ms,
                    }
                }
                NodeStatus::Skipped(reason) => {
                    debug!(index, kind = %kind, ?reason, "Node skipped");
                    FlowEvent::NodeSkipped {
                        flow_id: flow_id.clone(),
                        index,
                        kind,
                        note: note.clone(),
                        reason,
                    }
                }
            };
            if let Some(bus) = &self.event_bus {
                bus.publish(event);
            }

            outcomes.push(NodeOutcome {
                index,
                kind,
                note,
                status,
                elapsed_ms,
            });
        }

        let failing = self.result.is_failing();
        let callback = if failing {
            self.on_fail.take()
        } else {
            self.on_success.take()
        };
        if let Some(callback) = callback {
            callback(&self.context, self.result.get());
        }

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        self.publish(FlowEvent::FlowFinished {
            flow_id: flow_id.clone(),
            failing,
            elapsed_ms: total_elapsed_ms,
        });
        info!(
            nodes = outcomes.len(),
            failing,
            elapsed_ms = total_elapsed_ms,
            "Flow complete"
        );

        FlowReport {
            flow_id,
            started_at,
            result: self.result.into_inner(),
            context: self.context,
            nodes: outcomes,
            total_elapsed_ms,
        }
    }
}
