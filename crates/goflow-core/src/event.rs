use serde::{Deserialize, Serialize};

use crate::types::{FlowId, NodeKind, SkipReason};

/// Lifecycle events emitted while a flow runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FlowEvent {
    /// Flow execution started.
    FlowStarted { flow_id: FlowId, nodes: usize },
    /// A node passed the run gate and is about to execute.
    NodeStarted {
        flow_id: FlowId,
        index: usize,
        kind: NodeKind,
        note: String,
    },
    /// A node finished executing.
    NodeFinished {
        flow_id: FlowId,
        index: usize,
        kind: NodeKind,
        note: String,
        failing: bool,
        elapsed_ms: u64,
    },
    /// A node was not executed.
    NodeSkipped {
        flow_id: FlowId,
        index: usize,
        kind: NodeKind,
        note: String,
        reason: SkipReason,
    },
    /// Flow execution completed.
    FlowFinished {
        flow_id: FlowId,
        failing: bool,
        elapsed_ms: u64,
    },
}

/// Event bus using tokio broadcast channel.
/// All subscribers receive all events.
pub struct EventBus {
    tx: tokio::sync::broadcast::Sender<FlowEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = tokio::sync::broadcast::channel(capacity);
        Self { tx }
    }

    pub fn publish(&self, event: FlowEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<FlowEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
