use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use goflow_core::{FlowId, FlowResult, NodeKind, SkipReason};

/// What happened to a node during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Completed,
    Skipped(SkipReason),
}

/// Per-node entry of a [`FlowReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeOutcome {
    pub index: usize,
    pub kind: NodeKind,
    pub note: String,
    pub status: NodeStatus,
    pub elapsed_ms: u64,
}

/// Result of running an entire flow.
#[derive(Debug)]
pub struct FlowReport<C, P = ()> {
    pub flow_id: FlowId,
    pub started_at: DateTime<Utc>,
    /// Final value of the shared result.
    pub result: FlowResult<P>,
    /// The context after the last node ran.
    pub context: C,
    /// Per-node outcomes in execution order.
    pub nodes: Vec<NodeOutcome>,
    pub total_elapsed_ms: u64,
}

impl<C, P> FlowReport<C, P> {
    pub fn succeeded(&self) -> bool {
        self.result.is_success()
    }

    pub fn completed(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.nodes
            .iter()
            .filter(|n| n.status == NodeStatus::Completed)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.nodes
            .iter()
            .filter(|n| matches!(n.status, NodeStatus::Skipped(_)))
    }
}
