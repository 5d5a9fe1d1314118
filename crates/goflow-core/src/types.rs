use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique flow identifier.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct FlowId(pub String);

impl FlowId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_str(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for FlowId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FlowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Variant of a flow node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Normal,
    If,
    ElseIf,
    Else,
    For,
    Parallel,
}

impl NodeKind {
    /// Alternative branches that a taken `If`/`ElseIf` suppresses.
    pub fn is_alternative(&self) -> bool {
        matches!(self, Self::ElseIf | Self::Else)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::If => "if",
            Self::ElseIf => "else_if",
            Self::Else => "else",
            Self::For => "for",
            Self::Parallel => "parallel",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a node did not execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// A preceding branch of the same conditional chain was taken.
    BranchTaken,
    /// The shared result was already failing.
    PriorFailure,
}
