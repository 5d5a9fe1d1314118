use thiserror::Error;

#[derive(Debug, Error)]
pub enum FlowError {
    // Node errors
    #[error("condition is missing")]
    ConditionMissing,

    #[error("task panicked")]
    TaskPanicked,

    #[error("failed to spawn parallel worker: {0}")]
    Spawn(String),

    // Builder errors
    #[error("context replaced after {nodes} node(s) were appended")]
    LatePrepare { nodes: usize },

    // Caller-defined failures
    #[error("{0}")]
    Failed(String),

    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl FlowError {
    /// Wrap any caller error as a flow failure.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FlowError>;
