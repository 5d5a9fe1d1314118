use crate::error::FlowError;

/// Outcome record shared by every node of a flow.
///
/// A result is failing when `error` is set or `status_code` is non-zero.
/// `payload` carries caller-defined data alongside the status.
#[derive(Debug)]
pub struct FlowResult<P = ()> {
    pub error: Option<FlowError>,
    pub status_code: i64,
    pub status_msg: String,
    pub payload: Option<P>,
}

impl<P> Default for FlowResult<P> {
    fn default() -> Self {
        Self::success()
    }
}

impl<P> FlowResult<P> {
    /// An empty, non-failing result.
    pub fn success() -> Self {
        Self {
            error: None,
            status_code: 0,
            status_msg: String::new(),
            payload: None,
        }
    }

    /// A non-failing result carrying a payload.
    pub fn with_payload(payload: P) -> Self {
        Self {
            payload: Some(payload),
            ..Self::success()
        }
    }

    /// A failing result carrying an error.
    pub fn error(err: FlowError) -> Self {
        Self {
            error: Some(err),
            ..Self::success()
        }
    }

    /// A result with an explicit status code. Non-zero codes are failing.
    pub fn status(code: i64, msg: impl Into<String>) -> Self {
        Self {
            status_code: code,
            status_msg: msg.into(),
            ..Self::success()
        }
    }

    /// Attach a payload, keeping the status.
    pub fn payload(mut self, payload: P) -> Self {
        self.payload = Some(payload);
        self
    }

    pub fn is_failing(&self) -> bool {
        self.error.is_some() || self.status_code != 0
    }

    pub fn is_success(&self) -> bool {
        !self.is_failing()
    }
}

/// The single result slot of a flow.
///
/// Owned by the builder and lent to each node while it runs. Writes replace
/// the whole record; reads see the most recent write.
#[derive(Debug)]
pub struct ResultCell<P = ()> {
    current: FlowResult<P>,
}

impl<P> Default for ResultCell<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> ResultCell<P> {
    pub fn new() -> Self {
        Self {
            current: FlowResult::success(),
        }
    }

    pub fn get(&self) -> &FlowResult<P> {
        &self.current
    }

    /// Replace the held result, returning the previous one.
    pub fn replace(&mut self, result: FlowResult<P>) -> FlowResult<P> {
        std::mem::replace(&mut self.current, result)
    }

    pub fn is_failing(&self) -> bool {
        self.current.is_failing()
    }

    pub fn into_inner(self) -> FlowResult<P> {
        self.current
    }
}
