pub mod config;
pub mod error;
pub mod event;
pub mod result;
pub mod types;

pub use config::EngineConfig;
pub use error::{FlowError, Result};
pub use event::{EventBus, FlowEvent};
pub use result::{FlowResult, ResultCell};
pub use types::*;
