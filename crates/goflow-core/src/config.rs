use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FlowError, Result};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Initial capacity of a builder's node list.
    #[serde(default = "default_node_capacity")]
    pub node_capacity: usize,
    #[serde(default)]
    pub parallel: ParallelConfig,
    #[serde(default)]
    pub events: EventsConfig,
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_capacity: default_node_capacity(),
            parallel: ParallelConfig::default(),
            events: EventsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// Worker settings for parallel nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Prefix for worker thread names; the task index is appended.
    #[serde(default = "default_thread_name_prefix")]
    pub thread_name_prefix: String,
    /// Worker stack size in KiB. Unset uses the platform default.
    #[serde(default)]
    pub stack_size_kib: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: default_thread_name_prefix(),
            stack_size_kib: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Broadcast buffer size; slow subscribers lag past this many events.
    #[serde(default = "default_event_capacity")]
    pub capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            capacity: default_event_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_node_capacity() -> usize { 10 }
fn default_thread_name_prefix() -> String { "goflow-worker".to_string() }
fn default_event_capacity() -> usize { 256 }
fn default_log_filter() -> String { "goflow=info,warn".to_string() }

impl EngineConfig {
    /// Load config from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FlowError::ConfigNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        // Expand ${ENV_VAR} references
        let expanded = expand_env_vars(&content);

        let config: Self =
            toml::from_str(&expanded).map_err(|e| FlowError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would fail only once a parallel node runs.
    pub fn validate(&self) -> Result<()> {
        if self.parallel.thread_name_prefix.contains('\0') {
            return Err(FlowError::Config(
                "parallel.thread_name_prefix must not contain NUL".to_string(),
            ));
        }
        if let Some(kib) = self.parallel.stack_size_kib {
            if kib.checked_mul(1024).is_none() {
                return Err(FlowError::Config(format!(
                    "parallel.stack_size_kib = {kib} overflows the address space"
                )));
            }
        }
        Ok(())
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "Config file absent, using defaults");
            Ok(Self::default())
        }
    }

    /// Worker stack size in bytes, if configured and representable.
    pub fn worker_stack_size(&self) -> Option<usize> {
        self.parallel
            .stack_size_kib
            .and_then(|kib| kib.checked_mul(1024))
    }
}

/// Expand `${ENV_VAR}` patterns in a string.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut var_name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                var_name.push(c);
            }
            match std::env::var(&var_name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    // Leave unset variables as written
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        } else {
            result.push(c);
        }
    }
    result
}
