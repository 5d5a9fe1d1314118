use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;

use tracing::{debug, error};

use goflow_core::config::EngineConfig;
use goflow_core::{FlowError, FlowResult};

use crate::task::ParallelTask;

/// Thread settings for parallel workers.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub name_prefix: String,
    pub stack_size: Option<usize>,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl WorkerSettings {
    /// Thread builder for the worker at `index`.
    ///
    /// Fails instead of panicking when the name cannot be passed to the OS.
    fn builder(&self, index: usize) -> io::Result<thread::Builder> {
        let name = format!("{}-{}", self.name_prefix, index);
        if name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "worker thread name contains NUL",
            ));
        }
        let builder = thread::Builder::new().name(name);
        Ok(match self.stack_size {
            Some(size) => builder.stack_size(size),
            None => builder,
        })
    }
}

impl From<&EngineConfig> for WorkerSettings {
    fn from(config: &EngineConfig) -> Self {
        Self {
            name_prefix: config.parallel.thread_name_prefix.clone(),
            stack_size: config.worker_stack_size(),
        }
    }
}

/// Fan-out block: one scoped worker per task, fan-in over a channel.
pub(crate) struct ParallelBlock<C, P> {
    tasks: Vec<ParallelTask<C, P>>,
    workers: WorkerSettings,
}

impl<C, P> ParallelBlock<C, P> {
    pub(crate) fn new(tasks: Vec<ParallelTask<C, P>>, workers: WorkerSettings) -> Self {
        Self { tasks, workers }
    }

    pub(crate) fn len(&self) -> usize {
        self.tasks.len()
    }
}

impl<C: Sync, P: Send> ParallelBlock<C, P> {
    /// Run every task concurrently and wait for all of them.
    ///
    /// Returns the first failing outcome to arrive, or `None` when nothing
    /// failed. A panicking task is reported as `FlowError::TaskPanicked`.
    pub(crate) fn execute(&self, ctx: &C) -> Option<FlowResult<P>> {
        if self.tasks.is_empty() {
            return None;
        }

        let (tx, rx) = mpsc::channel::<Option<FlowResult<P>>>();

        thread::scope(move |scope| {
            for (index, task) in self.tasks.iter().enumerate() {
                let worker_tx = tx.clone();
                let spawned = self.workers.builder(index).and_then(|builder| {
                    builder.spawn_scoped(scope, move || {
                        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task(ctx))) {
                            Ok(outcome) => outcome,
                            Err(payload) => {
                                error!(
                                    task = index,
                                    panic = %panic_message(payload.as_ref()),
                                    "Parallel task panicked"
                                );
                                Some(FlowResult::error(FlowError::TaskPanicked))
                            }
                        };
                        // Receiver outlives the scope
                        let _ = worker_tx.send(outcome);
                    })
                });

                if let Err(e) = spawned {
                    error!(task = index, error = %e, "Failed to spawn parallel worker");
                    let _ = tx.send(Some(FlowResult::error(FlowError::Spawn(e.to_string()))));
                }
            }
            drop(tx);

            let mut chosen: Option<FlowResult<P>> = None;
            let mut received = 0usize;
            for outcome in rx {
                received += 1;
                if chosen.is_some() {
                    continue;
                }
                if let Some(result) = outcome.filter(FlowResult::is_failing) {
                    chosen = Some(result);
                }
            }
            debug!(tasks = received, failing = chosen.is_some(), "Parallel fan-in complete");
            chosen
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "non-string panic payload"
    }
}
