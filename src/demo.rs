//! Sample flows exercising every node kind.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use goflow_core::config::EngineConfig;
use goflow_core::EventBus;
use goflow_engine::{parallel_tasks, tasks, Flow, FlowError, FlowReport, FlowResult};
use tracing::info;

/// Context threaded through the sample flows.
#[derive(Debug, Default)]
pub struct Person {
    pub name: String,
    pub age: i64,
}

/// Input to the context initializer.
#[derive(Debug, Clone)]
pub struct Seed {
    pub name: String,
    pub age: i64,
}

/// Payload carried by sample results: the age one year on.
pub type AgePlusOne = i64;

pub fn birthday(p: &mut Person) -> Option<FlowResult<AgePlusOne>> {
    p.age += 1;
    info!(name = %p.name, age = p.age, "birthday");
    Some(FlowResult::with_payload(p.age + 1))
}

pub fn quiet_birthday(p: &mut Person) -> Option<FlowResult<AgePlusOne>> {
    p.age += 1;
    info!(name = %p.name, age = p.age, "quiet birthday");
    None
}

pub fn broken_birthday(p: &mut Person) -> Option<FlowResult<AgePlusOne>> {
    p.age += 1;
    let err = FlowError::Failed("something wrong".into());
    Some(FlowResult::error(err).payload(p.age + 1))
}

pub fn rejected_birthday(p: &mut Person) -> Option<FlowResult<AgePlusOne>> {
    p.age += 1;
    Some(FlowResult::status(10000, "rejected").payload(p.age + 1))
}

pub fn is_adult(p: &Person) -> bool {
    p.age >= 18
}

pub fn seed(_current: Person, input: Seed) -> Person {
    info!(?input, "seeding context");
    Person {
        name: input.name,
        age: input.age,
    }
}

/// Context for the parallel sample; writes go through atomics.
#[derive(Debug, Default)]
pub struct Tally {
    pub visits: AtomicI64,
}

/// Settings shared by every sample flow.
pub struct Samples<'a> {
    pub config: &'a EngineConfig,
    pub bus: Option<Arc<EventBus>>,
}

impl Samples<'_> {
    fn flow<C: Default>(&self) -> Flow<C, AgePlusOne> {
        let flow = Flow::new().with_config(self.config);
        match &self.bus {
            Some(bus) => flow.with_event_bus(Arc::clone(bus)),
            None => flow,
        }
    }
}

/// A named sample with its outcome.
pub struct Sample {
    pub name: &'static str,
    pub succeeded: bool,
    pub status_code: i64,
    pub error: Option<String>,
    pub report: serde_json::Value,
}

fn sample<C>(name: &'static str, report: FlowReport<C, AgePlusOne>) -> Sample {
    Sample {
        name,
        succeeded: report.succeeded(),
        status_code: report.result.status_code,
        error: report.result.error.as_ref().map(|e| e.to_string()),
        report: serde_json::json!({
            "flow_id": report.flow_id,
            "started_at": report.started_at.to_rfc3339(),
            "total_elapsed_ms": report.total_elapsed_ms,
            "nodes": report.nodes,
        }),
    }
}

/// Run every sample flow.
pub fn run_all(samples: &Samples<'_>) -> Vec<Sample> {
    let log_begin = |note: &str, p: &Person| {
        info!(note, age = p.age, "node begin");
    };
    let log_end = |note: &str, p: &Person, r: &FlowResult<AgePlusOne>| {
        info!(note, age = p.age, failing = r.is_failing(), "node end");
    };

    let ada = Seed {
        name: "Ada".into(),
        age: 17,
    };
    let chain = samples
        .flow::<Person>()
        .prepare(seed, ada)
        .then(tasks![birthday, quiet_birthday])
        .note("grow up")
        .when(|p: &Person| p.age < 18, tasks![quiet_birthday])
        .note("still a minor")
        .else_when(is_adult, tasks![birthday])
        .note("adult")
        .otherwise(tasks![rejected_birthday])
        .note("unreachable")
        .global_on_begin(log_begin)
        .global_on_end(log_end)
        .wait_report();

    let looping = samples
        .flow::<Person>()
        .repeat(3, tasks![quiet_birthday])
        .note("three years")
        .repeat(0, tasks![broken_birthday])
        .note("never")
        .wait_report();

    let failing = samples
        .flow::<Person>()
        .then(tasks![birthday])
        .repeat(3, tasks![quiet_birthday, broken_birthday])
        .note("breaks on first pass")
        .then(tasks![birthday])
        .note("skipped")
        .on_fail(|p, r| {
            info!(age = p.age, error = ?r.error, "flow failed");
        })
        .wait_report();

    let status = samples
        .flow::<Person>()
        .then(tasks![rejected_birthday])
        .on_fail(|_, r| {
            info!(code = r.status_code, msg = %r.status_msg, "flow rejected");
        })
        .wait_report();

    let fan_out = samples
        .flow::<Tally>()
        .parallel(parallel_tasks![
            |t: &Tally| {
                t.visits.fetch_add(1, Ordering::SeqCst);
                None
            },
            |t: &Tally| {
                t.visits.fetch_add(1, Ordering::SeqCst);
                Some(FlowResult::with_payload(0))
            },
            |t: &Tally| {
                t.visits.fetch_add(1, Ordering::SeqCst);
                None
            },
        ])
        .note("three visitors")
        .on_success(|t, _| {
            let visits = t.visits.load(Ordering::SeqCst);
            info!(visits, "all visitors done");
        })
        .wait_report();

    let panicking = samples
        .flow::<Tally>()
        .parallel(parallel_tasks![
            |t: &Tally| {
                t.visits.fetch_add(1, Ordering::SeqCst);
                None
            },
            |_: &Tally| -> Option<FlowResult<AgePlusOne>> { panic!("visitor tripped") },
        ])
        .note("one visitor panics")
        .wait_report();

    vec![
        sample("conditional chain", chain),
        sample("bounded loop", looping),
        sample("failure by error", failing),
        sample("failure by status code", status),
        sample("parallel fan-out", fan_out),
        sample("parallel panic", panicking),
    ]
}
