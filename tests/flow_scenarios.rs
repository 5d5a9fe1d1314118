use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use goflow_core::{NodeKind, SkipReason};
use goflow_engine::{parallel_tasks, tasks, Flow, FlowError, FlowResult, NodeStatus};

#[derive(Debug, Default)]
struct Order {
    total: i64,
    steps: Vec<&'static str>,
}

#[derive(Debug, Default)]
struct Shared {
    done: AtomicUsize,
    log: Mutex<Vec<&'static str>>,
}

#[test]
fn test_sequence_returns_first_failure() {
    let report = Flow::<Order, &'static str>::new()
        .then(tasks![
            |o: &mut Order| {
                o.steps.push("load");
                Some(FlowResult::with_payload("loaded"))
            },
            |o: &mut Order| {
                o.steps.push("validate");
                Some(FlowResult::status(422, "invalid total").payload("validate"))
            },
            |o: &mut Order| {
                o.steps.push("charge");
                Some(FlowResult::status(500, "unreachable"))
            },
        ])
        .wait_report();

    assert_eq!(report.context.steps, vec!["load", "validate"]);
    assert_eq!(report.result.status_code, 422);
    assert_eq!(report.result.status_msg, "invalid total");
    assert_eq!(report.result.payload, Some("validate"));
}

#[test]
fn test_successful_sequence_leaves_result_empty() {
    let result = Flow::<Order, i64>::new()
        .then(tasks![
            |o: &mut Order| {
                o.total = 120;
                Some(FlowResult::with_payload(o.total))
            },
            |_: &mut Order| None,
        ])
        .wait();

    assert!(result.is_success());
    assert!(result.payload.is_none());
}

#[test]
fn test_conditional_chain_runs_first_true_branch() {
    let report = Flow::<Order>::new()
        .then(tasks![|o: &mut Order| {
            o.steps.push("f1");
            None
        }])
        .when(|_| false, tasks![|o: &mut Order| {
            o.steps.push("f2");
            None
        }])
        .else_when(|_| true, tasks![|o: &mut Order| {
            o.steps.push("f3");
            None
        }])
        .otherwise(tasks![|o: &mut Order| {
            o.steps.push("f4");
            None
        }])
        .wait_report();

    assert_eq!(report.context.steps, vec!["f1", "f3"]);
    let last = &report.nodes[3];
    assert_eq!(last.kind, NodeKind::Else);
    assert_eq!(last.status, NodeStatus::Skipped(SkipReason::BranchTaken));
}

#[test]
fn test_at_most_one_branch_runs() {
    for (a, b) in [(false, false), (false, true), (true, false), (true, true)] {
        let report = Flow::<Order>::new()
            .when(move |_| a, tasks![|o: &mut Order| {
                o.steps.push("if");
                None
            }])
            .else_when(move |_| b, tasks![|o: &mut Order| {
                o.steps.push("elif");
                None
            }])
            .otherwise(tasks![|o: &mut Order| {
                o.steps.push("else");
                None
            }])
            .wait_report();

        let expected = match (a, b) {
            (true, _) => "if",
            (false, true) => "elif",
            (false, false) => "else",
        };
        assert_eq!(report.context.steps, vec![expected], "conditions {a} {b}");
    }
}

#[test]
fn test_chain_without_else_may_run_nothing() {
    let report = Flow::<Order>::new()
        .when(|o| o.total > 100, tasks![|o: &mut Order| {
            o.steps.push("discount");
            None
        }])
        .end()
        .then(tasks![|o: &mut Order| {
            o.steps.push("ship");
            None
        }])
        .wait_report();

    assert_eq!(report.context.steps, vec!["ship"]);
}

#[test]
fn test_parallel_barrier_waits_for_all() {
    let report = Flow::<Shared>::new()
        .parallel(parallel_tasks![
            |s: &Shared| {
                std::thread::sleep(Duration::from_millis(50));
                s.done.fetch_add(1, Ordering::SeqCst);
                None
            },
            |s: &Shared| {
                s.done.fetch_add(1, Ordering::SeqCst);
                Some(FlowResult::success())
            },
            |s: &Shared| {
                s.done.fetch_add(1, Ordering::SeqCst);
                None
            },
        ])
        .then(tasks![|s: &mut Shared| {
            s.log.get_mut().unwrap().push("after");
            None
        }])
        .wait_report();

    assert!(report.succeeded());
    assert_eq!(report.context.done.load(Ordering::SeqCst), 3);
    assert_eq!(*report.context.log.lock().unwrap(), vec!["after"]);
}

#[test]
fn test_parallel_single_failure_is_reported() {
    let result = Flow::<Shared>::new()
        .parallel(parallel_tasks![
            |_: &Shared| {
                std::thread::sleep(Duration::from_millis(30));
                None
            },
            |_: &Shared| Some(FlowResult::error(FlowError::Failed("quota exceeded".into()))),
            |_: &Shared| None,
        ])
        .wait();

    assert!(matches!(result.error, Some(FlowError::Failed(ref m)) if m == "quota exceeded"));
}

#[test]
fn test_parallel_panic_keeps_sibling_work() {
    let report = Flow::<Shared>::new()
        .parallel(parallel_tasks![
            |s: &Shared| {
                std::thread::sleep(Duration::from_millis(30));
                s.log.lock().unwrap().push("slow sibling");
                None
            },
            |_: &Shared| -> Option<FlowResult> { panic!("worker fault") },
        ])
        .wait_report();

    assert!(matches!(report.result.error, Some(FlowError::TaskPanicked)));
    assert_eq!(*report.context.log.lock().unwrap(), vec!["slow sibling"]);
}

#[test]
fn test_loop_stops_at_failing_iteration() {
    let report = Flow::<Order>::new()
        .repeat(3, tasks![|o: &mut Order| {
            o.total += 1;
            (o.total == 2).then(|| FlowResult::status(7, "second pass"))
        }])
        .wait_report();

    assert_eq!(report.context.total, 2);
    assert_eq!(report.result.status_code, 7);
}

#[test]
fn test_zero_iterations_leave_result_unchanged() {
    let report = Flow::<Order>::new()
        .repeat(0, tasks![|o: &mut Order| {
            o.total += 1;
            Some(FlowResult::status(1, "never"))
        }])
        .wait_report();

    assert!(report.succeeded());
    assert_eq!(report.context.total, 0);
    assert_eq!(report.nodes[0].status, NodeStatus::Completed);
}

#[test]
fn test_nodes_after_failure_skip_hooks() {
    let hooks = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
    let (begin, end) = (hooks.clone(), hooks.clone());

    let report = Flow::<Order>::new()
        .then(tasks![|_: &mut Order| Some(FlowResult::status(10000, "rejected"))])
        .note("reject")
        .repeat(2, tasks![|o: &mut Order| {
            o.steps.push("retry");
            None
        }])
        .note("retry")
        .when(|_| true, tasks![|o: &mut Order| {
            o.steps.push("branch");
            None
        }])
        .note("branch")
        .otherwise(tasks![|_: &mut Order| None])
        .note("fallback")
        .global_on_begin(move |note, _| {
            begin.borrow_mut().push(format!("begin {note}"))
        })
        .global_on_end(move |note, _, _| {
            end.borrow_mut().push(format!("end {note}"))
        })
        .wait_report();

    assert!(report.context.steps.is_empty());
    assert_eq!(*hooks.borrow(), vec!["begin reject", "end reject"]);
    assert_eq!(report.skipped().count(), 3);
    assert!(report
        .skipped()
        .all(|n| n.status == NodeStatus::Skipped(SkipReason::PriorFailure)));
}
