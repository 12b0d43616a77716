//! End-to-end runs over the demo inputs: parse, build, query, and check
//! the reported outcomes and trace output.

use vigil::engine::{self, Outcome};
use vigil::options::Options;
use vigil::parse::{ParseContext, sexp};
use vigil::term::TermManager;

fn run_file(source: &str, opts: &Options) -> (Vec<Outcome>, Option<String>) {
    let mut tm = TermManager::new();
    let mut ctx = ParseContext::new();
    let mut engine = engine::new_engine(&opts.engine, opts).unwrap();
    let mut outcomes = Vec::new();
    let mut last_trace = None;
    for command in sexp::parse_all(source).unwrap() {
        let Some(query) = ctx.process(&mut tm, &command).unwrap() else {
            continue;
        };
        let ts = ctx.system(&query.system).unwrap();
        let outcome = engine.query(&mut tm, ts, &query.property).unwrap();
        if outcome == Outcome::Invalid {
            last_trace = engine
                .trace()
                .map(|trace| trace.render(&mut tm).unwrap());
        }
        outcomes.push(outcome);
    }
    (outcomes, last_trace)
}

#[test]
fn counter_demo_reports_both_verdicts() {
    let (outcomes, trace) = run_file(
        include_str!("../demos/counter.mcmt"),
        &Options::default(),
    );
    assert_eq!(outcomes, vec![Outcome::Invalid, Outcome::Valid]);
    let trace = trace.unwrap();
    assert!(trace.starts_with("(trace"));
    for line in ["(n 0)", "(n 1)", "(n 2)", "(n 3)"] {
        assert!(trace.contains(line), "missing {line} in {trace}");
    }
}

#[test]
fn toggle_demo_is_safe() {
    let (outcomes, _) = run_file(
        include_str!("../demos/toggle.mcmt"),
        &Options::default(),
    );
    assert_eq!(outcomes, vec![Outcome::Valid, Outcome::Valid]);
}

#[test]
fn flip_demo_needs_deep_induction() {
    let mut opts = Options::default();
    opts.ic3_induction_max = 3;
    let (outcomes, _) = run_file(include_str!("../demos/flip.mcmt"), &opts);
    assert_eq!(outcomes, vec![Outcome::Valid]);

    let mut shallow = Options::default();
    shallow.ic3_induction_max = 1;
    shallow.ic3_max = 2;
    let (outcomes, _) = run_file(include_str!("../demos/flip.mcmt"), &shallow);
    assert_eq!(outcomes, vec![Outcome::Interrupted]);
}

#[test]
fn mutex_demo_is_safe() {
    let (outcomes, _) = run_file(
        include_str!("../demos/mutex.mcmt"),
        &Options::default(),
    );
    assert_eq!(outcomes, vec![Outcome::Valid]);
}

#[test]
fn trace_format_lists_states_and_inputs() {
    let source = "\
        (define-state-type io ((n Int)) ((step Int)))\n\
        (define-transition-system sys io\n\
          (= n 0)\n\
          (= next.n (+ state.n input.step)))\n\
        (query sys (< n 1))";
    let (outcomes, trace) = run_file(source, &Options::default());
    assert_eq!(outcomes, vec![Outcome::Invalid]);
    let trace = trace.unwrap();
    assert!(trace.contains("(state"));
    assert!(trace.contains("(input"));
    assert!(trace.contains("(step "));
}

#[test]
fn unknown_engine_and_solver_are_reported() {
    let opts = Options::default();
    assert!(engine::new_engine("bmc", &opts).is_err());

    let mut bad_solver = Options::default();
    bad_solver.solver = "yices2".to_string();
    let mut tm = TermManager::new();
    let mut ctx = ParseContext::new();
    let mut engine = engine::new_engine("pdr", &bad_solver).unwrap();
    let source = "\
        (define-state-type st ((x Bool)))\n\
        (define-transition-system sys st (= x false) (= next.x state.x))\n\
        (query sys true)";
    for command in sexp::parse_all(source).unwrap() {
        if let Some(query) = ctx.process(&mut tm, &command).unwrap() {
            let ts = ctx.system(&query.system).unwrap();
            let result = engine.query(&mut tm, ts, &query.property);
            assert!(matches!(result, Err(vigil::VigilError::UnknownSolver(_))));
        }
    }
}
