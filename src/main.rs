use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vigil::engine::{self, Outcome};
use vigil::options::Options;
use vigil::parse::{ParseContext, sexp};
use vigil::term::TermManager;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct VigilParams {
    /// Engine answering the queries.
    #[arg(long, default_value = "pdr")]
    engine: String,
    /// SMT backend.
    #[arg(long, default_value = "z3")]
    solver: String,
    /// Maximum frame index (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    ic3_max: usize,
    /// Maximum induction depth (0 = unlimited).
    #[arg(long, default_value_t = 0)]
    ic3_induction_max: usize,
    /// On valid, print the inductive invariant.
    #[arg(long)]
    ic3_show_invariant: bool,
    /// Restart the search after each frame advance.
    #[arg(long)]
    ic3_enable_restarts: bool,
    /// Do not seed the frame with the initial-state conjuncts.
    #[arg(long)]
    ic3_no_initial_state: bool,
    /// Dump a DOT graph of formula dependencies each frame.
    #[arg(long)]
    ic3_dump_dependencies: bool,
    /// Use one reachability solver with frame selector literals.
    #[arg(long)]
    ic3_single_solver: bool,
    /// On invalid, print the counterexample trace.
    #[arg(long)]
    show_trace: bool,
    /// 0 = errors only, 1 = info, 2 = debug, 3+ = trace.
    #[arg(short, long, default_value_t = 0)]
    verbosity: u8,
    /// Transition system files.
    files: Vec<PathBuf>,
}

impl From<&VigilParams> for Options {
    fn from(params: &VigilParams) -> Self {
        Options {
            engine: params.engine.clone(),
            solver: params.solver.clone(),
            ic3_max: params.ic3_max,
            ic3_induction_max: params.ic3_induction_max,
            ic3_show_invariant: params.ic3_show_invariant,
            ic3_enable_restarts: params.ic3_enable_restarts,
            ic3_no_initial_state: params.ic3_no_initial_state,
            ic3_dump_dependencies: params.ic3_dump_dependencies,
            ic3_single_solver: params.ic3_single_solver,
            show_trace: params.show_trace,
            verbosity: params.verbosity,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let params = VigilParams::parse();
    init_tracing(params.verbosity);
    let opts = Options::from(&params);

    let mut tm = TermManager::new();
    let mut engine = engine::new_engine(&opts.engine, &opts)?;

    let mut last = None;
    for file in &params.files {
        let source = std::fs::read_to_string(file)
            .with_context(|| format!("unable to read {}", file.display()))?;
        let mut ctx = ParseContext::new();
        for command in sexp::parse_all(&source)? {
            let Some(query) = ctx.process(&mut tm, &command)? else {
                continue;
            };
            let ts = ctx
                .system(&query.system)
                .context("query over an undefined system")?;
            let outcome = engine.query(&mut tm, ts, &query.property)?;
            println!("{outcome}");
            if outcome == Outcome::Invalid && opts.show_trace {
                if let Some(trace) = engine.trace() {
                    print!("{}", trace.render(&mut tm)?);
                }
            }
            last = Some(outcome);
        }
    }

    if last == Some(Outcome::Invalid) {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
