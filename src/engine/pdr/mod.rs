//! Property-directed reachability (PDR/IC3). Frames over-approximate the
//! reachable states; induction obligations are pushed through the frontier
//! in score order; counterexamples to induction are expanded backwards by
//! the reachability prover, and either refuted (learning a new frame
//! formula) or extended into a full counterexample trace.

mod frame;
mod reachability;
mod solvers;

use crate::engine::{Engine, EngineRegistration, InterruptFlag, Outcome};
use crate::engine::pdr::frame::{FormulaInfoMap, InductionObligation, ObligationQueue};
use crate::engine::pdr::reachability::{Reachability, ReachabilityStatus};
use crate::engine::pdr::solvers::SolverPool;
use crate::error::VigilError;
use crate::options::Options;
use crate::smt::{FormulaClass, SmtVerdict};
use crate::system::{StateFormula, Trace, TransitionSystem, VarClass};
use crate::term::{GcParticipant, Relocator, TermManager, TermOp, TermRef, Watermark};
use std::collections::BTreeSet;
use std::path::Path;

pub struct PdrEngine {
    opts: Options,
    interrupt: InterruptFlag,
    trace: Option<Trace>,
    invariant: Option<TermRef>,
}

impl PdrEngine {
    pub fn new(opts: &Options) -> Self {
        PdrEngine {
            opts: opts.clone(),
            interrupt: InterruptFlag::new(),
            trace: None,
            invariant: None,
        }
    }

    /// The inductive invariant the last `Valid` answer converged on: the
    /// conjunction of the final frame.
    pub fn invariant(&self) -> Option<TermRef> {
        self.invariant
    }
}

impl Engine for PdrEngine {
    fn query(
        &mut self,
        tm: &mut TermManager,
        ts: &TransitionSystem,
        property: &StateFormula,
    ) -> Result<Outcome, VigilError> {
        self.trace = None;
        self.invariant = None;
        let mut search = PdrSearch::new(tm, &self.opts, self.interrupt.clone(), ts, property)?;
        let outcome = match search.run(tm) {
            Ok(outcome) => outcome,
            Err(VigilError::SmtUnknown) => Outcome::Unknown,
            Err(VigilError::Backend(message)) => {
                tracing::error!(%message, "pdr: backend failure");
                Outcome::Unknown
            }
            Err(other) => return Err(other),
        };
        tracing::info!(%outcome, "pdr: search done");
        if outcome == Outcome::Valid {
            self.invariant = Some(search.invariant(tm)?);
        }
        self.trace = Some(search.into_trace());
        Ok(outcome)
    }

    fn trace(&self) -> Option<&Trace> {
        self.trace.as_ref()
    }

    fn interrupt_flag(&self) -> InterruptFlag {
        self.interrupt.clone()
    }
}

fn construct(opts: &Options) -> Box<dyn Engine> {
    Box::new(PdrEngine::new(opts))
}

inventory::submit! {
    EngineRegistration { id: "pdr", construct }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Learning {
    Forward,
    Backward,
}

enum PushResult {
    Pushed,
    Retry { score_decay: f64 },
    Failed { extend: bool },
}

/// All state of one query. Everything created during the search lives
/// above the watermark and is collected between frames.
struct PdrSearch {
    opts: Options,
    interrupt: InterruptFlag,
    system: TransitionSystem,
    property: TermRef,
    trace: Trace,
    pool: SolverPool,
    reachability: Reachability,
    induction_frame: BTreeSet<TermRef>,
    frame_index: usize,
    induction_depth: usize,
    queue: ObligationQueue,
    next: Vec<InductionObligation>,
    info: FormulaInfoMap,
    properties: BTreeSet<TermRef>,
    property_invalid: bool,
    learning: Learning,
    watermark: Watermark,
}

impl PdrSearch {
    fn new(
        tm: &mut TermManager,
        opts: &Options,
        interrupt: InterruptFlag,
        ts: &TransitionSystem,
        property: &StateFormula,
    ) -> Result<Self, VigilError> {
        if property.type_id() != ts.state_type().id() {
            return Err(VigilError::InvalidInput(format!(
                "property is over state type `{}` but the system is over `{}`",
                property.type_id(),
                ts.state_type().id()
            )));
        }
        if !ts.state_type().is_state_formula(tm, property.formula()) {
            return Err(VigilError::InvalidInput(
                "property is not a state formula over the system's state type".to_string(),
            ));
        }
        let watermark = tm.mark();
        let mut pool = SolverPool::new(&opts.solver, opts.ic3_single_solver, ts);
        pool.reset_induction_solver(tm, 1)?;
        let mut reachability = Reachability::new();
        reachability.ensure_frames(0);
        Ok(PdrSearch {
            opts: opts.clone(),
            interrupt,
            system: ts.clone(),
            property: property.formula(),
            trace: Trace::new(ts.state_type().clone()),
            pool,
            reachability,
            induction_frame: BTreeSet::new(),
            frame_index: 0,
            induction_depth: 1,
            queue: ObligationQueue::new(),
            next: Vec::new(),
            info: FormulaInfoMap::new(),
            properties: BTreeSet::new(),
            property_invalid: false,
            learning: Learning::Backward,
            watermark,
        })
    }

    fn into_trace(self) -> Trace {
        self.trace
    }

    /// The conjunction of the converged frame.
    fn invariant(&self, tm: &mut TermManager) -> Result<TermRef, VigilError> {
        let conjuncts: Vec<TermRef> = self.induction_frame.iter().copied().collect();
        tm.mk_and(conjuncts)
    }

    fn run(&mut self, tm: &mut TermManager) -> Result<Outcome, VigilError> {
        self.learning = if self.pool.supports_interpolation(tm)? {
            Learning::Forward
        } else {
            Learning::Backward
        };
        if !self.opts.ic3_no_initial_state {
            let init = self.system.initial_states();
            self.add_initial_states(tm, init)?;
        }
        let property = self.property;
        if !self.add_property(tm, property)? {
            self.property_invalid = true;
            return Ok(Outcome::Invalid);
        }
        loop {
            tracing::debug!("pdr: starting search");
            match self.search(tm)? {
                Outcome::Unknown => {
                    let frames = self.reachability.frames().to_vec();
                    {
                        let PdrSearch { pool, trace, .. } = self;
                        pool.reset(tm, &frames, trace)?;
                    }
                    self.pool.reset_induction_solver(tm, self.induction_depth)?;
                    let frame: Vec<TermRef> = self.induction_frame.iter().copied().collect();
                    for f in frame {
                        self.pool.assert_to_induction(tm, f)?;
                    }
                }
                outcome => return Ok(outcome),
            }
        }
    }

    /// Conjunct-split the initial states into frame 0.
    fn add_initial_states(&mut self, tm: &mut TermManager, f: TermRef) -> Result<(), VigilError> {
        if tm.op_of(f) == TermOp::And {
            for c in tm.children(f).to_vec() {
                self.add_initial_states(tm, c)?;
            }
            return Ok(());
        }
        if !self.induction_frame.contains(&f) {
            {
                let PdrSearch {
                    reachability, pool, ..
                } = self;
                reachability.add_to_frame(tm, pool, 0, f)?;
            }
            self.add_to_induction_frame(tm, f)?;
            let cex = tm.mk_not(f)?;
            self.enqueue(InductionObligation::new(f, cex, 0, 0.0));
        }
        Ok(())
    }

    /// Conjunct-split the property into frame 0, checking each conjunct
    /// there first. Returns false if the property already fails at the
    /// initial states; the one-state trace is recorded.
    fn add_property(&mut self, tm: &mut TermManager, p: TermRef) -> Result<bool, VigilError> {
        if tm.op_of(p) == TermOp::And {
            for c in tm.children(p).to_vec() {
                if !self.add_property(tm, c)? {
                    return Ok(false);
                }
            }
            return Ok(true);
        }
        let not_p = tm.mk_not(p)?;
        let result = self.pool.query_at(tm, 0, not_p, FormulaClass::A)?;
        if result.verdict == SmtVerdict::Unsat {
            if !self.induction_frame.contains(&p) {
                {
                    let PdrSearch {
                        reachability, pool, ..
                    } = self;
                    reachability.add_to_frame(tm, pool, 0, p)?;
                }
                self.add_to_induction_frame(tm, p)?;
                self.enqueue(InductionObligation::new(p, not_p, 0, 0.0));
            }
            self.properties.insert(p);
            Ok(true)
        } else {
            if let Some(model) = &result.model {
                self.trace
                    .add_model_for_step(tm, model, VarClass::Current, 0);
            }
            Ok(false)
        }
    }

    fn add_to_induction_frame(&mut self, tm: &mut TermManager, f: TermRef) -> Result<(), VigilError> {
        debug_assert!(!self.induction_frame.contains(&f));
        self.induction_frame.insert(f);
        self.pool.assert_to_induction(tm, f)
    }

    fn enqueue(&mut self, obligation: InductionObligation) {
        debug_assert!(self.induction_frame.contains(&obligation.fwd));
        debug_assert!(!self.queue.contains(obligation.fwd));
        self.queue.push(obligation);
    }

    fn set_invalid(&mut self, f: TermRef, frame: usize) {
        self.info.set_invalid(f, frame);
        if self.properties.contains(&f) {
            self.property_invalid = true;
        }
    }

    fn search(&mut self, tm: &mut TermManager) -> Result<Outcome, VigilError> {
        loop {
            self.info.clear_parents();

            if let Some(outcome) = self.push_current_frame(tm)? {
                return Ok(outcome);
            }
            if self.property_invalid {
                return Ok(Outcome::Invalid);
            }
            let all_pushed = self.induction_frame.len() == self.next.len();
            let properties_present = self
                .properties
                .iter()
                .all(|p| self.induction_frame.contains(p));
            if all_pushed && properties_present {
                if self.opts.ic3_show_invariant {
                    self.print_invariant(tm)?;
                }
                return Ok(Outcome::Valid);
            }

            self.frame_index += 1;
            self.queue.clear();
            tracing::debug!(frame = self.frame_index, "pdr: extending trace");
            if self.opts.ic3_max != 0 && self.frame_index == self.opts.ic3_max {
                return Ok(Outcome::Interrupted);
            }

            let depth = if self.opts.ic3_induction_max == 0 {
                self.induction_depth + 1
            } else {
                (self.induction_depth + 1).min(self.opts.ic3_induction_max)
            };
            self.induction_depth = depth;
            {
                let PdrSearch { pool, trace, .. } = self;
                pool.new_frame(tm, trace)?;
            }
            self.pool.reset_induction_solver(tm, depth)?;
            self.reachability.ensure_frames(self.frame_index);

            self.induction_frame.clear();
            let next = std::mem::take(&mut self.next);
            for mut obligation in next {
                if self.info.is_invalid(obligation.fwd) {
                    continue;
                }
                self.add_to_induction_frame(tm, obligation.fwd)?;
                obligation.bump_score(0.5);
                obligation.depth = 0;
                self.enqueue(obligation);
            }

            self.run_gc(tm);

            if self.opts.ic3_enable_restarts {
                return Ok(Outcome::Unknown);
            }
        }
    }

    /// Pop obligations in priority order until the queue is drained or the
    /// property is refuted.
    fn push_current_frame(
        &mut self,
        tm: &mut TermManager,
    ) -> Result<Option<Outcome>, VigilError> {
        let cutoff = 8 * (self.frame_index + 1) * self.induction_depth.max(1);
        while !self.property_invalid {
            if self.interrupt.is_set() {
                return Ok(Some(Outcome::Interrupted));
            }
            let Some(mut obligation) = self.queue.pop_max() else {
                break;
            };
            if self.info.is_invalid(obligation.fwd) {
                continue;
            }
            if obligation.depth > cutoff {
                tracing::debug!(
                    formula = %tm.display(obligation.fwd),
                    depth = obligation.depth,
                    "pdr: depth cutoff, discarding for this pass"
                );
                continue;
            }
            match self.push_obligation(tm, &mut obligation)? {
                PushResult::Pushed => self.next.push(obligation),
                PushResult::Retry { score_decay } => {
                    let fwd = obligation.fwd;
                    self.queue.push(obligation);
                    self.queue.bump_score(fwd, -score_decay);
                }
                PushResult::Failed { extend } => {
                    self.set_invalid(obligation.fwd, self.frame_index + 1);
                    if extend {
                        self.extend_induction_failure(tm, obligation.fwd)?;
                    }
                }
            }
        }
        if self.opts.ic3_dump_dependencies {
            let path = format!("dependency.{}.dot", self.frame_index);
            if let Err(error) = self.info.write_dot(Path::new(&path)) {
                tracing::debug!(%error, "pdr: dependency dump failed");
            }
        }
        Ok(None)
    }

    /// One induction attempt, following the frame scheduler contract:
    /// inductive formulas move to the next frame; a counterexample to
    /// induction that re-reaches the refuted generalization is expanded
    /// backwards, and if unreachable a refutation is learnt and both
    /// obligations re-enter the queue.
    fn push_obligation(
        &mut self,
        tm: &mut TermManager,
        obligation: &mut InductionObligation,
    ) -> Result<PushResult, VigilError> {
        tracing::debug!(
            frame = self.frame_index,
            formula = %tm.display(obligation.fwd),
            "pdr: pushing"
        );
        let result = self.pool.check_inductive(tm, obligation.fwd)?;
        if result.verdict == SmtVerdict::Unsat {
            return Ok(PushResult::Pushed);
        }
        let model = result
            .model
            .ok_or_else(|| VigilError::Backend("missing CTI model".to_string()))?;
        let g = result
            .generalization
            .ok_or_else(|| VigilError::Backend("missing CTI generalization".to_string()))?;
        tracing::trace!(generalization = %tm.display(g), "pdr: counterexample to induction");

        if !self
            .pool
            .model_satisfies_at_last_step(tm, &model, obligation.cex)?
        {
            return Ok(PushResult::Failed { extend: false });
        }

        let mut budget = self.frame_index + 1;
        let status = {
            let PdrSearch {
                pool,
                reachability,
                system,
                frame_index,
                ..
            } = self;
            reachability.check_reachable(
                tm,
                pool,
                system.state_type(),
                *frame_index,
                g,
                model,
                &mut budget,
            )?
        };
        match status {
            ReachabilityStatus::Reachable => Ok(PushResult::Failed { extend: true }),
            ReachabilityStatus::BudgetExceeded => {
                obligation.depth += self.induction_depth;
                Ok(PushResult::Retry { score_decay: 1.0 })
            }
            ReachabilityStatus::Unreachable => {
                let g_not = tm.mk_not(g)?;
                let mut learnt = g_not;
                if self.learning == Learning::Forward {
                    let forward = self.pool.learn_forward(tm, self.frame_index, g)?;
                    if !self.info.is_invalid(forward) {
                        learnt = forward;
                    }
                }
                if !self.induction_frame.contains(&learnt) {
                    self.add_to_induction_frame(tm, learnt)?;
                    if !self.info.is_invalid(learnt) {
                        self.enqueue(InductionObligation::new(
                            learnt,
                            g,
                            obligation.depth + self.induction_depth,
                            0.0,
                        ));
                        self.info.set_refutes(learnt, obligation.fwd, g);
                    }
                    if self.learning == Learning::Forward
                        && learnt != g_not
                        && !self.induction_frame.contains(&g_not)
                    {
                        self.add_to_induction_frame(tm, g_not)?;
                        self.enqueue(InductionObligation::new(
                            g_not,
                            g,
                            obligation.depth + self.induction_depth,
                            0.0,
                        ));
                        self.info.set_refutes(g_not, obligation.fwd, g);
                    }
                }
                let score_decay = 1.0 / obligation.depth.max(1) as f64;
                obligation.depth += self.induction_depth;
                Ok(PushResult::Retry { score_decay })
            }
        }
    }

    /// The CTI of `f` is reachable: reconstruct the concrete path in the
    /// counterexample solver and walk the parent chain, extending by the
    /// current unrolling per link, until a property root or an
    /// unextendable link.
    fn extend_induction_failure(
        &mut self,
        tm: &mut TermManager,
        f: TermRef,
    ) -> Result<(), VigilError> {
        let snapshot = self.pool.get_counterexample_solver_depth();
        {
            let PdrSearch { pool, trace, .. } = self;
            pool.cex_push(tm, trace)?;
        }
        let result = self.extend_failure_inner(tm, f);
        self.pool.cex_pop(snapshot);
        result
    }

    fn extend_failure_inner(&mut self, tm: &mut TermManager, f: TermRef) -> Result<(), VigilError> {
        let steps = self.induction_depth;
        let cex: Vec<TermRef> = self.reachability.cex().iter().copied().collect();
        debug_assert_eq!(cex.len(), self.frame_index + 1);

        let mut k = self.frame_index + steps;
        {
            let PdrSearch { pool, trace, .. } = self;
            pool.ensure_counterexample_solver_depth(tm, trace, k)?;
        }
        for (j, g) in cex.iter().enumerate() {
            let g_j = self.trace.state_formula_at(tm, *g, j)?;
            self.pool.cex_add(tm, g_j)?;
        }
        let not_f = tm.mk_not(f)?;
        let not_f_k = self.trace.state_formula_at(tm, not_f, k)?;
        self.pool.cex_add(tm, not_f_k)?;
        if self.pool.cex_check()? != SmtVerdict::Sat {
            return Err(VigilError::Backend(
                "counterexample reconstruction failed".to_string(),
            ));
        }
        let model = self.pool.cex_model(tm)?;
        self.trace.add_model(&model);

        let mut f = f;
        loop {
            debug_assert!(self.info.is_invalid(f));
            if !self.info.has_parent(f) {
                if self.properties.contains(&f) {
                    tracing::info!(
                        depth = self.pool.get_counterexample_solver_depth(),
                        frame = self.frame_index,
                        "pdr: counterexample found"
                    );
                }
                break;
            }
            if let Some(refuted) = self.info.refutes_of(f) {
                tracing::trace!(
                    refutes = %tm.display(refuted),
                    "pdr: extending along parent link"
                );
            }
            let Some(parent) = self.info.parent_of(f) else {
                break;
            };
            f = parent;
            if self.info.is_invalid(f) {
                break;
            }
            k += steps;
            {
                let PdrSearch { pool, trace, .. } = self;
                pool.ensure_counterexample_solver_depth(tm, trace, k)?;
            }
            let not_f = tm.mk_not(f)?;
            let not_f_k = self.trace.state_formula_at(tm, not_f, k)?;
            self.pool.cex_add(tm, not_f_k)?;
            if self.pool.cex_check()? != SmtVerdict::Sat {
                break;
            }
            self.set_invalid(f, k);
            let model = self.pool.cex_model(tm)?;
            self.trace.add_model(&model);
        }
        Ok(())
    }

    fn print_invariant(&self, tm: &mut TermManager) -> Result<(), VigilError> {
        let invariant = self.invariant(tm)?;
        self.system.state_type().push_namespaces(tm);
        println!("(invariant {})", tm.display(invariant));
        self.system.state_type().pop_namespaces(tm);
        Ok(())
    }

    fn run_gc(&mut self, tm: &mut TermManager) {
        self.pool.gc();
        let mut roots = Vec::new();
        self.gc_roots(&mut roots);
        let reloc = tm.gc(self.watermark, &roots);
        self.gc_relocate(&reloc);
    }
}

impl GcParticipant for PdrSearch {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        roots.push(self.property);
        self.system.gc_roots(roots);
        self.trace.gc_roots(roots);
        self.pool.gc_roots(roots);
        self.reachability.gc_roots(roots);
        self.queue.gc_roots(roots);
        self.info.gc_roots(roots);
        roots.extend(self.induction_frame.iter().copied());
        roots.extend(self.properties.iter().copied());
        for obligation in &self.next {
            roots.push(obligation.fwd);
            roots.push(obligation.cex);
        }
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        reloc.reloc(&mut self.property);
        self.system.gc_relocate(reloc);
        self.trace.gc_relocate(reloc);
        self.pool.gc_relocate(reloc);
        self.reachability.gc_relocate(reloc);
        self.queue.gc_relocate(reloc);
        self.info.gc_relocate(reloc);
        for set in [&mut self.induction_frame, &mut self.properties] {
            let old = std::mem::take(set);
            for mut f in old {
                reloc.reloc(&mut f);
                set.insert(f);
            }
        }
        for obligation in self.next.iter_mut() {
            reloc.reloc(&mut obligation.fwd);
            reloc.reloc(&mut obligation.cex);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::StateType;
    use crate::term::model::Value;
    use num_bigint::BigInt;

    fn query(
        tm: &mut TermManager,
        opts: &Options,
        ts: &TransitionSystem,
        property: TermRef,
    ) -> (Outcome, Option<Trace>) {
        let sf = StateFormula::new(tm, ts.state_type(), property).unwrap();
        let mut engine = PdrEngine::new(opts);
        let outcome = engine.query(tm, ts, &sf).unwrap();
        let trace = match outcome {
            Outcome::Invalid => engine.trace,
            _ => None,
        };
        (outcome, trace)
    }

    fn bit_system(tm: &mut TermManager) -> TransitionSystem {
        let bty = tm.bool_type();
        let st = StateType::new(tm, "bit", &[("x".to_string(), bty)], &[]);
        let x = st.variables(VarClass::Current)[0];
        let x_next = st.variables(VarClass::Next)[0];
        let f = tm.false_term();
        let init = tm.mk_term(TermOp::Eq, &[x, f]).unwrap();
        let not_x = tm.mk_not(x).unwrap();
        let step = tm.mk_term(TermOp::Eq, &[x_next, not_x]).unwrap();
        TransitionSystem::new(tm, st, init, step).unwrap()
    }

    fn counter_system(tm: &mut TermManager) -> TransitionSystem {
        let ity = tm.integer_type();
        let st = StateType::new(tm, "counter", &[("n".to_string(), ity)], &[]);
        let n = st.variables(VarClass::Current)[0];
        let n_next = st.variables(VarClass::Next)[0];
        let zero = tm.mk_integer_i64(0);
        let one = tm.mk_integer_i64(1);
        let init = tm.mk_term(TermOp::Eq, &[n, zero]).unwrap();
        let sum = tm.mk_term(TermOp::Add, &[n, one]).unwrap();
        let step = tm.mk_term(TermOp::Eq, &[n_next, sum]).unwrap();
        TransitionSystem::new(tm, st, init, step).unwrap()
    }

    /// x' = 1 - x from x = 0: the bound x <= 1 is 2-inductive but not
    /// 1-inductive.
    fn flip_system(tm: &mut TermManager) -> TransitionSystem {
        let ity = tm.integer_type();
        let st = StateType::new(tm, "flip", &[("x".to_string(), ity)], &[]);
        let x = st.variables(VarClass::Current)[0];
        let x_next = st.variables(VarClass::Next)[0];
        let zero = tm.mk_integer_i64(0);
        let one = tm.mk_integer_i64(1);
        let init = tm.mk_term(TermOp::Eq, &[x, zero]).unwrap();
        let diff = tm.mk_term(TermOp::Sub, &[one, x]).unwrap();
        let step = tm.mk_term(TermOp::Eq, &[x_next, diff]).unwrap();
        TransitionSystem::new(tm, st, init, step).unwrap()
    }

    #[test]
    fn s1_trivial_property_is_valid() {
        let mut tm = TermManager::new();
        let ts = bit_system(&mut tm);
        let property = tm.true_term();
        let (outcome, _) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn s2_tautological_property_is_valid() {
        let mut tm = TermManager::new();
        let ts = bit_system(&mut tm);
        let x = ts.state_type().variables(VarClass::Current)[0];
        let t = tm.true_term();
        let f = tm.false_term();
        let is_false = tm.mk_term(TermOp::Eq, &[x, f]).unwrap();
        let is_true = tm.mk_term(TermOp::Eq, &[x, t]).unwrap();
        let property = tm.mk_term(TermOp::Or, &[is_false, is_true]).unwrap();
        let (outcome, _) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn s3_counter_bound_fails_with_four_state_trace() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let two = tm.mk_integer_i64(2);
        let property = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        let (outcome, trace) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Invalid);

        let trace = trace.expect("invalid answers carry a trace");
        let rendered = trace.render(&mut tm).unwrap();
        for expected in ["(n 0)", "(n 1)", "(n 2)", "(n 3)"] {
            assert!(rendered.contains(expected), "missing {expected} in {rendered}");
        }

        // The trace is a genuine execution: init at step 0, each step a
        // transition, property violated at the end.
        let st = ts.state_type().clone();
        let mut probe = Trace::new(st);
        let model = trace.model();
        let init_0 = probe
            .state_formula_at(&mut tm, ts.initial_states(), 0)
            .unwrap();
        assert!(model.eval(&tm, init_0).unwrap().is_true());
        for step in 0..3 {
            let t_step = probe
                .transition_formula_at(&mut tm, ts.transition_relation(), step)
                .unwrap();
            assert!(model.eval(&tm, t_step).unwrap().is_true());
        }
        let not_p = tm.mk_not(property).unwrap();
        let end = probe.state_formula_at(&mut tm, not_p, 3).unwrap();
        assert!(model.eval(&tm, end).unwrap().is_true());
    }

    #[test]
    fn s4_counter_lower_bound_is_valid() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let zero = tm.mk_integer_i64(0);
        let property = tm.mk_term(TermOp::Geq, &[n, zero]).unwrap();
        let (outcome, _) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn s4_invariant_is_inductive_and_implies_the_property() {
        use crate::smt::SmtSolver;
        use crate::smt::z3::Z3Solver;

        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let zero = tm.mk_integer_i64(0);
        let property = tm.mk_term(TermOp::Geq, &[n, zero]).unwrap();
        let sf = StateFormula::new(&tm, ts.state_type(), property).unwrap();
        let mut engine = PdrEngine::new(&Options::default());
        assert_eq!(engine.query(&mut tm, &ts, &sf).unwrap(), Outcome::Valid);
        let invariant = engine.invariant().unwrap();

        let unsat = |tm: &TermManager, formulas: &[TermRef]| {
            let mut solver = Z3Solver::new();
            for &f in formulas {
                solver.add(tm, f, FormulaClass::A).unwrap();
            }
            solver.check().unwrap() == SmtVerdict::Unsat
        };

        // Init ⇒ Inv.
        let not_inv = tm.mk_not(invariant).unwrap();
        assert!(unsat(&tm, &[ts.initial_states(), not_inv]));

        // Inv ∧ T ⇒ Inv'.
        let inv_next = ts
            .state_type()
            .change_formula_vars(&mut tm, VarClass::Current, VarClass::Next, invariant)
            .unwrap();
        let not_inv_next = tm.mk_not(inv_next).unwrap();
        assert!(unsat(
            &tm,
            &[invariant, ts.transition_relation(), not_inv_next]
        ));

        // Inv ⇒ Property.
        let not_p = tm.mk_not(property).unwrap();
        assert!(unsat(&tm, &[invariant, not_p]));
    }

    #[test]
    fn s5_mutex_is_valid() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let st = StateType::new(
            &mut tm,
            "mutex",
            &[
                ("pc1".to_string(), ity),
                ("pc2".to_string(), ity),
                ("turn".to_string(), ity),
            ],
            &[],
        );
        let pc1 = st.variables(VarClass::Current)[0];
        let pc2 = st.variables(VarClass::Current)[1];
        let turn = st.variables(VarClass::Current)[2];
        let pc1_n = st.variables(VarClass::Next)[0];
        let pc2_n = st.variables(VarClass::Next)[1];
        let turn_n = st.variables(VarClass::Next)[2];
        let num =
            |tm: &mut TermManager, v: i64| tm.mk_integer_i64(v);
        let eq = |tm: &mut TermManager, a: TermRef, b: TermRef| {
            tm.mk_term(TermOp::Eq, &[a, b]).unwrap()
        };

        let zero = num(&mut tm, 0);
        let one = num(&mut tm, 1);
        let two = num(&mut tm, 2);
        let init = {
            let a = eq(&mut tm, pc1, zero);
            let b = eq(&mut tm, pc2, zero);
            let c = eq(&mut tm, turn, one);
            tm.mk_and(vec![a, b, c]).unwrap()
        };

        let move_formula = |tm: &mut TermManager, conjuncts: Vec<TermRef>| {
            tm.mk_and(conjuncts).unwrap()
        };
        // Process 1: idle -> try (yield turn), try -> crit when it is our
        // turn, crit -> idle.
        let m1 = {
            let g = eq(&mut tm, pc1, zero);
            let a = eq(&mut tm, pc1_n, one);
            let b = eq(&mut tm, turn_n, two);
            let c = eq(&mut tm, pc2_n, pc2);
            move_formula(&mut tm, vec![g, a, b, c])
        };
        let m2 = {
            let g1 = eq(&mut tm, pc1, one);
            let g2 = eq(&mut tm, turn, one);
            let a = eq(&mut tm, pc1_n, two);
            let b = eq(&mut tm, turn_n, turn);
            let c = eq(&mut tm, pc2_n, pc2);
            move_formula(&mut tm, vec![g1, g2, a, b, c])
        };
        let m3 = {
            let g = eq(&mut tm, pc1, two);
            let a = eq(&mut tm, pc1_n, zero);
            let b = eq(&mut tm, turn_n, turn);
            let c = eq(&mut tm, pc2_n, pc2);
            move_formula(&mut tm, vec![g, a, b, c])
        };
        // Process 2, symmetric.
        let m4 = {
            let g = eq(&mut tm, pc2, zero);
            let a = eq(&mut tm, pc2_n, one);
            let b = eq(&mut tm, turn_n, one);
            let c = eq(&mut tm, pc1_n, pc1);
            move_formula(&mut tm, vec![g, a, b, c])
        };
        let m5 = {
            let g1 = eq(&mut tm, pc2, one);
            let g2 = eq(&mut tm, turn, two);
            let a = eq(&mut tm, pc2_n, two);
            let b = eq(&mut tm, turn_n, turn);
            let c = eq(&mut tm, pc1_n, pc1);
            move_formula(&mut tm, vec![g1, g2, a, b, c])
        };
        let m6 = {
            let g = eq(&mut tm, pc2, two);
            let a = eq(&mut tm, pc2_n, zero);
            let b = eq(&mut tm, turn_n, turn);
            let c = eq(&mut tm, pc1_n, pc1);
            move_formula(&mut tm, vec![g, a, b, c])
        };
        let step = tm.mk_or(vec![m1, m2, m3, m4, m5, m6]).unwrap();
        let ts = TransitionSystem::new(&tm, st, init, step).unwrap();

        let both_crit = {
            let a = eq(&mut tm, pc1, two);
            let b = eq(&mut tm, pc2, two);
            tm.mk_and(vec![a, b]).unwrap()
        };
        let property = tm.mk_not(both_crit).unwrap();
        let (outcome, _) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn s6_deep_induction_succeeds_where_single_step_cannot() {
        let mut tm = TermManager::new();
        let ts = flip_system(&mut tm);
        let x = ts.state_type().variables(VarClass::Current)[0];
        let one = tm.mk_integer_i64(1);
        let property = tm.mk_term(TermOp::Leq, &[x, one]).unwrap();

        let mut deep = Options::default();
        deep.ic3_induction_max = 3;
        let (outcome, _) = query(&mut tm, &deep, &ts, property);
        assert_eq!(outcome, Outcome::Valid);

        let mut shallow = Options::default();
        shallow.ic3_induction_max = 1;
        shallow.ic3_max = 2;
        let (outcome, _) = query(&mut tm, &shallow, &ts, property);
        assert_eq!(outcome, Outcome::Interrupted);
    }

    #[test]
    fn property_violated_at_initial_state() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let minus_one = tm.mk_integer_i64(-1);
        let property = tm.mk_term(TermOp::Leq, &[n, minus_one]).unwrap();
        let (outcome, trace) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Invalid);
        let trace = trace.unwrap();
        assert_eq!(trace.size(), 1);
        let rendered = trace.render(&mut tm).unwrap();
        assert!(rendered.contains("(n 0)"));
    }

    #[test]
    fn restart_mode_reaches_the_same_verdict() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let zero = tm.mk_integer_i64(0);
        let property = tm.mk_term(TermOp::Geq, &[n, zero]).unwrap();
        let mut opts = Options::default();
        opts.ic3_enable_restarts = true;
        let (outcome, _) = query(&mut tm, &opts, &ts, property);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn single_solver_mode_reaches_the_same_verdict() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let two = tm.mk_integer_i64(2);
        let property = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        let mut opts = Options::default();
        opts.ic3_single_solver = true;
        let (outcome, trace) = query(&mut tm, &opts, &ts, property);
        assert_eq!(outcome, Outcome::Invalid);
        let rendered = trace.unwrap().render(&mut tm).unwrap();
        assert!(rendered.contains("(n 3)"));
    }

    #[test]
    fn skipping_initial_states_drops_their_strengthening() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let zero = tm.mk_integer_i64(0);
        let lower = tm.mk_term(TermOp::Geq, &[n, zero]).unwrap();
        let mut opts = Options::default();
        opts.ic3_no_initial_state = true;

        // Properties that only hold because of the initial states now fail
        // at frame 0.
        let (outcome, _) = query(&mut tm, &opts, &ts, lower);
        assert_eq!(outcome, Outcome::Invalid);

        // Tautologies still go through.
        let not_lower = tm.mk_not(lower).unwrap();
        let tautology = tm.mk_term(TermOp::Or, &[lower, not_lower]).unwrap();
        let (outcome, _) = query(&mut tm, &opts, &ts, tautology);
        assert_eq!(outcome, Outcome::Valid);
    }

    #[test]
    fn mismatched_state_types_are_rejected() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let other = bit_system(&mut tm);
        let x = other.state_type().variables(VarClass::Current)[0];
        let sf = StateFormula::new(&tm, other.state_type(), x).unwrap();
        let mut engine = PdrEngine::new(&Options::default());
        let result = engine.query(&mut tm, &ts, &sf);
        assert!(matches!(result, Err(VigilError::InvalidInput(_))));
    }

    #[test]
    fn interrupt_flag_stops_the_search() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let two = tm.mk_integer_i64(2);
        let property = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        let sf = StateFormula::new(&tm, ts.state_type(), property).unwrap();
        let mut engine = PdrEngine::new(&Options::default());
        engine.interrupt_flag().interrupt();
        let outcome = engine.query(&mut tm, &ts, &sf).unwrap();
        assert_eq!(outcome, Outcome::Interrupted);
    }

    #[test]
    fn model_values_survive_into_the_trace() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let two = tm.mk_integer_i64(2);
        let property = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        let (outcome, trace) = query(&mut tm, &Options::default(), &ts, property);
        assert_eq!(outcome, Outcome::Invalid);
        let trace = trace.unwrap();
        let mut probe = Trace::new(ts.state_type().clone());
        let s3 = probe.state_variables(&mut tm, 3)[0];
        assert_eq!(
            trace.model().value_of(s3),
            Some(&Value::Integer(BigInt::from(3)))
        );
    }
}
