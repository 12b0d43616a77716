//! Backward reachability: decide whether a formula can be reached from the
//! initial states within k steps, learning refutations into the frames
//! along the way.

use crate::engine::pdr::solvers::SolverPool;
use crate::error::VigilError;
use crate::smt::{FormulaClass, SmtVerdict};
use crate::system::{StateType, VarClass};
use crate::term::model::Model;
use crate::term::{GcParticipant, Relocator, TermManager, TermRef};
use std::collections::{BTreeSet, VecDeque};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ReachabilityStatus {
    Reachable,
    Unreachable,
    BudgetExceeded,
}

/// One step of the backward expansion: reach `formula` at frame `frame`,
/// witnessed by `model`.
#[derive(Debug)]
struct ReachabilityObligation {
    frame: usize,
    formula: TermRef,
    model: Model,
}

/// The reachability prover owns the frame contents: frame `k` is the set
/// of formulas known to hold on all states reachable in at most `k`
/// steps.
#[derive(Debug, Default)]
pub struct Reachability {
    frames: Vec<BTreeSet<TermRef>>,
    cex: VecDeque<TermRef>,
}

impl Reachability {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ensure_frames(&mut self, k: usize) {
        while self.frames.len() <= k {
            self.frames.push(BTreeSet::new());
        }
    }

    pub fn frames(&self) -> &[BTreeSet<TermRef>] {
        &self.frames
    }

    /// Record `f` at frame `k` and assert it in the frame solver.
    pub fn add_to_frame(
        &mut self,
        tm: &mut TermManager,
        pool: &mut SolverPool,
        k: usize,
        f: TermRef,
    ) -> Result<(), VigilError> {
        self.ensure_frames(k);
        if self.frames[k].insert(f) {
            pool.add(tm, k, f)?;
        }
        Ok(())
    }

    /// The counterexample path of the last `Reachable` answer: one
    /// generalized state per frame, in frame order.
    pub fn cex(&self) -> &VecDeque<TermRef> {
        &self.cex
    }

    /// Decide whether `g` is reachable from the initial states within `k`
    /// steps, by backward expansion over a LIFO stack of obligations. Each
    /// refutation below the top frame learns a forward formula into frames
    /// `1..=i` and costs one unit of `budget`.
    #[allow(clippy::too_many_arguments)]
    pub fn check_reachable(
        &mut self,
        tm: &mut TermManager,
        pool: &mut SolverPool,
        state_type: &StateType,
        k: usize,
        g: TermRef,
        model: Model,
        budget: &mut usize,
    ) -> Result<ReachabilityStatus, VigilError> {
        self.cex.clear();
        self.ensure_frames(k);
        let mut stack = vec![ReachabilityObligation {
            frame: k,
            formula: g,
            model,
        }];
        while let Some(top) = stack.last() {
            if top.frame == 0 {
                self.cex = stack.iter().rev().map(|o| o.formula).collect();
                tracing::debug!(frame = k, "pdr: counterexample path of {} states", self.cex.len());
                return Ok(ReachabilityStatus::Reachable);
            }
            let (i, h) = (top.frame, top.formula);
            tracing::trace!(
                frame = i,
                witness_vars = top.model.len(),
                "pdr: expanding reachability obligation"
            );
            let h_next =
                state_type.change_formula_vars(tm, VarClass::Current, VarClass::Next, h)?;
            let result = pool.query_at(tm, i - 1, h_next, FormulaClass::B)?;
            match result.verdict {
                SmtVerdict::Sat => {
                    let generalization = result
                        .generalization
                        .ok_or_else(|| VigilError::Backend("missing generalization".to_string()))?;
                    let witness = result
                        .model
                        .ok_or_else(|| VigilError::Backend("missing model".to_string()))?;
                    stack.push(ReachabilityObligation {
                        frame: i - 1,
                        formula: generalization,
                        model: witness,
                    });
                }
                SmtVerdict::Unsat => {
                    stack.pop();
                    if i < k {
                        let learnt = pool.learn_forward(tm, i, h)?;
                        for j in 1..=i {
                            self.add_to_frame(tm, pool, j, learnt)?;
                        }
                        *budget = budget.saturating_sub(1);
                        if *budget == 0 {
                            return Ok(ReachabilityStatus::BudgetExceeded);
                        }
                    }
                }
                SmtVerdict::Unknown => return Err(VigilError::SmtUnknown),
            }
        }
        Ok(ReachabilityStatus::Unreachable)
    }
}

impl GcParticipant for Reachability {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        for frame in &self.frames {
            roots.extend(frame.iter().copied());
        }
        roots.extend(self.cex.iter().copied());
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        for frame in self.frames.iter_mut() {
            let old = std::mem::take(frame);
            for mut f in old {
                reloc.reloc(&mut f);
                frame.insert(f);
            }
        }
        for f in self.cex.iter_mut() {
            reloc.reloc(f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::{StateType, TransitionSystem};
    use crate::term::TermOp;

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

    #[test]
    fn finds_reachable_state_with_full_path() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let st = ts.state_type().clone();
        let n = st.variables(VarClass::Current)[0];
        let mut pool = SolverPool::new("z3", false, &ts);
        let mut reach = Reachability::new();
        reach
            .add_to_frame(&mut tm, &mut pool, 0, ts.initial_states())
            .unwrap();

        // n = 2 is reachable in two steps.
        let two = tm.mk_integer_i64(2);
        let target = tm.mk_term(TermOp::Eq, &[n, two]).unwrap();
        let mut trace = crate::system::Trace::new(st.clone());
        for _ in 0..2 {
            pool.new_frame(&mut tm, &mut trace).unwrap();
        }
        let mut budget = 10;
        let status = reach
            .check_reachable(&mut tm, &mut pool, &st, 2, target, Model::new(true), &mut budget)
            .unwrap();
        assert_eq!(status, ReachabilityStatus::Reachable);
        assert_eq!(reach.cex().len(), 3);
    }

    #[test]
    fn refutes_unreachable_state() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let st = ts.state_type().clone();
        let n = st.variables(VarClass::Current)[0];
        let mut pool = SolverPool::new("z3", false, &ts);
        let mut reach = Reachability::new();
        reach
            .add_to_frame(&mut tm, &mut pool, 0, ts.initial_states())
            .unwrap();

        // n = 5 is not reachable within two steps of n = 0.
        let five = tm.mk_integer_i64(5);
        let target = tm.mk_term(TermOp::Eq, &[n, five]).unwrap();
        let mut trace = crate::system::Trace::new(st.clone());
        for _ in 0..2 {
            pool.new_frame(&mut tm, &mut trace).unwrap();
        }
        let mut budget = 10;
        let status = reach
            .check_reachable(&mut tm, &mut pool, &st, 2, target, Model::new(true), &mut budget)
            .unwrap();
        assert_eq!(status, ReachabilityStatus::Unreachable);
        // The refutation of the intermediate obligation was learnt into
        // frame 1.
        assert!(budget < 10);
    }
}
