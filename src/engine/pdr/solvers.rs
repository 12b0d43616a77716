//! The solver pool: per-frame reachability solvers (or one shared solver
//! discriminated by frame selector literals), the induction solver with a
//! k-step unrolling, and the counterexample solver unrolled over the trace
//! variables.

use crate::error::VigilError;
use crate::smt::{
    Feature, FormulaClass, GeneralizeDirection, SmtSolver, SmtVerdict, new_solver, scoped,
};
use crate::system::{StateType, Trace, TransitionSystem, VarClass};
use crate::term::model::Model;
use crate::term::{GcParticipant, Relocator, SubstMap, TermManager, TermOp, TermRef};
use std::collections::BTreeSet;

/// Outcome of a pooled query: on `Sat`, the model and the (equality-split)
/// backward generalization come along.
#[derive(Debug)]
pub struct QueryResult {
    pub verdict: SmtVerdict,
    pub model: Option<Model>,
    pub generalization: Option<TermRef>,
}

pub struct SolverPool {
    solver_id: String,
    single_solver: bool,
    size: usize,
    state_type: StateType,
    transition_relation: TermRef,
    initial_states: TermRef,
    frame_solvers: Vec<Box<dyn SmtSolver>>,
    shared_solver: Option<Box<dyn SmtSolver>>,
    frame_variables: Vec<TermRef>,
    induction_solver: Option<Box<dyn SmtSolver>>,
    induction_depth: usize,
    unroll_states: Vec<Vec<TermRef>>,
    unroll_inputs: Vec<Vec<TermRef>>,
    cex_solver: Option<Box<dyn SmtSolver>>,
    cex_depth: usize,
    cex_vars_depth: usize,
}

impl SolverPool {
    pub fn new(solver_id: &str, single_solver: bool, ts: &TransitionSystem) -> Self {
        SolverPool {
            solver_id: solver_id.to_string(),
            single_solver,
            size: 1,
            state_type: ts.state_type().clone(),
            transition_relation: ts.transition_relation(),
            initial_states: ts.initial_states(),
            frame_solvers: Vec::new(),
            shared_solver: None,
            frame_variables: Vec::new(),
            induction_solver: None,
            induction_depth: 0,
            unroll_states: Vec::new(),
            unroll_inputs: Vec::new(),
            cex_solver: None,
            cex_depth: 0,
            cex_vars_depth: 0,
        }
    }

    fn make_transition_solver(
        &self,
        tm: &mut TermManager,
    ) -> Result<Box<dyn SmtSolver>, VigilError> {
        let mut solver = new_solver(&self.solver_id)?;
        for &v in self.state_type.variables(VarClass::Current) {
            solver.add_variable(v, FormulaClass::A);
        }
        for &v in self.state_type.variables(VarClass::Next) {
            solver.add_variable(v, FormulaClass::B);
        }
        for &v in self.state_type.variables(VarClass::Input) {
            solver.add_variable(v, FormulaClass::T);
        }
        solver.add(tm, self.transition_relation, FormulaClass::T)?;
        Ok(solver)
    }

    fn init_frame_solvers(&mut self, tm: &mut TermManager, k: usize) -> Result<(), VigilError> {
        while self.frame_solvers.len() <= k {
            let solver = self.make_transition_solver(tm)?;
            self.frame_solvers.push(solver);
        }
        Ok(())
    }

    fn shared_solver_mut(
        &mut self,
        tm: &mut TermManager,
    ) -> Result<&mut Box<dyn SmtSolver>, VigilError> {
        if self.shared_solver.is_none() {
            let mut solver = self.make_transition_solver(tm)?;
            // Selector literals are auxiliary: class T keeps them out of
            // the class-A generalizations.
            for i in 0..self.size {
                let fv = self.frame_variable(tm, i);
                solver.add_variable(fv, FormulaClass::T);
            }
            self.shared_solver = Some(solver);
        }
        Ok(self.shared_solver.as_mut().expect("shared solver was just created"))
    }

    fn frame_variable(&mut self, tm: &mut TermManager, k: usize) -> TermRef {
        let bty = tm.bool_type();
        while self.frame_variables.len() <= k {
            let var = tm.mk_variable(&format!("frame_{}", self.frame_variables.len()), bty);
            self.frame_variables.push(var);
        }
        self.frame_variables[k]
    }

    /// Selector literals enabling exactly frame `k` on the shared solver.
    fn frame_selection(
        &mut self,
        tm: &mut TermManager,
        k: usize,
    ) -> Result<Vec<TermRef>, VigilError> {
        let mut selection = Vec::with_capacity(self.size);
        for i in 0..self.size {
            let fv = self.frame_variable(tm, i);
            if i == k {
                selection.push(fv);
            } else {
                selection.push(tm.mk_not(fv)?);
            }
        }
        Ok(selection)
    }

    /// Assert `f` under `class` in the frame-`k` reachability solver inside
    /// a scope and check. On SAT the backend generalizes backward over the
    /// class-A variables, with rational equalities split into inequality
    /// pairs for a convex generalization.
    pub fn query_at(
        &mut self,
        tm: &mut TermManager,
        k: usize,
        f: TermRef,
        class: FormulaClass,
    ) -> Result<QueryResult, VigilError> {
        debug_assert!(k < self.size);
        let selection = if self.single_solver {
            Some(self.frame_selection(tm, k)?)
        } else {
            self.init_frame_solvers(tm, k)?;
            None
        };
        let solver = if self.single_solver {
            self.shared_solver_mut(tm)?
        } else {
            &mut self.frame_solvers[k]
        };
        scoped(solver, |s| {
            s.add(tm, f, class)?;
            if let Some(selection) = &selection {
                for &lit in selection {
                    s.add(tm, lit, FormulaClass::A)?;
                }
            }
            match s.check()? {
                SmtVerdict::Sat => {
                    let model = s.model(tm)?;
                    let generalization = generalize_sat(tm, s)?;
                    Ok(QueryResult {
                        verdict: SmtVerdict::Sat,
                        model: Some(model),
                        generalization: Some(generalization),
                    })
                }
                SmtVerdict::Unsat => Ok(QueryResult {
                    verdict: SmtVerdict::Unsat,
                    model: None,
                    generalization: None,
                }),
                SmtVerdict::Unknown => Err(VigilError::SmtUnknown),
            }
        })
    }

    /// Check whether `f` is inductive relative to the current frame: assert
    /// `¬f` at the last unrolled step (class B) and check. On SAT the
    /// generalization over class A is the counterexample-to-induction in
    /// current-state variables.
    pub fn check_inductive(
        &mut self,
        tm: &mut TermManager,
        f: TermRef,
    ) -> Result<QueryResult, VigilError> {
        let not_f = tm.mk_not(f)?;
        let not_f_last = self.at_unroll_step(tm, not_f, self.induction_depth)?;
        let solver = self
            .induction_solver
            .as_mut()
            .ok_or_else(|| VigilError::Backend("induction solver not initialized".to_string()))?;
        scoped(solver, |s| {
            s.add(tm, not_f_last, FormulaClass::B)?;
            match s.check()? {
                SmtVerdict::Sat => {
                    let model = s.model(tm)?;
                    let generalization = generalize_sat(tm, s)?;
                    Ok(QueryResult {
                        verdict: SmtVerdict::Sat,
                        model: Some(model),
                        generalization: Some(generalization),
                    })
                }
                SmtVerdict::Unsat => Ok(QueryResult {
                    verdict: SmtVerdict::Unsat,
                    model: None,
                    generalization: None,
                }),
                SmtVerdict::Unknown => Err(VigilError::SmtUnknown),
            }
        })
    }

    /// Substitute the current-state variables of `f` with the `j`-th unroll
    /// copy of the induction solver.
    fn at_unroll_step(
        &self,
        tm: &mut TermManager,
        f: TermRef,
        j: usize,
    ) -> Result<TermRef, VigilError> {
        if j == 0 {
            return Ok(f);
        }
        let map: SubstMap = self
            .state_type
            .variables(VarClass::Current)
            .iter()
            .copied()
            .zip(self.unroll_states[j].iter().copied())
            .collect();
        tm.substitute(f, &map)
    }

    /// Evaluate `f` (a current-state formula) at the last unrolled step of
    /// the induction solver under `model`.
    pub fn model_satisfies_at_last_step(
        &self,
        tm: &mut TermManager,
        model: &Model,
        f: TermRef,
    ) -> Result<bool, VigilError> {
        let f_last = self.at_unroll_step(tm, f, self.induction_depth)?;
        model.is_true(tm, f_last)
    }

    /// Whether the backing solver can interpolate; selects forward or
    /// backward learning.
    pub fn supports_interpolation(&mut self, tm: &mut TermManager) -> Result<bool, VigilError> {
        if self.single_solver {
            Ok(self.shared_solver_mut(tm)?.supports(Feature::Interpolation))
        } else {
            self.init_frame_solvers(tm, 0)?;
            Ok(self.frame_solvers[0].supports(Feature::Interpolation))
        }
    }

    /// A formula `F` with `frame_{k-1} ∧ T ⇒ F` and `F ∧ G` unsat. With an
    /// interpolating backend this is the disjunction of two interpolants;
    /// otherwise the backward generalization `¬G`.
    pub fn learn_forward(
        &mut self,
        tm: &mut TermManager,
        k: usize,
        g: TermRef,
    ) -> Result<TermRef, VigilError> {
        debug_assert!(k > 0);
        let supports_interpolation = if self.single_solver {
            self.shared_solver_mut(tm)?.supports(Feature::Interpolation)
        } else {
            self.init_frame_solvers(tm, k - 1)?;
            self.frame_solvers[k - 1].supports(Feature::Interpolation)
        };
        if !supports_interpolation {
            return tm.mk_not(g);
        }

        let g_next =
            self.state_type
                .change_formula_vars(tm, VarClass::Current, VarClass::Next, g)?;
        let Some(i1) = self.interpolate_at(tm, k - 1, g_next)? else {
            return tm.mk_not(g);
        };
        let i1 = self
            .state_type
            .change_formula_vars(tm, VarClass::Next, VarClass::Current, i1)?;
        let Some(i2) = self.interpolate_at(tm, 0, g)? else {
            return tm.mk_not(g);
        };
        tm.mk_or(vec![i1, i2])
    }

    fn interpolate_at(
        &mut self,
        tm: &mut TermManager,
        k: usize,
        f_b: TermRef,
    ) -> Result<Option<TermRef>, VigilError> {
        let selection = if self.single_solver {
            Some(self.frame_selection(tm, k)?)
        } else {
            self.init_frame_solvers(tm, k)?;
            None
        };
        let solver = if self.single_solver {
            self.shared_solver_mut(tm)?
        } else {
            &mut self.frame_solvers[k]
        };
        scoped(solver, |s| {
            s.add(tm, f_b, FormulaClass::B)?;
            if let Some(selection) = &selection {
                for &lit in selection {
                    s.add(tm, lit, FormulaClass::A)?;
                }
            }
            match s.check()? {
                SmtVerdict::Unsat => Ok(Some(s.interpolate(tm)?)),
                SmtVerdict::Sat => Ok(None),
                SmtVerdict::Unknown => Err(VigilError::SmtUnknown),
            }
        })
    }

    /// Re-create the induction solver with the transition relation unrolled
    /// `depth` times. Depth 1 is single-step induction. The frame contents
    /// must be re-asserted by the caller afterwards.
    pub fn reset_induction_solver(
        &mut self,
        tm: &mut TermManager,
        depth: usize,
    ) -> Result<(), VigilError> {
        debug_assert!(depth >= 1);
        self.induction_depth = depth;
        let id = self.state_type.id().to_string();
        let current = self.state_type.variables(VarClass::Current).to_vec();
        let next = self.state_type.variables(VarClass::Next).to_vec();
        let input = self.state_type.variables(VarClass::Input).to_vec();
        let state_names = self.state_type.variable_names(VarClass::Current).to_vec();
        let input_names = self.state_type.variable_names(VarClass::Input).to_vec();

        self.unroll_states.clear();
        self.unroll_inputs.clear();
        self.unroll_states.push(current.clone());
        self.unroll_inputs.push(input.clone());
        for j in 1..=depth {
            if j == 1 {
                self.unroll_states.push(next.clone());
            } else {
                let copies = state_names
                    .iter()
                    .zip(current.iter())
                    .map(|(name, &v)| {
                        tm.mk_variable(&format!("{id}::unroll{j}.{name}"), tm.type_of(v))
                    })
                    .collect();
                self.unroll_states.push(copies);
            }
            if j < depth {
                let copies = input_names
                    .iter()
                    .zip(input.iter())
                    .map(|(name, &v)| {
                        tm.mk_variable(&format!("{id}::unrollin{j}.{name}"), tm.type_of(v))
                    })
                    .collect();
                self.unroll_inputs.push(copies);
            }
        }

        let mut solver = new_solver(&self.solver_id)?;
        for &v in &self.unroll_states[0] {
            solver.add_variable(v, FormulaClass::A);
        }
        for &v in &self.unroll_states[depth] {
            solver.add_variable(v, FormulaClass::B);
        }
        for j in 1..depth {
            for &v in &self.unroll_states[j] {
                solver.add_variable(v, FormulaClass::T);
            }
        }
        for bank in &self.unroll_inputs {
            for &v in bank {
                solver.add_variable(v, FormulaClass::T);
            }
        }
        for j in 0..depth {
            let mut map = SubstMap::new();
            for (&from, &to) in current.iter().zip(self.unroll_states[j].iter()) {
                map.insert(from, to);
            }
            for (&from, &to) in input.iter().zip(self.unroll_inputs[j].iter()) {
                map.insert(from, to);
            }
            for (&from, &to) in next.iter().zip(self.unroll_states[j + 1].iter()) {
                map.insert(from, to);
            }
            let t_j = tm.substitute(self.transition_relation, &map)?;
            solver.add(tm, t_j, FormulaClass::T)?;
        }
        self.induction_solver = Some(solver);
        Ok(())
    }

    /// Assert a frame formula into the induction solver, at every step
    /// before the last.
    pub fn assert_to_induction(
        &mut self,
        tm: &mut TermManager,
        f: TermRef,
    ) -> Result<(), VigilError> {
        let mut instances = Vec::with_capacity(self.induction_depth);
        for j in 0..self.induction_depth {
            instances.push(self.at_unroll_step(tm, f, j)?);
        }
        let solver = self
            .induction_solver
            .as_mut()
            .ok_or_else(|| VigilError::Backend("induction solver not initialized".to_string()))?;
        for instance in instances {
            solver.add(tm, instance, FormulaClass::A)?;
        }
        Ok(())
    }

    /// Add a formula to the frame-`k` reachability solver; when `k` is the
    /// frontier, the induction solver picks it up too.
    pub fn add(&mut self, tm: &mut TermManager, k: usize, f: TermRef) -> Result<(), VigilError> {
        debug_assert!(k < self.size);
        if self.single_solver {
            let fv = self.frame_variable(tm, k);
            let assertion = tm.mk_term(TermOp::Implies, &[fv, f])?;
            let solver = self.shared_solver_mut(tm)?;
            solver.add(tm, assertion, FormulaClass::A)?;
        } else {
            self.init_frame_solvers(tm, k)?;
            self.frame_solvers[k].add(tm, f, FormulaClass::A)?;
        }
        if k + 1 == self.size && self.induction_solver.is_some() {
            self.assert_to_induction(tm, f)?;
        }
        Ok(())
    }

    /// Grow the frame range by one; the induction solver is dropped and
    /// must be rebuilt at the new frontier.
    pub fn new_frame(
        &mut self,
        tm: &mut TermManager,
        trace: &mut Trace,
    ) -> Result<(), VigilError> {
        self.ensure_counterexample_solver_depth(tm, trace, self.size)?;
        if self.single_solver {
            let fv = self.frame_variable(tm, self.size);
            let solver = self.shared_solver_mut(tm)?;
            solver.add_variable(fv, FormulaClass::T);
        }
        self.size += 1;
        self.induction_solver = None;
        Ok(())
    }

    fn cex(&mut self) -> Result<&mut Box<dyn SmtSolver>, VigilError> {
        self.cex_solver.as_mut().ok_or_else(|| {
            VigilError::Backend("counterexample solver not initialized".to_string())
        })
    }

    fn ensure_cex_solver(
        &mut self,
        tm: &mut TermManager,
        trace: &mut Trace,
    ) -> Result<(), VigilError> {
        if self.cex_solver.is_some() {
            return Ok(());
        }
        let mut solver = new_solver(&self.solver_id)?;
        let i0 = trace.state_formula_at(tm, self.initial_states, 0)?;
        solver.add(tm, i0, FormulaClass::A)?;
        self.cex_solver = Some(solver);
        self.cex_depth = 0;
        self.cex_vars_depth = 0;
        Ok(())
    }

    /// Unroll the counterexample solver: step variables up to `k`, the
    /// transition relation for every step below `k`.
    pub fn ensure_counterexample_solver_depth(
        &mut self,
        tm: &mut TermManager,
        trace: &mut Trace,
        k: usize,
    ) -> Result<(), VigilError> {
        self.ensure_cex_solver(tm, trace)?;
        while self.cex_vars_depth <= k {
            let d = self.cex_vars_depth;
            let state_vars = trace.state_variables(tm, d).to_vec();
            let input_vars = if d > 0 {
                trace.input_variables(tm, d - 1).to_vec()
            } else {
                Vec::new()
            };
            let solver = self.cex()?;
            for &v in &state_vars {
                solver.add_variable(v, FormulaClass::A);
            }
            for &v in &input_vars {
                solver.add_variable(v, FormulaClass::A);
            }
            self.cex_vars_depth += 1;
        }
        while self.cex_depth < k {
            let t = trace.transition_formula_at(tm, self.transition_relation, self.cex_depth)?;
            let solver = self.cex()?;
            solver.add(tm, t, FormulaClass::A)?;
            self.cex_depth += 1;
        }
        Ok(())
    }

    pub fn get_counterexample_solver_depth(&self) -> usize {
        self.cex_depth
    }

    /// Open a scope on the counterexample solver. Unrolling performed
    /// inside the scope is rolled back by [`SolverPool::cex_pop`] with the
    /// depth snapshot taken before the push.
    pub fn cex_push(&mut self, tm: &mut TermManager, trace: &mut Trace) -> Result<(), VigilError> {
        self.ensure_cex_solver(tm, trace)?;
        self.cex()?.push();
        Ok(())
    }

    pub fn cex_pop(&mut self, depth_snapshot: usize) {
        if let Some(solver) = self.cex_solver.as_mut() {
            solver.pop();
        }
        self.cex_depth = self.cex_depth.min(depth_snapshot);
    }

    pub fn cex_add(&mut self, tm: &mut TermManager, f: TermRef) -> Result<(), VigilError> {
        let solver = self.cex()?;
        solver.add(tm, f, FormulaClass::A)
    }

    pub fn cex_check(&mut self) -> Result<SmtVerdict, VigilError> {
        self.cex()?.check()
    }

    pub fn cex_model(&mut self, tm: &mut TermManager) -> Result<Model, VigilError> {
        let solver = self.cex()?;
        solver.model(tm)
    }

    /// Rebuild every solver from the frame contents; used on restart. The
    /// induction solver is left for the caller to re-seed.
    pub fn reset(
        &mut self,
        tm: &mut TermManager,
        frames: &[BTreeSet<TermRef>],
        trace: &mut Trace,
    ) -> Result<(), VigilError> {
        tracing::debug!("pdr: restarting solvers");
        self.frame_solvers.clear();
        self.shared_solver = None;
        self.induction_solver = None;
        self.cex_solver = None;
        self.cex_depth = 0;
        self.cex_vars_depth = 0;
        self.ensure_counterexample_solver_depth(tm, trace, self.size - 1)?;
        for (k, frame) in frames.iter().enumerate() {
            for &f in frame {
                self.add(tm, k, f)?;
            }
        }
        Ok(())
    }

    /// Advisory GC hint, forwarded to every backend.
    pub fn gc(&mut self) {
        for solver in self.frame_solvers.iter_mut() {
            solver.gc();
        }
        for solver in [
            self.shared_solver.as_mut(),
            self.induction_solver.as_mut(),
            self.cex_solver.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            solver.gc();
        }
    }

    fn all_solvers(&self) -> impl Iterator<Item = &Box<dyn SmtSolver>> {
        self.frame_solvers
            .iter()
            .chain(self.shared_solver.as_ref())
            .chain(self.induction_solver.as_ref())
            .chain(self.cex_solver.as_ref())
    }

    fn all_solvers_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn SmtSolver>> {
        self.frame_solvers
            .iter_mut()
            .chain(self.shared_solver.as_mut())
            .chain(self.induction_solver.as_mut())
            .chain(self.cex_solver.as_mut())
    }
}

impl GcParticipant for SolverPool {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        self.state_type.gc_roots(roots);
        roots.push(self.transition_relation);
        roots.push(self.initial_states);
        roots.extend(&self.frame_variables);
        for bank in self.unroll_states.iter().chain(self.unroll_inputs.iter()) {
            roots.extend(bank);
        }
        for solver in self.all_solvers() {
            solver.gc_roots(roots);
        }
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        self.state_type.gc_relocate(reloc);
        reloc.reloc(&mut self.transition_relation);
        reloc.reloc(&mut self.initial_states);
        reloc.reloc_vec(&mut self.frame_variables);
        for bank in self
            .unroll_states
            .iter_mut()
            .chain(self.unroll_inputs.iter_mut())
        {
            reloc.reloc_vec(bank);
        }
        for solver in self.all_solvers_mut() {
            solver.gc_relocate(reloc);
        }
    }
}

/// Conjoin the backward generalization of the last SAT answer and split
/// arithmetic equalities into non-strict inequality pairs.
fn generalize_sat(
    tm: &mut TermManager,
    solver: &mut Box<dyn SmtSolver>,
) -> Result<TermRef, VigilError> {
    let facts = solver.generalize(tm, GeneralizeDirection::Backward)?;
    let g = tm.mk_and(facts)?;
    eq_to_ineq(tm, g)
}

/// Split `lhs = rhs` over the rationals/integers into `lhs ≤ rhs ∧ lhs ≥
/// rhs`, descending into one level of conjunction.
pub(super) fn eq_to_ineq(tm: &mut TermManager, g: TermRef) -> Result<TermRef, VigilError> {
    let split_one = |tm: &mut TermManager, t: TermRef| -> Result<Option<(TermRef, TermRef)>, VigilError> {
        if tm.op_of(t) != TermOp::Eq {
            return Ok(None);
        }
        let lhs = tm.child(t, 0);
        let rhs = tm.child(t, 1);
        let lhs_ty = tm.type_of(lhs);
        if lhs_ty != tm.integer_type() && lhs_ty != tm.real_type() {
            return Ok(None);
        }
        let leq = tm.mk_term(TermOp::Leq, &[lhs, rhs])?;
        let geq = tm.mk_term(TermOp::Geq, &[lhs, rhs])?;
        Ok(Some((leq, geq)))
    };

    match tm.op_of(g) {
        TermOp::Eq => {
            if let Some((leq, geq)) = split_one(tm, g)? {
                tm.mk_and(vec![leq, geq])
            } else {
                Ok(g)
            }
        }
        TermOp::And => {
            let children: Vec<TermRef> = tm.children(g).to_vec();
            let mut result = Vec::with_capacity(children.len());
            for c in children {
                if let Some((leq, geq)) = split_one(tm, c)? {
                    result.push(leq);
                    result.push(geq);
                } else {
                    result.push(c);
                }
            }
            tm.mk_and(result)
        }
        _ => Ok(g),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::StateType;

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
    fn eq_to_ineq_splits_arithmetic_equalities() {
        let mut tm = TermManager::new();
        let ity = tm.integer_type();
        let n = tm.mk_variable("n", ity);
        let two = tm.mk_integer_i64(2);
        let eq = tm.mk_term(TermOp::Eq, &[n, two]).unwrap();
        let split = eq_to_ineq(&mut tm, eq).unwrap();
        assert_eq!(tm.op_of(split), TermOp::And);
        assert_eq!(tm.op_of(tm.child(split, 0)), TermOp::Leq);
        assert_eq!(tm.op_of(tm.child(split, 1)), TermOp::Geq);

        // Boolean equalities are left alone.
        let bty = tm.bool_type();
        let x = tm.mk_variable("x", bty);
        let y = tm.mk_variable("y", bty);
        let beq = tm.mk_term(TermOp::Eq, &[x, y]).unwrap();
        assert_eq!(eq_to_ineq(&mut tm, beq).unwrap(), beq);
    }

    #[test]
    fn query_at_frame_zero_respects_frame_content() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let mut pool = SolverPool::new("z3", false, &ts);
        pool.add(&mut tm, 0, ts.initial_states()).unwrap();

        // n = 5 contradicts the frame content n = 0.
        let five = tm.mk_integer_i64(5);
        let n_is_five = tm.mk_term(TermOp::Eq, &[n, five]).unwrap();
        let result = pool
            .query_at(&mut tm, 0, n_is_five, FormulaClass::A)
            .unwrap();
        assert_eq!(result.verdict, SmtVerdict::Unsat);

        let zero = tm.mk_integer_i64(0);
        let n_is_zero = tm.mk_term(TermOp::Eq, &[n, zero]).unwrap();
        let result = pool
            .query_at(&mut tm, 0, n_is_zero, FormulaClass::A)
            .unwrap();
        assert_eq!(result.verdict, SmtVerdict::Sat);
        // The generalization is an equality-split cube over current vars.
        let g = result.generalization.unwrap();
        assert_eq!(tm.op_of(g), TermOp::And);
    }

    #[test]
    fn single_solver_mode_matches_per_frame_mode() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let zero = tm.mk_integer_i64(0);
        let n_is_zero = tm.mk_term(TermOp::Eq, &[n, zero]).unwrap();

        for single in [false, true] {
            let mut pool = SolverPool::new("z3", single, &ts);
            pool.add(&mut tm, 0, ts.initial_states()).unwrap();
            let not_zero = tm.mk_not(n_is_zero).unwrap();
            let r = pool.query_at(&mut tm, 0, not_zero, FormulaClass::A).unwrap();
            assert_eq!(r.verdict, SmtVerdict::Unsat, "single={single}");
        }
    }

    #[test]
    fn check_inductive_finds_cti_in_current_variables() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let st = ts.state_type().clone();
        let n = st.variables(VarClass::Current)[0];
        let mut pool = SolverPool::new("z3", false, &ts);
        pool.reset_induction_solver(&mut tm, 1).unwrap();

        // n <= 2 is not inductive for n' = n + 1.
        let two = tm.mk_integer_i64(2);
        let bound = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        pool.assert_to_induction(&mut tm, bound).unwrap();
        let result = pool.check_inductive(&mut tm, bound).unwrap();
        assert_eq!(result.verdict, SmtVerdict::Sat);
        let g = result.generalization.unwrap();
        assert!(st.is_state_formula(&tm, g));

        // n >= 0 is inductive.
        let zero = tm.mk_integer_i64(0);
        let lower = tm.mk_term(TermOp::Geq, &[n, zero]).unwrap();
        pool.assert_to_induction(&mut tm, lower).unwrap();
        let result = pool.check_inductive(&mut tm, lower).unwrap();
        assert_eq!(result.verdict, SmtVerdict::Unsat);
    }

    #[test]
    fn learn_forward_falls_back_to_negation() {
        let mut tm = TermManager::new();
        let ts = counter_system(&mut tm);
        let n = ts.state_type().variables(VarClass::Current)[0];
        let mut pool = SolverPool::new("z3", false, &ts);
        pool.add(&mut tm, 0, ts.initial_states()).unwrap();
        let five = tm.mk_integer_i64(5);
        let g = tm.mk_term(TermOp::Eq, &[n, five]).unwrap();
        let learnt = pool.learn_forward(&mut tm, 1, g).unwrap();
        let expected = tm.mk_not(g).unwrap();
        assert_eq!(learnt, expected);
    }
}
