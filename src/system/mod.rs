//! Transition systems: state types with current/input/next variable
//! classes, state and transition formulas, and counterexample traces.

pub mod trace;

pub use trace::Trace;

use crate::error::VigilError;
use crate::term::{GcParticipant, Relocator, SubstMap, TermManager, TermRef};
use std::collections::BTreeSet;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum VarClass {
    Current,
    Input,
    Next,
}

impl VarClass {
    pub fn label(self) -> &'static str {
        match self {
            VarClass::Current => "state",
            VarClass::Input => "input",
            VarClass::Next => "next",
        }
    }
}

/// A named state space: three parallel variable vectors (current, input,
/// next) and the substitution maps between the current and next copies.
/// Variables carry canonical names of the form `<id>::<class>.<name>`; the
/// print namespaces strip those prefixes back off.
#[derive(Clone, Debug)]
pub struct StateType {
    id: String,
    var_names: Vec<String>,
    input_names: Vec<String>,
    current: Vec<TermRef>,
    input: Vec<TermRef>,
    next: Vec<TermRef>,
    current_to_next: SubstMap,
    next_to_current: SubstMap,
}

impl StateType {
    pub fn new(
        tm: &mut TermManager,
        id: &str,
        state_vars: &[(String, TermRef)],
        input_vars: &[(String, TermRef)],
    ) -> Self {
        let mk_class = |tm: &mut TermManager, class: VarClass, vars: &[(String, TermRef)]| {
            vars.iter()
                .map(|(name, ty)| {
                    tm.mk_variable(&format!("{id}::{}.{name}", class.label()), *ty)
                })
                .collect::<Vec<_>>()
        };
        let current = mk_class(tm, VarClass::Current, state_vars);
        let input = mk_class(tm, VarClass::Input, input_vars);
        let next = mk_class(tm, VarClass::Next, state_vars);
        let current_to_next: SubstMap = current.iter().copied().zip(next.iter().copied()).collect();
        let next_to_current: SubstMap = next.iter().copied().zip(current.iter().copied()).collect();
        StateType {
            id: id.to_string(),
            var_names: state_vars.iter().map(|(n, _)| n.clone()).collect(),
            input_names: input_vars.iter().map(|(n, _)| n.clone()).collect(),
            current,
            input,
            next,
            current_to_next,
            next_to_current,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn variables(&self, class: VarClass) -> &[TermRef] {
        match class {
            VarClass::Current => &self.current,
            VarClass::Input => &self.input,
            VarClass::Next => &self.next,
        }
    }

    pub fn variable_names(&self, class: VarClass) -> &[String] {
        match class {
            VarClass::Input => &self.input_names,
            _ => &self.var_names,
        }
    }

    /// Rename a formula between the current and next copies of the state
    /// variables.
    pub fn change_formula_vars(
        &self,
        tm: &mut TermManager,
        from: VarClass,
        to: VarClass,
        f: TermRef,
    ) -> Result<TermRef, VigilError> {
        match (from, to) {
            (VarClass::Current, VarClass::Next) => tm.substitute(f, &self.current_to_next),
            (VarClass::Next, VarClass::Current) => tm.substitute(f, &self.next_to_current),
            _ if from == to => Ok(f),
            _ => Err(VigilError::InvalidInput(
                "variable renaming is only defined between current and next".to_string(),
            )),
        }
    }

    /// A state formula mentions only current-state variables.
    pub fn is_state_formula(&self, tm: &TermManager, f: TermRef) -> bool {
        let allowed: BTreeSet<TermRef> = self.current.iter().copied().collect();
        let mut used = BTreeSet::new();
        tm.variables_of(f, &mut used);
        used.is_subset(&allowed)
    }

    /// A transition formula mentions current, input and next variables.
    pub fn is_transition_formula(&self, tm: &TermManager, f: TermRef) -> bool {
        let allowed: BTreeSet<TermRef> = self
            .current
            .iter()
            .chain(self.input.iter())
            .chain(self.next.iter())
            .copied()
            .collect();
        let mut used = BTreeSet::new();
        tm.variables_of(f, &mut used);
        used.is_subset(&allowed)
    }

    /// Install the print namespaces so variables show as the user wrote
    /// them. Balanced by [`StateType::pop_namespaces`].
    pub fn push_namespaces(&self, tm: &mut TermManager) {
        tm.push_namespace(format!("{}::", self.id));
        tm.push_namespace("state.".to_string());
        tm.push_namespace("input.".to_string());
    }

    pub fn pop_namespaces(&self, tm: &mut TermManager) {
        tm.pop_namespace();
        tm.pop_namespace();
        tm.pop_namespace();
    }
}

impl GcParticipant for StateType {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        roots.extend(&self.current);
        roots.extend(&self.input);
        roots.extend(&self.next);
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        reloc.reloc_vec(&mut self.current);
        reloc.reloc_vec(&mut self.input);
        reloc.reloc_vec(&mut self.next);
        for map in [&mut self.current_to_next, &mut self.next_to_current] {
            let old = std::mem::take(map);
            for (mut k, mut v) in old {
                reloc.reloc(&mut k);
                reloc.reloc(&mut v);
                map.insert(k, v);
            }
        }
    }
}

/// A predicate over the current-state variables of a state type.
#[derive(Clone, Debug)]
pub struct StateFormula {
    type_id: String,
    formula: TermRef,
}

impl StateFormula {
    pub fn new(
        tm: &TermManager,
        state_type: &StateType,
        formula: TermRef,
    ) -> Result<Self, VigilError> {
        if !state_type.is_state_formula(tm, formula) {
            return Err(VigilError::InvalidInput(format!(
                "not a state formula over `{}`: {}",
                state_type.id(),
                tm.display(formula)
            )));
        }
        Ok(StateFormula {
            type_id: state_type.id().to_string(),
            formula,
        })
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn formula(&self) -> TermRef {
        self.formula
    }
}

/// A transition system: state type, initial states, transition relation.
/// Assumptions are conjoined into both the initial states and the
/// transition relation at registration time.
#[derive(Clone, Debug)]
pub struct TransitionSystem {
    state_type: StateType,
    initial_states: TermRef,
    transition_relation: TermRef,
}

impl TransitionSystem {
    pub fn new(
        tm: &TermManager,
        state_type: StateType,
        initial_states: TermRef,
        transition_relation: TermRef,
    ) -> Result<Self, VigilError> {
        if !state_type.is_state_formula(tm, initial_states) {
            return Err(VigilError::InvalidInput(format!(
                "initial states are not a state formula over `{}`",
                state_type.id()
            )));
        }
        if !state_type.is_transition_formula(tm, transition_relation) {
            return Err(VigilError::InvalidInput(format!(
                "transition relation is not a transition formula over `{}`",
                state_type.id()
            )));
        }
        Ok(TransitionSystem {
            state_type,
            initial_states,
            transition_relation,
        })
    }

    pub fn state_type(&self) -> &StateType {
        &self.state_type
    }

    pub fn initial_states(&self) -> TermRef {
        self.initial_states
    }

    pub fn transition_relation(&self) -> TermRef {
        self.transition_relation
    }

    /// Restrict the system with a state assumption: conjoined into the
    /// initial states and, over the current-state copy, into the
    /// transition relation.
    pub fn add_assumption(
        &mut self,
        tm: &mut TermManager,
        assumption: TermRef,
    ) -> Result<(), VigilError> {
        if !self.state_type.is_state_formula(tm, assumption) {
            return Err(VigilError::InvalidInput(
                "assumption is not a state formula".to_string(),
            ));
        }
        self.initial_states = tm.mk_and(vec![self.initial_states, assumption])?;
        self.transition_relation = tm.mk_and(vec![self.transition_relation, assumption])?;
        Ok(())
    }
}

impl GcParticipant for TransitionSystem {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        self.state_type.gc_roots(roots);
        roots.push(self.initial_states);
        roots.push(self.transition_relation);
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        self.state_type.gc_relocate(reloc);
        reloc.reloc(&mut self.initial_states);
        reloc.reloc(&mut self.transition_relation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::TermOp;

    fn counter(tm: &mut TermManager) -> StateType {
        let ity = tm.integer_type();
        StateType::new(tm, "counter", &[("n".to_string(), ity)], &[])
    }

    #[test]
    fn state_and_transition_formula_checks() {
        let mut tm = TermManager::new();
        let st = counter(&mut tm);
        let n = st.variables(VarClass::Current)[0];
        let n_next = st.variables(VarClass::Next)[0];
        let zero = tm.mk_integer_i64(0);
        let init = tm.mk_term(TermOp::Eq, &[n, zero]).unwrap();
        assert!(st.is_state_formula(&tm, init));
        let step = tm.mk_term(TermOp::Eq, &[n_next, n]).unwrap();
        assert!(!st.is_state_formula(&tm, step));
        assert!(st.is_transition_formula(&tm, step));
    }

    #[test]
    fn change_vars_round_trips() {
        let mut tm = TermManager::new();
        let st = counter(&mut tm);
        let n = st.variables(VarClass::Current)[0];
        let two = tm.mk_integer_i64(2);
        let f = tm.mk_term(TermOp::Leq, &[n, two]).unwrap();
        let f_next = st
            .change_formula_vars(&mut tm, VarClass::Current, VarClass::Next, f)
            .unwrap();
        assert!(!st.is_state_formula(&tm, f_next));
        let back = st
            .change_formula_vars(&mut tm, VarClass::Next, VarClass::Current, f_next)
            .unwrap();
        assert_eq!(back, f);
    }

    #[test]
    fn system_construction_validates_formula_classes() {
        let mut tm = TermManager::new();
        let st = counter(&mut tm);
        let n = st.variables(VarClass::Current)[0];
        let n_next = st.variables(VarClass::Next)[0];
        let zero = tm.mk_integer_i64(0);
        let init = tm.mk_term(TermOp::Eq, &[n, zero]).unwrap();
        let one = tm.mk_integer_i64(1);
        let sum = tm.mk_term(TermOp::Add, &[n, one]).unwrap();
        let step = tm.mk_term(TermOp::Eq, &[n_next, sum]).unwrap();
        assert!(TransitionSystem::new(&tm, st.clone(), init, step).is_ok());
        // A transition formula in the init slot is rejected.
        assert!(TransitionSystem::new(&tm, st, step, step).is_err());
    }
}
