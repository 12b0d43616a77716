//! The counterexample trace: a lazily grown unrolling of the state type
//! with a model binding the per-step variables.

use crate::error::VigilError;
use crate::system::{StateType, VarClass};
use crate::term::model::Model;
use crate::term::{GcParticipant, Relocator, SubstMap, TermManager, TermRef};
use std::fmt::Write;

#[derive(Debug)]
pub struct Trace {
    state_type: StateType,
    state_vars: Vec<Vec<TermRef>>,
    input_vars: Vec<Vec<TermRef>>,
    model: Model,
}

impl Trace {
    pub fn new(state_type: StateType) -> Self {
        Trace {
            state_type,
            state_vars: Vec::new(),
            input_vars: Vec::new(),
            model: Model::new(true),
        }
    }

    pub fn state_type(&self) -> &StateType {
        &self.state_type
    }

    /// Number of allocated steps.
    pub fn size(&self) -> usize {
        self.state_vars.len()
    }

    fn ensure_steps(&mut self, tm: &mut TermManager, k: usize) {
        while self.state_vars.len() <= k {
            let step = self.state_vars.len();
            let id = self.state_type.id().to_string();
            let mk_step = |tm: &mut TermManager,
                           prefix: &str,
                           names: &[String],
                           templates: &[TermRef]| {
                names
                    .iter()
                    .zip(templates.iter())
                    .map(|(name, &v)| {
                        tm.mk_variable(&format!("{id}::{prefix}{step}.{name}"), tm.type_of(v))
                    })
                    .collect::<Vec<_>>()
            };
            let state = mk_step(
                tm,
                "s",
                self.state_type.variable_names(VarClass::Current),
                self.state_type.variables(VarClass::Current),
            );
            let input = mk_step(
                tm,
                "i",
                self.state_type.variable_names(VarClass::Input),
                self.state_type.variables(VarClass::Input),
            );
            self.state_vars.push(state);
            self.input_vars.push(input);
        }
    }

    pub fn state_variables(&mut self, tm: &mut TermManager, k: usize) -> &[TermRef] {
        self.ensure_steps(tm, k);
        &self.state_vars[k]
    }

    pub fn input_variables(&mut self, tm: &mut TermManager, k: usize) -> &[TermRef] {
        self.ensure_steps(tm, k);
        &self.input_vars[k]
    }

    /// Instantiate a state formula at step `k`.
    pub fn state_formula_at(
        &mut self,
        tm: &mut TermManager,
        f: TermRef,
        k: usize,
    ) -> Result<TermRef, VigilError> {
        self.ensure_steps(tm, k);
        let map: SubstMap = self
            .state_type
            .variables(VarClass::Current)
            .iter()
            .copied()
            .zip(self.state_vars[k].iter().copied())
            .collect();
        tm.substitute(f, &map)
    }

    /// Instantiate a transition formula between steps `k` and `k + 1`.
    pub fn transition_formula_at(
        &mut self,
        tm: &mut TermManager,
        tf: TermRef,
        k: usize,
    ) -> Result<TermRef, VigilError> {
        self.ensure_steps(tm, k + 1);
        let mut map = SubstMap::new();
        for (&from, &to) in self
            .state_type
            .variables(VarClass::Current)
            .iter()
            .zip(self.state_vars[k].iter())
        {
            map.insert(from, to);
        }
        for (&from, &to) in self
            .state_type
            .variables(VarClass::Input)
            .iter()
            .zip(self.input_vars[k].iter())
        {
            map.insert(from, to);
        }
        for (&from, &to) in self
            .state_type
            .variables(VarClass::Next)
            .iter()
            .zip(self.state_vars[k + 1].iter())
        {
            map.insert(from, to);
        }
        tm.substitute(tf, &map)
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Absorb a model whose variables are already step variables.
    pub fn add_model(&mut self, m: &Model) {
        self.model.absorb(m);
    }

    /// Absorb a model over state-type variables of `class`, rebinding each
    /// value onto the step-`k` tuple.
    pub fn add_model_for_step(
        &mut self,
        tm: &mut TermManager,
        m: &Model,
        class: VarClass,
        k: usize,
    ) {
        self.ensure_steps(tm, k);
        let step_vars = match class {
            VarClass::Input => &self.input_vars[k],
            _ => &self.state_vars[k],
        };
        for (&var, &step_var) in self.state_type.variables(class).iter().zip(step_vars.iter()) {
            if let Some(value) = m.value_of(var) {
                self.model.set(step_var, value.clone());
            }
        }
    }

    pub fn clear_model(&mut self) {
        self.model = Model::new(true);
    }

    /// Render the `(trace …)` s-expression: one `(state …)` block per
    /// step, `(input …)` blocks between them, names printed the way the
    /// user wrote them.
    pub fn render(&self, tm: &mut TermManager) -> Result<String, VigilError> {
        self.state_type.push_namespaces(tm);
        let result = self.render_inner(tm);
        self.state_type.pop_namespaces(tm);
        result
    }

    fn render_inner(&self, tm: &TermManager) -> Result<String, VigilError> {
        let mut out = String::new();
        let display_vars = self.state_type.variables(VarClass::Current);
        let display_inputs = self.state_type.variables(VarClass::Input);
        let _ = writeln!(out, "(trace");
        for k in 0..self.state_vars.len() {
            let _ = writeln!(out, "  (state");
            for (&shown, &step_var) in display_vars.iter().zip(self.state_vars[k].iter()) {
                let value = self.model.eval(tm, step_var)?;
                let _ = writeln!(out, "    ({} {})", tm.display(shown), value);
            }
            let _ = writeln!(out, "  )");
            if k + 1 < self.state_vars.len() {
                let _ = writeln!(out, "  (input");
                for (&shown, &step_var) in display_inputs.iter().zip(self.input_vars[k].iter()) {
                    let value = self.model.eval(tm, step_var)?;
                    let _ = writeln!(out, "    ({} {})", tm.display(shown), value);
                }
                let _ = writeln!(out, "  )");
            }
        }
        let _ = writeln!(out, ")");
        Ok(out)
    }
}

impl GcParticipant for Trace {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        self.state_type.gc_roots(roots);
        for step in self.state_vars.iter().chain(self.input_vars.iter()) {
            roots.extend(step);
        }
        self.model.gc_roots(roots);
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        self.state_type.gc_relocate(reloc);
        for step in self.state_vars.iter_mut().chain(self.input_vars.iter_mut()) {
            reloc.reloc_vec(step);
        }
        self.model.gc_relocate(reloc);
    }
}
