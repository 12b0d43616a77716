//! The abstract incremental SMT driver the engines are written against.
//!
//! Assertions are partitioned into three classes: with `A(a, t)`,
//! `T(a, b, t)` and `B(b, t)` asserted, backward generalization eliminates
//! the `b` and `t` variables and interpolation eliminates the `a` and `t`
//! variables. Backends declare the features they actually support;
//! everything else has a documented engine-side fallback.

pub mod z3;

use crate::error::VigilError;
use crate::term::model::Model;
use crate::term::{Relocator, TermManager, TermRef};
use std::fmt::Debug;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SmtVerdict {
    Sat,
    Unsat,
    Unknown,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum FormulaClass {
    A,
    T,
    B,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GeneralizeDirection {
    Forward,
    Backward,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Feature {
    Generalization,
    Interpolation,
    UnsatCore,
}

pub trait SmtSolver: Debug {
    fn name(&self) -> &str;

    fn supports(&self, _feature: Feature) -> bool {
        false
    }

    /// Declare a variable as belonging to a class. Declarations are
    /// context-independent: they survive `pop`.
    fn add_variable(&mut self, var: TermRef, class: FormulaClass);

    /// Assert a formula under the given class.
    fn add(&mut self, tm: &TermManager, f: TermRef, class: FormulaClass)
    -> Result<(), VigilError>;

    fn push(&mut self);

    fn pop(&mut self);

    fn check(&mut self) -> Result<SmtVerdict, VigilError>;

    /// The model of the last `Sat` answer, over all declared variables.
    fn model(&mut self, tm: &TermManager) -> Result<Model, VigilError>;

    /// Generalize the last `Sat` answer: a list of facts implied by the
    /// model over the surviving variable class (A for backward, B for
    /// forward).
    fn generalize(
        &mut self,
        _tm: &mut TermManager,
        _direction: GeneralizeDirection,
    ) -> Result<Vec<TermRef>, VigilError> {
        Err(VigilError::Backend(format!(
            "generalize() not supported by solver {}",
            self.name()
        )))
    }

    /// Interpolate the last `Unsat` answer: an `I` with `A ⇒ I` and
    /// `I ∧ B` unsat.
    fn interpolate(&mut self, _tm: &mut TermManager) -> Result<TermRef, VigilError> {
        Err(VigilError::Backend(format!(
            "interpolate() not supported by solver {}",
            self.name()
        )))
    }

    /// The unsat core of the last `Unsat` answer.
    fn unsat_core(&mut self, _tm: &mut TermManager) -> Result<Vec<TermRef>, VigilError> {
        Err(VigilError::Backend(format!(
            "unsat_core() not supported by solver {}",
            self.name()
        )))
    }

    /// Advisory: drop internal caches. Safe at any quiescent point.
    fn gc(&mut self) {}

    fn gc_roots(&self, roots: &mut Vec<TermRef>);

    fn gc_relocate(&mut self, reloc: &Relocator);
}

/// Run `body` inside a `push`/`pop` bracket on the solver.
pub fn scoped<R>(
    solver: &mut Box<dyn SmtSolver>,
    body: impl FnOnce(&mut Box<dyn SmtSolver>) -> Result<R, VigilError>,
) -> Result<R, VigilError> {
    solver.push();
    let result = body(solver);
    solver.pop();
    result
}

/// A registered solver backend. Backends self-register through
/// `inventory`; `new_solver` looks them up by id.
pub struct SolverRegistration {
    pub id: &'static str,
    pub construct: fn() -> Box<dyn SmtSolver>,
}

inventory::collect!(SolverRegistration);

pub fn new_solver(id: &str) -> Result<Box<dyn SmtSolver>, VigilError> {
    inventory::iter::<SolverRegistration>
        .into_iter()
        .find(|r| r.id == id)
        .map(|r| (r.construct)())
        .ok_or_else(|| VigilError::UnknownSolver(id.to_string()))
}

/// Ids of all registered backends, for diagnostics.
pub fn solver_ids() -> Vec<&'static str> {
    inventory::iter::<SolverRegistration>
        .into_iter()
        .map(|r| r.id)
        .collect()
}
