//! Engines answer reachability queries over transition systems. The PDR
//! engine is the primary one; engines register themselves so the CLI can
//! select by name.

pub mod pdr;

use crate::error::VigilError;
use crate::options::Options;
use crate::system::{StateFormula, Trace, TransitionSystem};
use crate::term::TermManager;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Outcome {
    /// The property holds on every reachable state.
    Valid,
    /// The property is violated; a trace is available.
    Invalid,
    /// The engine could not decide.
    Unknown,
    /// A resource bound or the interrupt flag stopped the search.
    Interrupted,
}

impl Display for Outcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let tag = match self {
            Outcome::Valid => "valid",
            Outcome::Invalid => "invalid",
            Outcome::Unknown => "unknown",
            Outcome::Interrupted => "interrupted",
        };
        write!(f, "{tag}")
    }
}

/// Cooperative cancellation: the engine polls the flag between SMT checks
/// and returns [`Outcome::Interrupted`] once it is set.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag(Arc<AtomicBool>);

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

pub trait Engine {
    /// Decide whether `property` holds on all reachable states of `ts`.
    fn query(
        &mut self,
        tm: &mut TermManager,
        ts: &TransitionSystem,
        property: &StateFormula,
    ) -> Result<Outcome, VigilError>;

    /// The counterexample trace of the last `Invalid` answer.
    fn trace(&self) -> Option<&Trace>;

    /// A handle for interrupting the engine from outside the query.
    fn interrupt_flag(&self) -> InterruptFlag;
}

pub struct EngineRegistration {
    pub id: &'static str,
    pub construct: fn(&Options) -> Box<dyn Engine>,
}

inventory::collect!(EngineRegistration);

pub fn new_engine(id: &str, opts: &Options) -> Result<Box<dyn Engine>, VigilError> {
    inventory::iter::<EngineRegistration>
        .into_iter()
        .find(|r| r.id == id)
        .map(|r| (r.construct)(opts))
        .ok_or_else(|| VigilError::UnknownEngine(id.to_string()))
}

pub fn engine_ids() -> Vec<&'static str> {
    inventory::iter::<EngineRegistration>
        .into_iter()
        .map(|r| r.id)
        .collect()
}
