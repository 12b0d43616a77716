//! vigil — symbolic safety model checking for SMT transition systems.
//!
//! A transition system is a state type, an initial-state predicate and a
//! transition relation; a query asks whether a state property holds on
//! every reachable state. The property-directed reachability engine
//! ([`engine::pdr`]) answers by orchestrating incremental SMT solvers
//! behind the [`smt::SmtSolver`] interface; a z3 backend ships in-tree.

pub mod engine;
pub mod error;
pub mod options;
pub mod parse;
pub mod smt;
pub mod system;
pub mod term;

pub use engine::{Engine, InterruptFlag, Outcome};
pub use error::VigilError;
pub use options::Options;
