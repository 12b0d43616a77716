/// Engine and solver configuration, mirrored by the CLI surface.
#[derive(Clone, Debug)]
pub struct Options {
    /// Engine id (`pdr`).
    pub engine: String,
    /// SMT backend id (`z3`).
    pub solver: String,
    /// Maximum frame index; 0 means unlimited.
    pub ic3_max: usize,
    /// Maximum induction depth; 0 means unbounded growth.
    pub ic3_induction_max: usize,
    /// On VALID, print the inductive invariant.
    pub ic3_show_invariant: bool,
    /// Restart the search after each frame advance.
    pub ic3_enable_restarts: bool,
    /// Skip seeding the frame with initial-state conjuncts.
    pub ic3_no_initial_state: bool,
    /// Dump a DOT graph of formula parent links each frame.
    pub ic3_dump_dependencies: bool,
    /// One reachability solver with frame selector literals instead of one
    /// solver per frame.
    pub ic3_single_solver: bool,
    /// On INVALID, print the counterexample trace.
    pub show_trace: bool,
    pub verbosity: u8,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            engine: "pdr".to_string(),
            solver: "z3".to_string(),
            ic3_max: 0,
            ic3_induction_max: 0,
            ic3_show_invariant: false,
            ic3_enable_restarts: false,
            ic3_no_initial_state: false,
            ic3_dump_dependencies: false,
            ic3_single_solver: false,
            show_trace: false,
            verbosity: 0,
        }
    }
}
