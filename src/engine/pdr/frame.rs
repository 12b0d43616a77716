//! Induction obligations, the score-ordered scheduler queue, and the
//! parent/refutes bookkeeping for learnt formulas.

use crate::term::{GcParticipant, Relocator, TermRef};
use petgraph::dot::{Config, Dot};
use petgraph::graph::DiGraph;
use sorted_vec::SortedVec;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::Path;

/// A candidate invariant to push forward. `fwd` is the formula in
/// question, `cex` the counterexample generalization it refutes, `depth`
/// the accumulated CTI-expansion depth.
#[derive(Clone, Debug)]
pub struct InductionObligation {
    pub fwd: TermRef,
    pub cex: TermRef,
    pub depth: usize,
    pub score: f64,
}

impl InductionObligation {
    pub fn new(fwd: TermRef, cex: TermRef, depth: usize, score: f64) -> Self {
        InductionObligation {
            fwd,
            cex,
            depth,
            score,
        }
    }

    /// Scores never go negative.
    pub fn bump_score(&mut self, amount: f64) {
        self.score = (self.score + amount).max(0.0);
    }
}

impl PartialEq for InductionObligation {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for InductionObligation {}

impl PartialOrd for InductionObligation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for InductionObligation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then(self.depth.cmp(&other.depth))
            .then(self.fwd.cmp(&other.fwd))
    }
}

/// Max-priority queue over `(score, depth, formula id)`. A sorted vector
/// meets the decrease-key contract: bumping removes and re-inserts.
#[derive(Debug)]
pub struct ObligationQueue {
    heap: SortedVec<InductionObligation>,
}

impl Default for ObligationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl ObligationQueue {
    pub fn new() -> Self {
        ObligationQueue {
            heap: SortedVec::new(),
        }
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn push(&mut self, obligation: InductionObligation) {
        self.heap.insert(obligation);
    }

    /// Remove and return the maximum obligation.
    pub fn pop_max(&mut self) -> Option<InductionObligation> {
        self.heap.pop()
    }

    pub fn contains(&self, fwd: TermRef) -> bool {
        self.heap.iter().any(|o| o.fwd == fwd)
    }

    /// Decrease-key / increase-key by formula. No effect if the formula is
    /// not queued.
    pub fn bump_score(&mut self, fwd: TermRef, amount: f64) {
        let Some(index) = self.heap.iter().position(|o| o.fwd == fwd) else {
            return;
        };
        let mut obligation = self.heap.remove_index(index);
        obligation.bump_score(amount);
        self.heap.insert(obligation);
    }
}

impl GcParticipant for ObligationQueue {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        for o in self.heap.iter() {
            roots.push(o.fwd);
            roots.push(o.cex);
        }
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        let old: Vec<InductionObligation> = self.heap.iter().cloned().collect();
        self.heap.clear();
        for mut o in old {
            reloc.reloc(&mut o.fwd);
            reloc.reloc(&mut o.cex);
            self.heap.insert(o);
        }
    }
}

/// Why a learnt formula exists: it was introduced to help the inductivity
/// of `parent` by refuting the counterexample generalization `refutes`.
#[derive(Clone, Copy, Debug)]
struct ParentInfo {
    parent: TermRef,
    refutes: TermRef,
}

/// Bookkeeping for frame formulas. Parent links form an id-indirected DAG
/// rooted at property or initial-state conjuncts; they are rebuilt every
/// frame pass. Invalidation marks persist across the whole query.
#[derive(Debug, Default)]
pub struct FormulaInfoMap {
    parents: HashMap<TermRef, ParentInfo>,
    invalid: HashMap<TermRef, usize>,
}

impl FormulaInfoMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `learnt` was introduced for `parent`, refuting `refutes`.
    pub fn set_refutes(&mut self, learnt: TermRef, parent: TermRef, refutes: TermRef) {
        debug_assert!(!self.parents.contains_key(&learnt));
        self.parents.insert(learnt, ParentInfo { parent, refutes });
    }

    pub fn has_parent(&self, f: TermRef) -> bool {
        self.parents.contains_key(&f)
    }

    pub fn parent_of(&self, f: TermRef) -> Option<TermRef> {
        self.parents.get(&f).map(|i| i.parent)
    }

    pub fn refutes_of(&self, f: TermRef) -> Option<TermRef> {
        self.parents.get(&f).map(|i| i.refutes)
    }

    /// Mark `f` refuted, discovered at `frame`.
    pub fn set_invalid(&mut self, f: TermRef, frame: usize) {
        self.invalid.entry(f).or_insert(frame);
    }

    pub fn is_invalid(&self, f: TermRef) -> bool {
        self.invalid.contains_key(&f)
    }

    /// Drop the per-frame parent links; invalidation survives.
    pub fn clear_parents(&mut self) {
        self.parents.clear();
    }

    /// Write the parent-link graph in DOT form, invalid formulas in red.
    pub fn write_dot(&self, path: &Path) -> io::Result<()> {
        let mut graph: DiGraph<u32, ()> = DiGraph::new();
        let mut nodes = HashMap::new();
        let mut invalid_ids = HashSet::new();
        let mut entries: Vec<(TermRef, ParentInfo)> =
            self.parents.iter().map(|(&f, &i)| (f, i)).collect();
        entries.sort_by_key(|(f, _)| *f);
        for (learnt, info) in entries {
            let from = *nodes
                .entry(learnt)
                .or_insert_with(|| graph.add_node(learnt.id()));
            let to = *nodes
                .entry(info.parent)
                .or_insert_with(|| graph.add_node(info.parent.id()));
            graph.add_edge(from, to, ());
            if self.is_invalid(learnt) {
                invalid_ids.insert(learnt.id());
            }
            if self.is_invalid(info.parent) {
                invalid_ids.insert(info.parent.id());
            }
        }
        let node_attr_getter = |_: &_, (_, id): (_, &_)| {
            if invalid_ids.contains(id) {
                "color = red".to_string()
            } else {
                String::new()
            }
        };
        let dot = Dot::with_attr_getters(
            &graph,
            &[Config::EdgeNoLabel],
            &|_, _| String::new(),
            &node_attr_getter,
        );
        std::fs::write(path, format!("{dot:?}"))
    }
}

impl GcParticipant for FormulaInfoMap {
    fn gc_roots(&self, roots: &mut Vec<TermRef>) {
        for (&f, info) in self.parents.iter() {
            roots.push(f);
            roots.push(info.parent);
            roots.push(info.refutes);
        }
        roots.extend(self.invalid.keys().copied());
    }

    fn gc_relocate(&mut self, reloc: &Relocator) {
        let old_parents = std::mem::take(&mut self.parents);
        for (mut f, mut info) in old_parents {
            reloc.reloc(&mut f);
            reloc.reloc(&mut info.parent);
            reloc.reloc(&mut info.refutes);
            self.parents.insert(f, info);
        }
        let old_invalid = std::mem::take(&mut self.invalid);
        for (mut f, frame) in old_invalid {
            reloc.reloc(&mut f);
            self.invalid.insert(f, frame);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ob(id: u32, depth: usize, score: f64) -> InductionObligation {
        InductionObligation::new(TermRef(id), TermRef(id), depth, score)
    }

    #[test]
    fn queue_orders_by_score_then_depth_then_id() {
        let mut q = ObligationQueue::new();
        q.push(ob(1, 0, 0.0));
        q.push(ob(2, 3, 0.0));
        q.push(ob(3, 0, 2.0));
        assert_eq!(q.pop_max().unwrap().fwd, TermRef(3));
        assert_eq!(q.pop_max().unwrap().fwd, TermRef(2));
        assert_eq!(q.pop_max().unwrap().fwd, TermRef(1));
        assert!(q.pop_max().is_none());
    }

    #[test]
    fn bump_reorders_in_place() {
        let mut q = ObligationQueue::new();
        q.push(ob(1, 0, 1.0));
        q.push(ob(2, 0, 2.0));
        q.bump_score(TermRef(1), 5.0);
        assert_eq!(q.pop_max().unwrap().fwd, TermRef(1));
        // Scores saturate at zero from below.
        q.bump_score(TermRef(2), -10.0);
        assert_eq!(q.pop_max().unwrap().score, 0.0);
    }

    #[test]
    fn parent_links_clear_but_invalidation_persists() {
        let mut info = FormulaInfoMap::new();
        info.set_refutes(TermRef(5), TermRef(1), TermRef(9));
        info.set_invalid(TermRef(5), 2);
        assert_eq!(info.parent_of(TermRef(5)), Some(TermRef(1)));
        info.clear_parents();
        assert!(!info.has_parent(TermRef(5)));
        assert!(info.is_invalid(TermRef(5)));
    }
}
