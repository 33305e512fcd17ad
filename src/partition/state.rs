use ahash::AHashSet;

use crate::{
    hierarchy::Hierarchy,
    partition::assignment::Assignment,
};

/// Marker into the undo journal; rolling back to a checkpoint restores
/// every level's assignment and the split bookkeeping exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Checkpoint(usize);

/// One reversible mutation of the search state.
#[derive(Debug, Clone, Copy)]
enum Entry {
    Flip { level: usize, node: usize, prev: u32 },
    SplitNeighbor { level: usize, node: usize },
    Split,
}

/// The full mutable state of one search attempt: one [`Assignment`] per
/// hierarchy level, the set of recorded splits, and the nodes adjacent
/// to a split (which need the extra finest-level contiguity check).
///
/// Every mutation goes through this struct so it lands in the undo
/// journal: a failed candidate rolls back to its checkpoint and leaves
/// no residue, which is the copy-before-mutate contract of the search.
#[derive(Debug)]
pub(crate) struct SearchState {
    levels: Vec<Assignment>,
    split_neighbors: Vec<AHashSet<usize>>,
    splits: Vec<(usize, usize)>, // (level, node), in splice order
    journal: Vec<Entry>,
}

impl SearchState {
    pub(crate) fn new(hier: &Hierarchy, num_districts: u32) -> Self {
        Self {
            levels: (0..hier.depth())
                .map(|l| Assignment::new(hier.graph(l), num_districts))
                .collect(),
            split_neighbors: vec![AHashSet::new(); hier.depth()],
            splits: Vec::new(),
            journal: Vec::new(),
        }
    }

    /// The assignment at a given level.
    #[inline]
    pub(crate) fn level(&self, level: usize) -> &Assignment { &self.levels[level] }

    /// Splits recorded so far, as `(level, node)` pairs in splice order.
    #[inline]
    pub(crate) fn splits(&self) -> &[(usize, usize)] { &self.splits }

    /// Returns true if `node` at `level` borders a node that was split.
    #[inline]
    pub(crate) fn near_split(&self, level: usize, node: usize) -> bool {
        self.split_neighbors[level].contains(&node)
    }

    /// Reassign a node at one level only (no descendant cascade).
    /// Used to mark a split node with its terminal district and for
    /// tentative flips that are immediately rolled back.
    pub(crate) fn flip(&mut self, hier: &Hierarchy, level: usize, node: usize, district: u32) {
        let prev = self.levels[level].flip(hier.graph(level), node, district);
        if prev != district {
            self.journal.push(Entry::Flip { level, node, prev });
        }
    }

    /// Reassign a node and all of its descendants, keeping every level
    /// consistent top-down.
    pub(crate) fn flip_cascade(&mut self, hier: &Hierarchy, level: usize, node: usize, district: u32) {
        self.flip(hier, level, node, district);

        let mut pending = vec![(level, node)];
        while let Some((l, n)) = pending.pop() {
            if l >= hier.finest() { continue }
            for i in 0..hier.children_of(l, n).len() {
                let child = hier.children_of(l, n)[i];
                self.flip(hier, l + 1, child, district);
                pending.push((l + 1, child));
            }
        }
    }

    /// Record that `node` at `level` was split, and mark its neighbors
    /// as needing the finest-level contiguity check from now on.
    pub(crate) fn record_split(&mut self, hier: &Hierarchy, level: usize, node: usize) {
        self.splits.push((level, node));
        self.journal.push(Entry::Split);

        for neighbor in hier.graph(level).edges(node) {
            if self.split_neighbors[level].insert(neighbor) {
                self.journal.push(Entry::SplitNeighbor { level, node: neighbor });
            }
        }
    }

    /// Take a checkpoint of the current state.
    #[inline]
    pub(crate) fn checkpoint(&self) -> Checkpoint { Checkpoint(self.journal.len()) }

    /// Undo every mutation made since `mark`, most recent first.
    pub(crate) fn rollback(&mut self, hier: &Hierarchy, mark: Checkpoint) {
        assert!(mark.0 <= self.journal.len(), "stale checkpoint");

        while self.journal.len() > mark.0 {
            match self.journal.pop().unwrap() {
                Entry::Flip { level, node, prev } => {
                    self.levels[level].flip(hier.graph(level), node, prev);
                }
                Entry::SplitNeighbor { level, node } => {
                    self.split_neighbors[level].remove(&node);
                }
                Entry::Split => {
                    self.splits.pop();
                }
            }
        }
    }
}
