use crate::{graph::RegionGraph, partition::boundary::BoundarySets};

/// District id of nodes not yet assigned to any district.
pub const UNASSIGNED: u32 = 0;

/// District id reserved for the residual district: the contiguous
/// remainder of the map once every goal-targeted district is filled.
pub const RESIDUAL_DISTRICT: u32 = 1;

/// Mutable node → district map for one hierarchy level, with
/// incrementally maintained per-district population totals, sizes, and
/// boundary-node sets.
///
/// District ids run `0..=num_districts`, where 0 is [`UNASSIGNED`].
/// Flips are O(degree); callers needing rollback journal their flips
/// externally (see `SearchState`).
#[derive(Debug, Clone)]
pub(crate) struct Assignment {
    num_districts: u32,
    assignments: Vec<u32>,
    boundary: BoundarySets,
    pops: Vec<u64>,
    sizes: Vec<usize>,
}

impl Assignment {
    /// Create an all-unassigned map over `graph` for `num_districts` districts.
    pub(crate) fn new(graph: &RegionGraph, num_districts: u32) -> Self {
        assert!(num_districts >= 2, "num_districts must be at least 2");

        let mut pops = vec![0u64; num_districts as usize + 1];
        pops[UNASSIGNED as usize] = graph.total_pop();

        let mut sizes = vec![0usize; num_districts as usize + 1];
        sizes[UNASSIGNED as usize] = graph.len();

        Self {
            num_districts,
            assignments: vec![UNASSIGNED; graph.len()],
            boundary: BoundarySets::new(num_districts as usize + 1, graph.len()),
            pops,
            sizes,
        }
    }

    /// Get the district of a given node.
    #[inline]
    pub(crate) fn district(&self, node: usize) -> u32 { self.assignments[node] }

    /// Full node → district slice.
    #[inline]
    pub(crate) fn assignments(&self) -> &[u32] { &self.assignments }

    /// Accumulated population of a district (or of the unassigned region for 0).
    #[inline]
    pub(crate) fn pop(&self, district: u32) -> u64 { self.pops[district as usize] }

    /// Number of nodes in a district.
    #[inline]
    pub(crate) fn size(&self, district: u32) -> usize { self.sizes[district as usize] }

    /// Boundary nodes of a district (nodes with a neighbor in a
    /// different district or unassigned).
    #[inline]
    pub(crate) fn boundary_of(&self, district: u32) -> &[usize] { self.boundary.get(district) }

    /// Reassign `node` to `district`, updating totals and boundary sets
    /// in O(degree). No-op-safe. Returns the previous district.
    pub(crate) fn flip(&mut self, graph: &RegionGraph, node: usize, district: u32) -> u32 {
        assert!(node < self.assignments.len(), "node {} out of range", node);
        assert!(district <= self.num_districts,
            "district {} out of range [0, {}]", district, self.num_districts);

        let prev = self.assignments[node];
        if prev == district { return prev }

        self.assignments[node] = district;

        self.pops[prev as usize] -= graph.pop(node);
        self.pops[district as usize] += graph.pop(node);
        self.sizes[prev as usize] -= 1;
        self.sizes[district as usize] += 1;

        // Refresh boundary membership for the node and its neighbors.
        for u in std::iter::once(node).chain(graph.edges(node)) {
            let d = self.assignments[u];
            let on_boundary = graph.edges(u).any(|v| self.assignments[v] != d);
            self.boundary.refresh(u, d, on_boundary);
        }

        prev
    }
}
