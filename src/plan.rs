use std::collections::VecDeque;

use serde::Serialize;
use smallvec::SmallVec;

use crate::{
    graph::RegionGraph,
    hierarchy::Hierarchy,
    partition::{SearchState, RESIDUAL_DISTRICT, UNASSIGNED},
    search::SearchParams,
};

/// How one split unit's population was divided between districts.
///
/// `parts` sums exactly to the unit's population and is ordered
/// smallest share first. The residual district's share, if any, is the
/// leftover the search never explicitly placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitAllocation {
    /// Hierarchy level of the split unit.
    pub level: usize,
    /// The split unit itself.
    pub node: usize,
    /// `(district, allocated population)` pairs.
    pub parts: Vec<(u32, u64)>,
}

/// A complete districting plan: every node of every level assigned to
/// exactly one district, with the record of which units were split.
#[derive(Debug, Clone, Serialize)]
pub struct Plan {
    num_districts: u32,
    /// Node → district per level, coarsest first. A split unit carries
    /// its terminal district at its own level; its descendants carry
    /// their actual ones.
    level_assignments: Vec<Vec<u32>>,
    splits: Vec<SplitAllocation>,
    /// Indexed by district id; index 0 is always zero.
    district_pops: Vec<u64>,
}

impl Plan {
    /// Turn a successful search state into a plan: sweep the leftover
    /// unassigned region into the residual district, then freeze the
    /// assignments and the split allocations.
    pub(crate) fn finalize(hier: &Hierarchy, params: &SearchParams, mut state: SearchState) -> Plan {
        for level in 0..hier.depth() {
            let leftover = (0..hier.graph(level).len())
                .filter(|&u| state.level(level).district(u) == UNASSIGNED)
                .collect::<Vec<_>>();
            for node in leftover {
                state.flip_cascade(hier, level, node, RESIDUAL_DISTRICT);
            }
        }

        let finest = hier.finest();
        let splits = state.splits().to_vec().into_iter()
            .map(|(level, node)| {
                let mut parts = SmallVec::<[(u32, u64); 4]>::new();
                for desc in hier.finest_descendants(level, node) {
                    let district = state.level(finest).district(desc);
                    let pop = hier.graph(finest).pop(desc);
                    match parts.iter_mut().find(|(d, _)| *d == district) {
                        Some((_, acc)) => *acc += pop,
                        None => parts.push((district, pop)),
                    }
                }
                parts.sort_unstable_by_key(|&(_, pop)| pop);
                SplitAllocation { level, node, parts: parts.into_vec() }
            })
            .collect();

        Plan {
            num_districts: params.num_districts,
            level_assignments: (0..hier.depth())
                .map(|l| state.level(l).assignments().to_vec())
                .collect(),
            splits,
            district_pops: (0..=params.num_districts)
                .map(|d| state.level(finest).pop(d))
                .collect(),
        }
    }

    /// Number of districts (ids `1..=num_districts`).
    #[inline] pub fn num_districts(&self) -> u32 { self.num_districts }

    /// District ids of the plan.
    pub fn districts(&self) -> impl Iterator<Item = u32> {
        1..=self.num_districts
    }

    /// The finest-level node → district map.
    pub fn assignments(&self) -> &[u32] {
        self.level_assignments.last().unwrap()
    }

    /// Node → district map at any level.
    pub fn level_assignments(&self, level: usize) -> &[u32] {
        &self.level_assignments[level]
    }

    /// Total population of a district.
    pub fn district_pop(&self, district: u32) -> u64 {
        self.district_pops[district as usize]
    }

    /// The units that were split, in the order they were split.
    pub fn splits(&self) -> &[SplitAllocation] {
        &self.splits
    }

    /// Count the units at `level` whose population spans more than one
    /// district — the quantity the search keeps low.
    pub fn coarse_splits(&self, hier: &Hierarchy, level: usize) -> usize {
        let finest = self.assignments();
        (0..hier.graph(level).len())
            .filter(|&node| {
                let mut descendants = hier.finest_descendants(level, node).into_iter();
                let Some(first) = descendants.next() else { return false };
                descendants.any(|desc| finest[desc] != finest[first])
            })
            .count()
    }

    /// Re-check the plan invariants: exact cover, population bands for
    /// every goal-targeted district, finest-level contiguity of every
    /// district, and top-down consistency of the level maps.
    pub fn verify(&self, hier: &Hierarchy, params: &SearchParams) -> bool {
        let finest = hier.finest();
        let graph = hier.graph(finest);
        let assignments = self.assignments();

        // Exact cover: every finest node in exactly one real district.
        if assignments.len() != graph.len() { return false }
        if !assignments.iter().all(|&d| d >= 1 && d <= self.num_districts) { return false }

        // Population bands for every district but the residual.
        let deviation = params.deviation();
        for district in 2..=self.num_districts {
            if self.district_pop(district).abs_diff(params.ideal_pop) > deviation {
                return false;
            }
        }

        // Per-district totals must agree with the node populations.
        let mut pops = vec![0u64; self.num_districts as usize + 1];
        for (node, &district) in assignments.iter().enumerate() {
            pops[district as usize] += graph.pop(node);
        }
        if pops != self.district_pops { return false }

        // Every district is one connected component at the finest level.
        for district in self.districts() {
            if !connected_district(graph, assignments, district) { return false }
        }

        // Cascade law: an unsplit unit agrees with all its children; a
        // split unit's allocation sums to its population.
        for level in 0..finest {
            for node in 0..hier.graph(level).len() {
                let district = self.level_assignments[level][node];
                if self.is_split(level, node) { continue }
                let consistent = hier.children_of(level, node).iter()
                    .all(|&child| self.level_assignments[level + 1][child] == district);
                if !consistent { return false }
            }
        }
        for split in &self.splits {
            let total: u64 = split.parts.iter().map(|&(_, pop)| pop).sum();
            if total != hier.graph(split.level).pop(split.node) { return false }
            if split.parts.len() < 2 { return false }
        }

        true
    }

    fn is_split(&self, level: usize, node: usize) -> bool {
        self.splits.iter().any(|s| s.level == level && s.node == node)
    }
}

/// Connectivity of one district's node set. Empty districts count as
/// connected (a residual district can legitimately end up empty).
fn connected_district(graph: &RegionGraph, assignments: &[u32], district: u32) -> bool {
    let Some(start) = assignments.iter().position(|&d| d == district) else { return true };
    let total = assignments.iter().filter(|&&d| d == district).count();

    let mut visited = vec![false; graph.len()];
    visited[start] = true;

    let mut seen = 1usize;
    let mut queue = VecDeque::from([start]);
    while let Some(u) = queue.pop_front() {
        for v in graph.edges(u) {
            if !visited[v] && assignments[v] == district {
                visited[v] = true;
                seen += 1;
                queue.push_back(v);
            }
        }
    }

    seen == total
}
