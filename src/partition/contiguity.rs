use std::collections::VecDeque;

use ahash::AHashSet;

use crate::{graph::RegionGraph, partition::assignment::{Assignment, UNASSIGNED}};

impl Assignment {
    /// Check whether the unassigned nodes form a single connected
    /// component, optionally restricted to a node subset.
    ///
    /// With a `region` restriction, both the nodes considered and the
    /// paths between them must stay inside the region. An empty
    /// unassigned set counts as connected. Read-only, hence idempotent.
    pub(crate) fn unassigned_connected(
        &self,
        graph: &RegionGraph,
        region: Option<&AHashSet<usize>>,
    ) -> bool {
        let admits = |node: usize| {
            self.district(node) == UNASSIGNED
                && region.is_none_or(|set| set.contains(&node))
        };

        let (total, start) = match region {
            Some(set) => {
                let total = set.iter().filter(|&&u| self.district(u) == UNASSIGNED).count();
                (total, set.iter().copied().find(|&u| self.district(u) == UNASSIGNED))
            }
            None => {
                // Prefer a boundary node as the BFS start; fall back to
                // a scan when nothing has been assigned yet.
                let start = self.boundary_of(UNASSIGNED).first().copied()
                    .or_else(|| (0..graph.len()).find(|&u| self.district(u) == UNASSIGNED));
                (self.size(UNASSIGNED), start)
            }
        };

        let Some(start) = start else { return total == 0 };

        let mut visited = vec![false; graph.len()];
        visited[start] = true;

        let mut seen = 1usize;
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            for v in graph.edges(u) {
                if !visited[v] && admits(v) {
                    visited[v] = true;
                    seen += 1;
                    queue.push_back(v);
                }
            }
        }

        seen == total
    }

    /// Check whether the node set of a district forms a single
    /// connected component. Empty districts count as connected.
    pub(crate) fn district_connected(&self, graph: &RegionGraph, district: u32) -> bool {
        let total = self.size(district);
        let Some(start) = (0..graph.len()).find(|&u| self.district(u) == district) else {
            return total == 0;
        };

        let mut visited = vec![false; graph.len()];
        visited[start] = true;

        let mut seen = 1usize;
        let mut queue = VecDeque::from([start]);
        while let Some(u) = queue.pop_front() {
            for v in graph.edges(u) {
                if !visited[v] && self.district(v) == district {
                    visited[v] = true;
                    seen += 1;
                    queue.push_back(v);
                }
            }
        }

        seen == total
    }
}
