use crate::{error::InputError, graph::RegionGraph};

/// A nested set of [`RegionGraph`]s, coarsest first, with membership
/// links between adjacent levels.
///
/// Every node at level `L > 0` has exactly one parent at level `L - 1`;
/// a parent's population must equal the sum of its children's. The
/// membership tables are precomputed upstream and read-only here.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    levels: Vec<RegionGraph>,
    /// `parents[l][node]` is the level-`l` parent of `node` at level `l + 1`.
    parents: Vec<Vec<usize>>,
    /// `children[l][node]` lists the level-`l + 1` nodes owned by `node` at level `l`.
    children: Vec<Vec<Vec<usize>>>,
}

impl Hierarchy {
    /// Build and validate a hierarchy.
    ///
    /// `parents` has one table per pair of adjacent levels:
    /// `parents[l]` maps each node of level `l + 1` to its parent at
    /// level `l`. Malformed input (disconnected levels, dangling
    /// parents, inconsistent populations) is rejected here, before any
    /// search can run.
    pub fn new(levels: Vec<RegionGraph>, parents: Vec<Vec<usize>>) -> Result<Self, InputError> {
        if levels.is_empty() { return Err(InputError::NoLevels) }
        assert!(parents.len() == levels.len() - 1,
            "expected {} parent tables for {} levels, got {}", levels.len() - 1, levels.len(), parents.len());

        for (level, graph) in levels.iter().enumerate() {
            if graph.is_empty() { return Err(InputError::EmptyLevel { level }) }
            if !graph.connected() { return Err(InputError::DisconnectedLevel { level }) }
        }

        for (l, table) in parents.iter().enumerate() {
            assert!(table.len() == levels[l + 1].len(),
                "parent table {} must cover every node of level {}", l, l + 1);
            for (node, &parent) in table.iter().enumerate() {
                if parent >= levels[l].len() {
                    return Err(InputError::ParentOutOfRange {
                        level: l + 1, node, parent, len: levels[l].len(),
                    });
                }
            }
        }

        // Derive child lists from the parent tables.
        let children = parents.iter().enumerate()
            .map(|(l, table)| {
                let mut lists = vec![Vec::new(); levels[l].len()];
                for (node, &parent) in table.iter().enumerate() {
                    lists[parent].push(node);
                }
                lists
            })
            .collect::<Vec<_>>();

        // Parent populations must equal the sum over their children.
        for (l, lists) in children.iter().enumerate() {
            for (node, list) in lists.iter().enumerate() {
                let expected = levels[l].pop(node);
                let actual: u64 = list.iter().map(|&c| levels[l + 1].pop(c)).sum();
                if expected != actual {
                    return Err(InputError::PopulationMismatch { level: l, node, expected, actual });
                }
            }
        }

        Ok(Self { levels, parents, children })
    }

    /// A single-level hierarchy (no units can be split).
    pub fn single_level(graph: RegionGraph) -> Result<Self, InputError> {
        Self::new(vec![graph], vec![])
    }

    /// Number of levels, coarsest first.
    #[inline] pub fn depth(&self) -> usize { self.levels.len() }

    /// Index of the finest level.
    #[inline] pub fn finest(&self) -> usize { self.levels.len() - 1 }

    /// Returns true if `level` is the finest level (units there are indivisible).
    #[inline] pub fn is_finest(&self, level: usize) -> bool { level == self.finest() }

    /// Get the graph at a given level.
    #[inline] pub fn graph(&self, level: usize) -> &RegionGraph { &self.levels[level] }

    /// Get the level-`level` parent of `node` at level `level + 1`.
    #[inline]
    pub fn parent_of(&self, level: usize, node: usize) -> usize {
        self.parents[level][node]
    }

    /// Get the level-`level + 1` nodes owned by `node` at level `level`.
    #[inline]
    pub fn children_of(&self, level: usize, node: usize) -> &[usize] {
        &self.children[level][node]
    }

    /// Collect the finest-level descendants of a node at any level.
    pub fn finest_descendants(&self, level: usize, node: usize) -> Vec<usize> {
        let mut current = vec![node];
        for l in level..self.finest() {
            current = current.iter()
                .flat_map(|&n| self.children_of(l, n).iter().copied())
                .collect();
        }
        current
    }
}
