use ahash::{AHashMap, AHashSet};

use crate::partition::Checkpoint;

/// Mutable per-depth state of the search: which district is being
/// filled, what has been placed into it at this level, and what part
/// of the active region remains.
///
/// The root frame spans the whole coarsest level; every deeper frame
/// is restricted to the children of one node being split.
#[derive(Debug)]
pub(crate) struct SearchFrame {
    pub(crate) level: usize,
    /// District currently being filled. Shared numbering across all
    /// frames: a child continues its parent's counter.
    pub(crate) district: u32,
    /// Population accumulated into `district` from inside this frame's
    /// region.
    pub(crate) population: u64,
    /// Population goals indexed by district id (index 0 unused).
    pub(crate) goals: Vec<u64>,
    /// Nodes of this level placed in the current district.
    pub(crate) placed: AHashSet<usize>,
    /// Graph-distance of each placed node from the district's first
    /// unit ("degrees of freedom").
    pub(crate) dof: AHashMap<usize, u32>,
    /// Region restriction; `None` for the root frame.
    pub(crate) region: Option<AHashSet<usize>>,
    /// Region nodes not yet consumed (assigned whole or split).
    pub(crate) unused: AHashSet<usize>,
    /// Unassigned population remaining in the region.
    pub(crate) region_pop: u64,
    /// First-unit candidates, tried back-to-front before the frontier
    /// takes over.
    pub(crate) seed_queue: Vec<usize>,
    /// Candidates rejected since the last committed step.
    pub(crate) rejected: AHashSet<usize>,
    /// Bookkeeping for an in-flight child search, if any.
    pub(crate) pending: Option<PendingSplit>,
}

/// What the parent needs to splice a child search's result back in, or
/// to reject the split candidate wholesale.
#[derive(Debug)]
pub(crate) struct PendingSplit {
    /// The node being split at the parent's level.
    pub(crate) node: usize,
    /// Frontier distance the split candidate was drawn at.
    pub(crate) dof_effect: u32,
    /// Journal mark taken before the candidate was touched.
    pub(crate) mark: Checkpoint,
    /// Frame fields as they were before the candidate was touched.
    pub(crate) saved: SavedFrame,
}

/// Snapshot of a frame's mutable fields, for candidate rollback.
#[derive(Debug, Clone)]
pub(crate) struct SavedFrame {
    district: u32,
    population: u64,
    placed: AHashSet<usize>,
    dof: AHashMap<usize, u32>,
    unused: AHashSet<usize>,
    region_pop: u64,
}

impl SearchFrame {
    /// The root frame: the whole coarsest level, no restriction.
    pub(crate) fn root(
        district: u32,
        goals: Vec<u64>,
        unused: AHashSet<usize>,
        region_pop: u64,
        seed_node: usize,
    ) -> Self {
        Self {
            level: 0,
            district,
            population: 0,
            goals,
            placed: AHashSet::new(),
            dof: AHashMap::new(),
            region: None,
            unused,
            region_pop,
            seed_queue: vec![seed_node],
            rejected: AHashSet::new(),
            pending: None,
        }
    }

    /// A frame restricted to one split node's children.
    pub(crate) fn for_region(
        level: usize,
        region: AHashSet<usize>,
        district: u32,
        goals: Vec<u64>,
        seed_queue: Vec<usize>,
        region_pop: u64,
    ) -> Self {
        Self {
            level,
            district,
            population: 0,
            goals,
            placed: AHashSet::new(),
            dof: AHashMap::new(),
            unused: region.clone(),
            region: Some(region),
            region_pop,
            seed_queue,
            rejected: AHashSet::new(),
            pending: None,
        }
    }

    /// Is this frame restricted to a sub-region?
    #[inline]
    pub(crate) fn restricted(&self) -> bool { self.region.is_some() }

    /// Snapshot the fields a candidate attempt may mutate.
    pub(crate) fn save(&self) -> SavedFrame {
        SavedFrame {
            district: self.district,
            population: self.population,
            placed: self.placed.clone(),
            dof: self.dof.clone(),
            unused: self.unused.clone(),
            region_pop: self.region_pop,
        }
    }

    /// Restore a snapshot taken by [`save`](Self::save).
    pub(crate) fn restore(&mut self, saved: SavedFrame) {
        self.district = saved.district;
        self.population = saved.population;
        self.placed = saved.placed;
        self.dof = saved.dof;
        self.unused = saved.unused;
        self.region_pop = saved.region_pop;
    }
}

/// Outcome of a completed (popped) frame, delivered to the frame below.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FrameResult {
    /// The frame's region was filled: `district` is the terminal
    /// district and `consumed` the population it accumulated from
    /// inside the region.
    Done { district: u32, consumed: u64 },
    /// The frame exhausted its candidates.
    Failed,
}
