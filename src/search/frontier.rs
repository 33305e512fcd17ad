use std::collections::BTreeMap;

use ahash::{AHashMap, AHashSet};
use rand::{seq::SliceRandom, Rng};

use crate::{
    partition::{SearchState, RESIDUAL_DISTRICT, UNASSIGNED},
    search::{frame::SearchFrame, params::SearchContext},
};

/// Candidate expansion order for the current district: unassigned
/// region nodes adjacent to a placed node, bucketed by graph-distance
/// from the district's first unit (1 + the placed neighbor's own
/// distance). A node reachable at several distances lands in its
/// smallest bucket.
///
/// Buckets are sorted by node id so that, given a seeded RNG, the
/// subsequent shuffle is reproducible.
pub(crate) fn dof_buckets(
    state: &SearchState,
    ctx: &SearchContext,
    frame: &SearchFrame,
) -> BTreeMap<u32, Vec<usize>> {
    let graph = ctx.hier.graph(frame.level);

    let mut best = AHashMap::<usize, u32>::new();
    for (&placed, &dof) in &frame.dof {
        for neighbor in graph.edges(placed) {
            if frame.unused.contains(&neighbor) {
                best.entry(neighbor)
                    .and_modify(|d| *d = (*d).min(dof + 1))
                    .or_insert(dof + 1);
            }
        }
    }
    debug_assert!(best.keys().all(|&u| state.level(frame.level).district(u) == UNASSIGNED));

    let mut buckets = BTreeMap::<u32, Vec<usize>>::new();
    for (node, dof) in best {
        buckets.entry(dof).or_default().push(node);
    }
    for bucket in buckets.values_mut() {
        bucket.sort_unstable();
    }
    buckets
}

/// First-unit candidates for a step-down sub-search: unassigned region
/// nodes adjacent (at the finer level) to the district being filled.
///
/// A just-closed district may leave the current district with no
/// assigned node touching the region; in that case the boundary of the
/// previous district is used, walking back at most to the first active
/// district. If even that yields nothing (the very first assignment of
/// a search), any region node works. Returned shuffled, to be tried
/// back-to-front.
pub(crate) fn region_seeds(
    state: &SearchState,
    ctx: &SearchContext,
    level: usize,
    region: &AHashSet<usize>,
    district: u32,
    rng: &mut impl Rng,
) -> Vec<usize> {
    let graph = ctx.hier.graph(level);
    let asn = state.level(level);

    let mut district = district;
    loop {
        if district <= RESIDUAL_DISTRICT {
            // Nothing assigned borders the region anywhere: free choice.
            let mut seeds = region.iter().copied()
                .filter(|&u| asn.district(u) == UNASSIGNED)
                .collect::<Vec<_>>();
            seeds.sort_unstable();
            seeds.shuffle(rng);
            return seeds;
        }

        let mut seeds = Vec::new();
        let mut in_seeds = AHashSet::new();
        for &placed in asn.boundary_of(district) {
            for neighbor in graph.edges(placed) {
                if asn.district(neighbor) == UNASSIGNED
                    && region.contains(&neighbor)
                    && in_seeds.insert(neighbor)
                {
                    seeds.push(neighbor);
                }
            }
        }

        if !seeds.is_empty() {
            seeds.sort_unstable();
            seeds.shuffle(rng);
            return seeds;
        }
        district -= 1;
    }
}
