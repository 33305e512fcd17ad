use ahash::AHashSet;
use rand::Rng;
use tracing::{debug, trace};

use crate::{
    partition::{SearchState, UNASSIGNED},
    search::{
        frame::{PendingSplit, SearchFrame},
        frontier,
        params::SearchContext,
    },
};

/// Outcome of offering one candidate node to the current district.
#[derive(Debug)]
pub(crate) enum Attempt {
    /// The node (and its descendants) joined the current district and
    /// every contiguity check passed.
    Placed,
    /// The node must be split: a child frame over its children is
    /// ready to run, and the parent's rollback bookkeeping is parked
    /// in `frame.pending`.
    Descend(SearchFrame),
    /// A restricted frame consumed its whole region: `district` is the
    /// terminal district, `consumed` what it received from the region.
    Completed { district: u32, consumed: u64 },
    /// The node cannot be assigned here; state and frame are already
    /// rolled back.
    Rejected,
}

/// Internal classification before re-validation.
enum Classified {
    Placed,
    Descend { child: SearchFrame, dof_effect: u32 },
    Completed { district: u32, consumed: u64 },
    Rejected,
}

/// Offer `node` to the frame's current district, applying the
/// add / split / step-down state machine.
///
/// On any rejected path the state journal and the frame are restored,
/// so the caller can move on to the next candidate.
pub(crate) fn attempt_candidate(
    ctx: &SearchContext,
    state: &mut SearchState,
    frame: &mut SearchFrame,
    node: usize,
    dof_effect: u32,
    rng: &mut impl Rng,
) -> Attempt {
    let saved = frame.save();
    let mark = state.checkpoint();

    match classify(ctx, state, frame, node, dof_effect, rng) {
        Classified::Placed => {
            if revalidate(ctx, state, frame, node) {
                Attempt::Placed
            } else {
                trace!(level = frame.level, node, "candidate breaks contiguity");
                state.rollback(ctx.hier, mark);
                frame.restore(saved);
                Attempt::Rejected
            }
        }
        Classified::Descend { child, dof_effect } => {
            frame.pending = Some(PendingSplit { node, dof_effect, mark, saved });
            Attempt::Descend(child)
        }
        Classified::Completed { district, consumed } => {
            Attempt::Completed { district, consumed }
        }
        Classified::Rejected => {
            state.rollback(ctx.hier, mark);
            frame.restore(saved);
            Attempt::Rejected
        }
    }
}

fn classify(
    ctx: &SearchContext,
    state: &mut SearchState,
    frame: &mut SearchFrame,
    node: usize,
    dof_effect: u32,
    rng: &mut impl Rng,
) -> Classified {
    let hier = ctx.hier;
    let graph = hier.graph(frame.level);
    let node_pop = graph.pop(node);
    let mut dof_effect = dof_effect;

    loop {
        let goal = frame.goals[frame.district as usize];

        if ctx.within_band(frame.population, goal) {
            // The current district is full: open the next one, seeded
            // by this candidate.
            frame.district += 1;
            frame.population = 0;
            frame.placed.clear();
            frame.dof.clear();
            frame.dof.insert(node, 0);
            dof_effect = 0;
            debug!(district = frame.district, level = frame.level, "opening district");

            // Inside a sub-region, a next goal larger than what is
            // left short-circuits: the remainder goes to the new
            // district wholesale.
            if frame.restricted() && frame.goals[frame.district as usize] > frame.region_pop {
                let consumed = bulk_assign(ctx, state, frame, frame.district);
                debug!(district = frame.district, consumed, "bulk-assigned region remainder");
                return Classified::Completed { district: frame.district, consumed };
            }
            continue;
        }

        if frame.population + node_pop > goal + ctx.deviation {
            // The node overshoots the goal and must be split.
            if hier.is_finest(frame.level) {
                return Classified::Rejected; // indivisible unit
            }

            // Splitting only makes sense if taking the whole node
            // would leave the rest of this level connected.
            let mark = state.checkpoint();
            state.flip(hier, frame.level, node, frame.district);
            let ok = state.level(frame.level).unassigned_connected(graph, None);
            state.rollback(hier, mark);
            if !ok {
                return Classified::Rejected;
            }

            let remaining = goal.saturating_sub(frame.population);
            let child_level = frame.level + 1;
            let region: AHashSet<usize> =
                hier.children_of(frame.level, node).iter().copied().collect();
            let region_pop = region.iter()
                .filter(|&&c| state.level(child_level).district(c) == UNASSIGNED)
                .map(|&c| hier.graph(child_level).pop(c))
                .sum();

            let seeds = frontier::region_seeds(state, ctx, child_level, &region, frame.district, rng);
            if seeds.is_empty() {
                return Classified::Rejected;
            }

            debug!(level = frame.level, node, district = frame.district, remaining,
                "stepping down to split unit");
            let child = SearchFrame::for_region(
                child_level,
                region,
                frame.district,
                derive_goals(&frame.goals, frame.district, remaining),
                seeds,
                region_pop,
            );
            return Classified::Descend { child, dof_effect };
        }

        // Whole assignment.
        frame.population += node_pop;
        frame.region_pop -= node_pop;
        frame.placed.insert(node);
        frame.unused.remove(&node);
        frame.dof.insert(node, dof_effect);
        state.flip_cascade(hier, frame.level, node, frame.district);
        return Classified::Placed;
    }
}

/// Goal list for a sub-search: districts already finished need
/// nothing, the district being split into needs only its remainder,
/// later districts keep their goals. The parent's own list is never
/// touched; it credits the child's actual consumption on splice.
fn derive_goals(goals: &[u64], district: u32, remaining: u64) -> Vec<u64> {
    goals.iter().enumerate()
        .map(|(d, &goal)| {
            match (d as u32).cmp(&district) {
                std::cmp::Ordering::Less => 0,
                std::cmp::Ordering::Equal => remaining,
                std::cmp::Ordering::Greater => goal,
            }
        })
        .collect()
}

/// Flip every remaining region node (with descendants) into `district`.
/// Returns the population moved. The region's unassigned set is kept
/// connected by the per-step checks, so the resulting district is too.
pub(crate) fn bulk_assign(
    ctx: &SearchContext,
    state: &mut SearchState,
    frame: &mut SearchFrame,
    district: u32,
) -> u64 {
    let mut nodes = frame.unused.iter().copied().collect::<Vec<_>>();
    nodes.sort_unstable();

    let consumed = frame.region_pop;
    for node in nodes {
        state.flip_cascade(ctx.hier, frame.level, node, district);
        frame.unused.remove(&node);
    }
    frame.region_pop = 0;
    consumed
}

/// Re-validate contiguity after a committed step: (a) the unassigned
/// region of this level, (b) the unassigned part of the active
/// sub-region, and (c), when the candidate borders a split node, the
/// finest-level unassigned region, which a coarse split can fragment
/// even when this level looks whole.
pub(crate) fn revalidate(
    ctx: &SearchContext,
    state: &SearchState,
    frame: &SearchFrame,
    node: usize,
) -> bool {
    let hier = ctx.hier;
    let graph = hier.graph(frame.level);
    let asn = state.level(frame.level);

    if !asn.unassigned_connected(graph, None) {
        return false;
    }
    if let Some(region) = &frame.region {
        if !asn.unassigned_connected(graph, Some(region)) {
            return false;
        }
    }
    if !hier.is_finest(frame.level) && state.near_split(frame.level, node) {
        let finest = hier.finest();
        if !state.level(finest).unassigned_connected(hier.graph(finest), None) {
            return false;
        }
    }
    true
}
