use rand::{seq::SliceRandom, Rng};
use tracing::{debug, trace};

use crate::{
    error::SearchFailure,
    partition::{SearchState, UNASSIGNED},
    search::{
        assigner::{self, Attempt},
        frame::{FrameResult, SearchFrame},
        frontier,
        params::SearchContext,
    },
};

/// What one driver step did to the top frame.
enum Step {
    Placed,
    Descend(SearchFrame),
    Completed { district: u32, consumed: u64 },
    Exhausted,
}

/// What splicing a child result into its parent produced.
enum Spliced {
    Continue,
    Completed { district: u32, consumed: u64 },
    Rejected,
}

/// Depth-first backtracking search over an explicit frame stack.
///
/// Frames stand in for the native recursion across hierarchy levels:
/// the stack never grows deeper than the hierarchy itself, however
/// large the input. Failure is ordinary control flow; only the root
/// frame's exhaustion surfaces as [`SearchFailure`].
pub(crate) fn run(
    ctx: &SearchContext,
    state: &mut SearchState,
    start_district: u32,
    rng: &mut impl Rng,
) -> Result<(), SearchFailure> {
    let mut stack = vec![root_frame(ctx, state, start_district)];
    let mut returned: Option<FrameResult> = None;

    loop {
        if let Some(result) = returned.take() {
            // A child frame finished; splice its outcome into the new top.
            let frame = stack.last_mut().expect("child result with empty stack");
            match splice(ctx, state, frame, result) {
                Spliced::Continue | Spliced::Rejected => {}
                Spliced::Completed { district, consumed } => {
                    stack.pop();
                    match stack.last() {
                        Some(_) => returned = Some(FrameResult::Done { district, consumed }),
                        None => return finish(ctx, state, district),
                    }
                    continue;
                }
            }
        }

        let frame = stack.last_mut().unwrap();

        // Terminal success: the final district is filled to its goal.
        if frame.district == ctx.params.num_districts
            && ctx.within_band(frame.population, frame.goals[frame.district as usize])
        {
            let result = FrameResult::Done { district: frame.district, consumed: frame.population };
            let district = frame.district;
            stack.pop();
            if stack.is_empty() {
                return finish(ctx, state, district);
            }
            debug!(level = stack.len(), "sub-region filled the final district");
            returned = Some(result);
            continue;
        }

        match try_step(ctx, state, frame, rng) {
            Step::Placed => {
                frame.rejected.clear();
            }
            Step::Descend(child) => stack.push(child),
            Step::Completed { district, consumed } => {
                stack.pop();
                match stack.last() {
                    Some(_) => returned = Some(FrameResult::Done { district, consumed }),
                    None => return finish(ctx, state, district),
                }
            }
            Step::Exhausted => {
                let district = frame.district;
                stack.pop();
                if stack.is_empty() {
                    debug!(district, "search exhausted");
                    return Err(SearchFailure::Exhausted { district });
                }
                trace!(district, "sub-region search exhausted");
                returned = Some(FrameResult::Failed);
            }
        }
    }
}

fn root_frame(ctx: &SearchContext, state: &SearchState, start_district: u32) -> SearchFrame {
    let level0 = state.level(0);
    let mut goals = vec![ctx.params.ideal_pop; ctx.params.num_districts as usize + 1];
    goals[UNASSIGNED as usize] = 0;

    SearchFrame::root(
        start_district,
        goals,
        (0..ctx.hier.graph(0).len())
            .filter(|&u| level0.district(u) == UNASSIGNED)
            .collect(),
        level0.pop(UNASSIGNED),
        ctx.params.seed_node,
    )
}

/// A successful search must leave the residual region in one piece at
/// the finest level; a fragmented remainder means this random walk is
/// a dud, reported like any other exhaustion.
fn finish(ctx: &SearchContext, state: &SearchState, district: u32) -> Result<(), SearchFailure> {
    let finest = ctx.hier.finest();
    if state.level(finest).unassigned_connected(ctx.hier.graph(finest), None) {
        Ok(())
    } else {
        debug!("residual region is fragmented at the finest level");
        Err(SearchFailure::Exhausted { district })
    }
}

/// Try to advance the top frame by one committed candidate.
fn try_step(
    ctx: &SearchContext,
    state: &mut SearchState,
    frame: &mut SearchFrame,
    rng: &mut impl Rng,
) -> Step {
    // Seeding phase: nothing placed yet in this frame's first district.
    if frame.placed.is_empty() && frame.dof.is_empty() {
        while let Some(seed) = frame.seed_queue.pop() {
            if state.level(frame.level).district(seed) != UNASSIGNED {
                continue;
            }
            match assigner::attempt_candidate(ctx, state, frame, seed, 0, rng) {
                Attempt::Placed => return Step::Placed,
                Attempt::Descend(child) => return Step::Descend(child),
                Attempt::Completed { district, consumed } => {
                    return Step::Completed { district, consumed };
                }
                Attempt::Rejected => {}
            }
        }
        return Step::Exhausted;
    }

    let buckets = frontier::dof_buckets(state, ctx, frame);
    for dof in 1..=ctx.params.dof_max {
        let Some(bucket) = buckets.get(&dof) else { continue };

        let mut candidates = bucket.iter().copied()
            .filter(|node| !frame.rejected.contains(node))
            .collect::<Vec<_>>();
        candidates.shuffle(rng);

        for node in candidates {
            match assigner::attempt_candidate(ctx, state, frame, node, dof, rng) {
                Attempt::Placed => return Step::Placed,
                Attempt::Descend(child) => return Step::Descend(child),
                Attempt::Completed { district, consumed } => {
                    return Step::Completed { district, consumed };
                }
                Attempt::Rejected => {
                    frame.rejected.insert(node);
                }
            }
        }
    }
    Step::Exhausted
}

/// Fold a finished child search back into its parent frame.
fn splice(
    ctx: &SearchContext,
    state: &mut SearchState,
    frame: &mut SearchFrame,
    result: FrameResult,
) -> Spliced {
    let pending = frame.pending.take().expect("child result without a pending split");
    let hier = ctx.hier;
    let node = pending.node;

    let FrameResult::Done { district, consumed } = result else {
        // The node could not be split: reject it as a candidate.
        trace!(level = frame.level, node, "sub-region split failed");
        state.rollback(hier, pending.mark);
        frame.restore(pending.saved);
        frame.rejected.insert(node);
        return Spliced::Rejected;
    };

    // Mark the split node with its terminal district at this level
    // (descendants already carry their own districts).
    state.flip(hier, frame.level, node, district);
    state.record_split(hier, frame.level, node);
    frame.unused.remove(&node);
    frame.region_pop -= hier.graph(frame.level).pop(node);

    if district != frame.district {
        // The sub-search advanced the district counter: the current
        // district restarts from this node.
        frame.district = district;
        frame.population = consumed;
        frame.placed.clear();
        frame.placed.insert(node);
        frame.dof.clear();
        frame.dof.insert(node, 0);
    } else {
        frame.population += consumed;
        frame.placed.insert(node);
        frame.dof.insert(node, pending.dof_effect);
    }

    if !assigner::revalidate(ctx, state, frame, node) {
        trace!(level = frame.level, node, "split splice breaks contiguity");
        state.rollback(hier, pending.mark);
        frame.restore(pending.saved);
        frame.rejected.insert(node);
        return Spliced::Rejected;
    }
    frame.rejected.clear();
    debug!(level = frame.level, node, district, consumed, "spliced split unit");

    // The split may have left less region than the current district
    // still needs; if so the remainder belongs to it wholesale.
    if frame.restricted() {
        let goal = frame.goals[frame.district as usize];
        if goal.saturating_sub(frame.population) > frame.region_pop {
            let bulk = assigner::bulk_assign(ctx, state, frame, frame.district);
            debug!(district = frame.district, bulk, "bulk-assigned remainder after split");
            return Spliced::Completed {
                district: frame.district,
                consumed: frame.population + bulk,
            };
        }
    }
    Spliced::Continue
}
