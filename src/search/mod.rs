mod assigner;
mod driver;
mod frame;
mod frontier;
mod params;

pub use params::SearchParams;

use rand::Rng;
use tracing::{debug, info};

use crate::{
    error::Error,
    hierarchy::Hierarchy,
    partition::SearchState,
    plan::Plan,
    search::params::SearchContext,
};

/// Generate a single valid districting plan, or report that this
/// random walk found none.
///
/// All randomness flows through `rng`: the same seed over the same
/// input reproduces the same plan, and different seeds yield the
/// diverse plans an ensemble needs. On [`Error::Search`] the expected
/// response is to call again with fresh randomness.
pub fn generate_plan(
    hier: &Hierarchy,
    params: &SearchParams,
    rng: &mut impl Rng,
) -> Result<Plan, Error> {
    params.validate(hier)?;

    let ctx = SearchContext::new(hier, params);
    let mut state = SearchState::new(hier, params.num_districts);

    let start_district = if params.seed_contained_districts {
        seed_contained_districts(&ctx, &mut state)
    } else {
        2
    };

    if start_district <= params.num_districts {
        driver::run(&ctx, &mut state, start_district, rng)?;
    } else {
        // Seeding alone used up every district; the leftover must
        // still make one contiguous residual district.
        let finest = hier.finest();
        if !state.level(finest).unassigned_connected(hier.graph(finest), None) {
            return Err(crate::error::SearchFailure::Exhausted { district: params.num_districts }.into());
        }
    }

    let plan = Plan::finalize(hier, params, state);
    info!(districts = params.num_districts, splits = plan.splits().len(), "plan generated");
    Ok(plan)
}

/// Pre-assign each coarse unit whose whole population already fits one
/// district. Returns the first district id left for the walk to fill.
fn seed_contained_districts(ctx: &SearchContext, state: &mut SearchState) -> u32 {
    let graph = ctx.hier.graph(0);
    let mut district = 2;

    for node in 0..graph.len() {
        if district > ctx.params.num_districts {
            break;
        }
        if node == ctx.params.seed_node {
            continue;
        }
        if ctx.within_band(graph.pop(node), ctx.params.ideal_pop) {
            state.flip_cascade(ctx.hier, 0, node, district);
            debug!(node, district, "seeded contained district");
            district += 1;
        }
    }
    district
}
