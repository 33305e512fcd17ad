use crate::{error::InputError, hierarchy::Hierarchy};

/// Inputs of one plan-generation attempt.
///
/// `tolerance` is the allowed fractional deviation of a district's
/// population from `ideal_pop`; `dof_max` bounds how far (in graph
/// hops from a district's first unit) the frontier search will reach
/// before a branch is abandoned as infeasible.
#[derive(Debug, Clone)]
pub struct SearchParams {
    pub num_districts: u32,
    pub ideal_pop: u64,
    pub tolerance: f64,
    pub dof_max: u32,
    /// Coarsest-level node the walk starts from.
    pub seed_node: usize,
    /// Pre-assign coarse units whose whole population already fits one
    /// district. Off by default.
    pub seed_contained_districts: bool,
}

impl SearchParams {
    pub fn new(num_districts: u32, ideal_pop: u64, tolerance: f64) -> Self {
        Self {
            num_districts,
            ideal_pop,
            tolerance,
            dof_max: 50,
            seed_node: 0,
            seed_contained_districts: false,
        }
    }

    /// Reject malformed configurations before any search runs.
    pub fn validate(&self, hier: &Hierarchy) -> Result<(), InputError> {
        if self.num_districts < 2 {
            return Err(InputError::DistrictCount(self.num_districts));
        }
        if self.ideal_pop == 0 {
            return Err(InputError::ZeroIdealPopulation);
        }
        if self.tolerance < 0.0 {
            return Err(InputError::NegativeTolerance(self.tolerance));
        }
        if self.seed_node >= hier.graph(0).len() {
            return Err(InputError::SeedOutOfRange {
                node: self.seed_node,
                len: hier.graph(0).len(),
            });
        }
        Ok(())
    }

    /// Allowed absolute deviation from a district's population goal.
    pub(crate) fn deviation(&self) -> u64 {
        (self.ideal_pop as f64 * self.tolerance) as u64
    }
}

/// Read-only view threaded through every search call: the hierarchy,
/// the parameters, and the precomputed absolute deviation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct SearchContext<'a> {
    pub(crate) hier: &'a Hierarchy,
    pub(crate) params: &'a SearchParams,
    pub(crate) deviation: u64,
}

impl<'a> SearchContext<'a> {
    pub(crate) fn new(hier: &'a Hierarchy, params: &'a SearchParams) -> Self {
        Self { hier, params, deviation: params.deviation() }
    }

    /// Is `pop` within the allowed band around `goal`?
    #[inline]
    pub(crate) fn within_band(&self, pop: u64, goal: u64) -> bool {
        pop.abs_diff(goal) <= self.deviation
    }
}
