use thiserror::Error;

/// Configuration problems detected before the search begins.
///
/// These are the only conditions treated as errors proper: everything
/// that can go wrong *during* the search is an ordinary outcome of a
/// combinatorial search and is reported as [`SearchFailure`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("hierarchy must have at least one level")]
    NoLevels,

    #[error("graph at level {level} has no nodes")]
    EmptyLevel { level: usize },

    #[error("graph at level {level} is not connected")]
    DisconnectedLevel { level: usize },

    #[error("node {node} at level {level} names parent {parent}, but the level above has {len} nodes")]
    ParentOutOfRange { level: usize, node: usize, parent: usize, len: usize },

    #[error("node {node} at level {level} has population {expected}, but its children sum to {actual}")]
    PopulationMismatch { level: usize, node: usize, expected: u64, actual: u64 },

    #[error("district count must be at least 2 (got {0})")]
    DistrictCount(u32),

    #[error("ideal district population must be positive")]
    ZeroIdealPopulation,

    #[error("population tolerance must be non-negative (got {0})")]
    NegativeTolerance(f64),

    #[error("seed node {node} is out of range for the coarsest level ({len} nodes)")]
    SeedOutOfRange { node: usize, len: usize },
}

/// The search ran to exhaustion without finding a valid plan.
///
/// Not a process error: the expected response is a retry with fresh
/// randomness, driven by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SearchFailure {
    /// Every frontier candidate for `district` was tried (out to the
    /// configured frontier-distance bound) without a valid assignment.
    #[error("no assignable unit for district {district} within the frontier-distance bound")]
    Exhausted { district: u32 },
}

/// Any failure of [`generate_plan`](crate::generate_plan).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Search(#[from] SearchFailure),
}
