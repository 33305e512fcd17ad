#![doc = r"Hierarchical districting plan generator.

Assigns every unit of the finest hierarchy level (precincts) to one of
N districts so that each district is population-balanced within a
tolerance and contiguous, while splitting as few coarse units
(counties, municipalities) as possible. The work happens in a
backtracking walk over the coarsest graph that steps down a hierarchy
level whenever a unit has to be divided between two districts.

Graph construction, membership tables, and result export live with the
caller; this crate takes read-only [`RegionGraph`]s wrapped in a
[`Hierarchy`] and hands back a [`Plan`] or an explicit failure to be
retried with fresh randomness."]

mod error;
mod graph;
mod hierarchy;
mod partition;
mod plan;
mod search;

pub use error::{Error, InputError, SearchFailure};
pub use graph::RegionGraph;
pub use hierarchy::Hierarchy;
pub use partition::{RESIDUAL_DISTRICT, UNASSIGNED};
pub use plan::{Plan, SplitAllocation};
pub use search::{generate_plan, SearchParams};
