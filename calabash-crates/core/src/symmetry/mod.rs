//! Symmetry handling during branch-and-bound search.
//!
//! The solver receives the symmetry of a problem as one or more components:
//! generating sets of permutations over the variables they move. The
//! [`OrbitalReduction`] propagator exploits these components without loss of
//! optimality by pruning bounds that are dominated within an orbit.

pub(crate) mod component;
mod orbital_reduction;

pub use orbital_reduction::OrbitalReduction;
pub use orbital_reduction::OrbitalReductionStatistics;
