use crate::engine::EmptyDomain;
use crate::engine::VariableId;

/// The result of invoking the orbital reduction propagator. The propagation
/// can either succeed or identify a conflict.
pub type PropagationStatus = Result<(), Inconsistency>;

#[derive(Debug, PartialEq)]
pub enum Inconsistency {
    EmptyDomain,
    Conflict(OrbitConflict),
}

impl From<EmptyDomain> for Inconsistency {
    fn from(_: EmptyDomain) -> Self {
        Inconsistency::EmptyDomain
    }
}

impl From<OrbitConflict> for Inconsistency {
    fn from(conflict: OrbitConflict) -> Self {
        Inconsistency::Conflict(conflict)
    }
}

/// A conflict identified on a whole orbit: since all variables in an orbit
/// can be permuted onto one another, their domains may be intersected, and an
/// empty intersection means the node is infeasible.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OrbitConflict {
    /// A representative variable of the conflicting orbit.
    pub variable: VariableId,
    /// The maximal lower bound over the orbit.
    pub lower_bound: f64,
    /// The minimal upper bound over the orbit; strictly below `lower_bound`.
    pub upper_bound: f64,
}
