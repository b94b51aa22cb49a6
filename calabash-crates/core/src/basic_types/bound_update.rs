use crate::engine::VariableId;

/// The two bounds of a variable domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BoundType {
    Lower,
    Upper,
}

/// A single bound change: which variable, which of its bounds, and the new
/// bound value. Shadow tree nodes store these for both propagations and
/// branching decisions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundUpdate {
    pub variable: VariableId,
    pub bound_type: BoundType,
    pub new_bound: f64,
}
