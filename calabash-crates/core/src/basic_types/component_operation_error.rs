use thiserror::Error;

/// Errors which can occur while registering a symmetry component with the
/// orbital reduction propagator.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentOperationError {
    #[error("The component does not contain any permutations.")]
    NoPermutations,
    #[error("The permutations of the component do not move any variable.")]
    FixedComponent,
}
