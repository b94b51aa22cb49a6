//! Contains containers which are used by the solver.
mod disjoint_sets;
mod keyed_vec;

use fnv::FnvBuildHasher;

pub use disjoint_sets::*;
pub use keyed_vec::*;

/// [`std::collections::HashMap`] that defaults to a deterministic hasher.
#[allow(clippy::disallowed_types, reason = "this is how we define our HashMap")]
pub type HashMap<K, V, Hasher = FnvBuildHasher> = std::collections::HashMap<K, V, Hasher>;
/// [`std::collections::HashSet`] that defaults to a deterministic hasher.
#[allow(clippy::disallowed_types, reason = "this is how we define our HashSet")]
pub type HashSet<K, Hasher = FnvBuildHasher> = std::collections::HashSet<K, Hasher>;
