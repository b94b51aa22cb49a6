//! The symmetry handling core of the Calabash branch-and-bound solver.
//!
//! Many mixed-integer programs contain structural symmetry: permutations of
//! the variables that map feasible solutions onto feasible solutions of the
//! same objective value. This crate exploits such symmetry during search by
//! *orbital reduction*: given a generating set of permutations, it computes
//! the orbits of the subgroup stabilizing the branching decisions made so
//! far, and propagates that all variables in an orbit share the intersection
//! of their domains. The sibling technique of *orbital branching* is applied
//! while replaying the branching history, mimicking the constraint that a
//! branching variable dominates the other members of its orbit.
//!
//! The crate does not compute symmetry itself; generating sets arrive
//! precomputed through [`OrbitalReduction::add_component`]. The surrounding
//! search supplies the branching history through a [`ShadowTree`] and the
//! variable bounds through [`Domains`].
//!
//! # Example
//! ```
//! use calabash_core::Domains;
//! use calabash_core::OrbitalReduction;
//! use calabash_core::PropagationContext;
//! use calabash_core::ShadowTree;
//! use calabash_core::basic_types::BoundType;
//! use calabash_core::basic_types::BoundUpdate;
//!
//! let mut domains = Domains::default();
//! let x0 = domains.new_variable(0.0, 1.0);
//! let x1 = domains.new_variable(0.0, 1.0);
//!
//! // A single generator swapping the two variables.
//! let mut orbital_reduction = OrbitalReduction::default();
//! orbital_reduction
//!     .add_component(&domains, &[x0, x1], &[vec![1, 0]])
//!     .expect("the component moves both variables");
//!
//! // Branch x0 <= 0 below the root.
//! let mut shadow_tree = ShadowTree::default();
//! let root = shadow_tree.add_root();
//! let child = shadow_tree.add_child(root);
//! shadow_tree.record_branching_decision(
//!     child,
//!     BoundUpdate {
//!         variable: x0,
//!         bound_type: BoundType::Upper,
//!         new_bound: 0.0,
//!     },
//! );
//! domains.begin_branching();
//! let _ = domains.tighten_upper_bound(x0, 0.0).expect("non-empty");
//!
//! // Orbital branching fixes the other orbit member to 0 as well.
//! let context = PropagationContext::new(&mut domains, &shadow_tree, child);
//! let num_reductions = orbital_reduction
//!     .propagate(context)
//!     .expect("the branching is consistent");
//! assert_eq!(num_reductions, 1);
//! assert_eq!(domains.upper_bound(x1), 0.0);
//! ```

pub mod basic_types;
pub mod calabash_asserts;
pub mod containers;
pub mod engine;
pub mod statistics;
pub mod symmetry;

pub use basic_types::ComponentOperationError;
pub use basic_types::Inconsistency;
pub use basic_types::OrbitConflict;
pub use basic_types::PropagationStatus;
pub use engine::Domains;
pub use engine::EmptyDomain;
pub use engine::PropagationContext;
pub use engine::ShadowTree;
pub use engine::VariableId;
pub use symmetry::OrbitalReduction;
