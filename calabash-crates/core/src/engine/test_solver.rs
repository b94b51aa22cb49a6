#![cfg(any(test, doc))]
//! This module exposes helpers that aid testing of the orbital reduction
//! propagator. The [`TestSolver`] plays the role of the surrounding search:
//! it owns the bound store, the shadow tree and the propagator, creates
//! nodes by branching, and keeps the shadow tree consistent with the bound
//! changes the propagator performs.

use crate::basic_types::BoundType;
use crate::basic_types::BoundUpdate;
use crate::basic_types::ComponentOperationError;
use crate::basic_types::Inconsistency;
use crate::engine::Domains;
use crate::engine::PropagationContext;
use crate::engine::SearchStage;
use crate::engine::ShadowNodeId;
use crate::engine::ShadowTree;
use crate::engine::VariableId;
use crate::symmetry::OrbitalReduction;

/// A container for the collaborators of the propagator, which can be used to
/// test it under specific branching scenarios.
#[derive(Debug)]
pub(crate) struct TestSolver {
    pub(crate) domains: Domains,
    pub(crate) shadow_tree: ShadowTree,
    pub(crate) orbital_reduction: OrbitalReduction,
    root: ShadowNodeId,
}

impl Default for TestSolver {
    fn default() -> Self {
        let mut shadow_tree = ShadowTree::default();
        let root = shadow_tree.add_root();

        TestSolver {
            domains: Domains::default(),
            shadow_tree,
            orbital_reduction: OrbitalReduction::default(),
            root,
        }
    }
}

impl TestSolver {
    pub(crate) fn root(&self) -> ShadowNodeId {
        self.root
    }

    pub(crate) fn new_variable(&mut self, lower_bound: f64, upper_bound: f64) -> VariableId {
        self.domains.new_variable(lower_bound, upper_bound)
    }

    pub(crate) fn add_component(
        &mut self,
        permvars: &[VariableId],
        perms: &[Vec<usize>],
    ) -> Result<(), ComponentOperationError> {
        self.orbital_reduction
            .add_component(&self.domains, permvars, perms)
    }

    /// Creates a child of `parent` through the branching `variable >= bound`.
    pub(crate) fn branch_lower(
        &mut self,
        parent: ShadowNodeId,
        variable: VariableId,
        bound: f64,
    ) -> ShadowNodeId {
        self.branch(parent, variable, BoundType::Lower, bound)
    }

    /// Creates a child of `parent` through the branching `variable <= bound`.
    pub(crate) fn branch_upper(
        &mut self,
        parent: ShadowNodeId,
        variable: VariableId,
        bound: f64,
    ) -> ShadowNodeId {
        self.branch(parent, variable, BoundType::Upper, bound)
    }

    fn branch(
        &mut self,
        parent: ShadowNodeId,
        variable: VariableId,
        bound_type: BoundType,
        new_bound: f64,
    ) -> ShadowNodeId {
        if self.domains.stage() == SearchStage::PreBranching {
            self.domains.begin_branching();
        }

        let child = self.shadow_tree.add_child(parent);
        self.shadow_tree.record_branching_decision(
            child,
            BoundUpdate {
                variable,
                bound_type,
                new_bound,
            },
        );

        let result = match bound_type {
            BoundType::Lower => self.domains.tighten_lower_bound(variable, new_bound),
            BoundType::Upper => self.domains.tighten_upper_bound(variable, new_bound),
        };
        assert!(result.is_ok(), "branching must not empty a domain in tests");

        // The decision is recorded as such, not as a propagation.
        let _ = self.domains.drain_bound_changes();

        child
    }

    /// Applies a tightening not caused by branching and records it as a
    /// propagation of `node`.
    pub(crate) fn apply_propagation(
        &mut self,
        node: ShadowNodeId,
        variable: VariableId,
        bound_type: BoundType,
        new_bound: f64,
    ) {
        let result = match bound_type {
            BoundType::Lower => self.domains.tighten_lower_bound(variable, new_bound),
            BoundType::Upper => self.domains.tighten_upper_bound(variable, new_bound),
        };
        assert!(
            matches!(result, Ok(true)),
            "external propagations must strictly tighten in tests"
        );

        for update in self.domains.drain_bound_changes() {
            self.shadow_tree.record_propagation(node, update);
        }
    }

    /// Runs the propagator with `node` as the focus node, recording every
    /// tightening it performs as a propagation of that node.
    pub(crate) fn propagate_at(&mut self, node: ShadowNodeId) -> Result<u64, Inconsistency> {
        if self.domains.stage() == SearchStage::PreBranching {
            self.domains.begin_branching();
        }

        let context = PropagationContext::new(&mut self.domains, &self.shadow_tree, node);
        let result = self.orbital_reduction.propagate(context);

        for update in self.domains.drain_bound_changes() {
            self.shadow_tree.record_propagation(node, update);
        }

        result
    }

    pub(crate) fn assert_bounds(&self, variable: VariableId, lower_bound: f64, upper_bound: f64) {
        assert_eq!(
            self.domains.lower_bound(variable),
            lower_bound,
            "lower bound of {variable} differs"
        );
        assert_eq!(
            self.domains.upper_bound(variable),
            upper_bound,
            "upper bound of {variable} differs"
        );
    }
}
