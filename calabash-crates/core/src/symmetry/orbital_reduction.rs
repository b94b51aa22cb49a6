//! Symmetry handling by orbital reduction.
//!
//! Orbital reduction works on one symmetry component at a time and uses a
//! two step mechanism at every node of the branch-and-bound tree:
//!
//! 1. While replaying the path from the root, the symmetry subgroup that
//!    stabilizes the branching decisions made *before* the focus node is
//!    computed. For a branching variable `x` with variable `y` in its orbit,
//!    the constraint `x >= y` is mimicked by bound propagations.
//! 2. At the focus node itself, the stabilizer of all branching decisions on
//!    the path is computed, and within each of its orbits the variable
//!    domains are replaced by their intersection.
//!
//! The first step generalizes orbital branching and the second generalizes
//! orbital fixing from the binary case to arbitrary domains.
//!
//! REF: Ostrowski et al., "Orbital branching", Mathematical Programming 126
//! (2011); Margot, "Pruning by isomorphism in branch-and-cut", Mathematical
//! Programming 94 (2002).

use itertools::Itertools;
use log::warn;

use crate::basic_types::BoundType;
use crate::basic_types::ComponentOperationError;
use crate::basic_types::Inconsistency;
use crate::basic_types::OrbitConflict;
use crate::basic_types::PropagationStatus;
use crate::calabash_assert_advanced;
use crate::calabash_assert_moderate;
use crate::calabash_assert_simple;
use crate::containers::DisjointSets;
use crate::create_statistics_struct;
use crate::engine::Domains;
use crate::engine::PropagationContext;
use crate::engine::SearchStage;
use crate::engine::VariableId;
use crate::statistics::Statistic;
use crate::statistics::StatisticLogger;
use crate::symmetry::component::Component;

create_statistics_struct!(
    /// Statistics of the orbital reduction propagator.
    OrbitalReductionStatistics {
        /// The total number of bound reductions performed.
        number_of_reductions: u64,
        /// The number of propagation rounds that detected infeasibility.
        number_of_conflicts: u64,
    }
);

/// The orbital reduction propagator: owns the registered symmetry
/// components and exposes the propagation entry point.
///
/// Components are registered with [`OrbitalReduction::add_component`] once
/// the problem is transformed, and propagation is invoked by the search at
/// every focus node through [`OrbitalReduction::propagate`].
#[derive(Debug, Default)]
pub struct OrbitalReduction {
    components: Vec<Component>,
    statistics: OrbitalReductionStatistics,
}

impl OrbitalReduction {
    /// Registers a symmetry component given by `perms` over the variable
    /// sequence `permvars`.
    ///
    /// Each permutation maps the index `i` to the index of the variable it
    /// is permuted onto; `perm[i] == i` means the variable is fixed by that
    /// generator. Indices fixed by every generator are dropped internally.
    pub fn add_component(
        &mut self,
        domains: &Domains,
        permvars: &[VariableId],
        perms: &[Vec<usize>],
    ) -> Result<(), ComponentOperationError> {
        let component = Component::new(domains, permvars, perms)?;
        self.components.push(component);
        Ok(())
    }

    pub fn num_components(&self) -> usize {
        self.components.len()
    }

    /// Removes all registered components, unsubscribing them from global
    /// bound change events. The statistics are kept.
    pub fn reset(&mut self) {
        self.components.clear();
    }

    pub fn statistics(&self) -> &OrbitalReductionStatistics {
        &self.statistics
    }

    pub fn log_statistics(&self, statistic_logger: StatisticLogger) {
        self.statistics.log(statistic_logger.clone());
        statistic_logger
            .attach_to_prefix("component_sizes")
            .log_statistic(self.components.iter().map(Component::num_perms).join(" "));
    }

    /// Propagates all components at the focus node of the context.
    ///
    /// Returns the number of bound reductions performed, or the detected
    /// inconsistency. Reductions performed before a conflict was found are
    /// kept, both in the domains and in the statistics.
    ///
    /// The call is a no-op when no component is registered, when the search
    /// is probing, or during repropagation.
    pub fn propagate(
        &mut self,
        mut context: PropagationContext<'_>,
    ) -> Result<u64, Inconsistency> {
        if self.components.is_empty() {
            return Ok(0);
        }

        // Probing nodes are rolled back; nothing may be propagated there.
        if context.is_probing {
            return Ok(0);
        }

        // The path to the root may have changed in repropagation, so the
        // replayed history cannot be trusted.
        if context.is_repropagating {
            return Ok(0);
        }

        let mut num_reductions = 0;
        let mut status = Ok(());
        for component in &mut self.components {
            status = propagate_component(component, &mut context, &mut num_reductions);
            if status.is_err() {
                break;
            }
        }

        self.statistics.number_of_reductions += num_reductions;

        match status {
            Ok(()) => Ok(num_reductions),
            Err(inconsistency) => {
                self.statistics.number_of_conflicts += 1;
                Err(inconsistency)
            }
        }
    }
}

/// Runs both steps of orbital reduction for one component, identifying the
/// globally broken orbits first if this is the first round.
fn propagate_component(
    component: &mut Component,
    context: &mut PropagationContext<'_>,
    num_reductions: &mut u64,
) -> PropagationStatus {
    calabash_assert_simple!(
        context.domains.stage() == SearchStage::Branching,
        "orbital reduction propagates only once branching has started"
    );

    // Global bound reductions found before branching arrive lazily through
    // the component's subscription.
    component.update_global_bound_cache();

    if !component.is_symmetry_evaluated() {
        identify_symmetries_broken(component, context.domains);
    }

    // If symmetry is broken on every orbit there is nothing left to exploit.
    if component.broken_variable_ids().len() == component.num_permvars() {
        return Ok(());
    }

    apply_orbital_branching(component, context, num_reductions)?;
    apply_orbital_reduction(component, context, num_reductions)
}

/// Identifies the orbits at which symmetry is broken according to the global
/// bounds, for instance by reductions that were found on the original
/// problem after the symmetry group was computed.
///
/// All members of a broken orbit are recorded so that the stabilizer
/// computation can require them to be mapped onto equal fixed values.
fn identify_symmetries_broken(component: &mut Component, domains: &Domains) {
    calabash_assert_advanced!(
        component
            .permvars
            .iter()
            .enumerate()
            .all(|(varid, &variable)| {
                component.global_lower_bounds[varid] == domains.global_lower_bound(variable)
                    && component.global_upper_bounds[varid] == domains.global_upper_bound(variable)
            }),
        "the cached global bounds must agree with the bound store"
    );

    let partition = OrbitPartition::from_generators(
        component.num_permvars(),
        component.perms.iter().map(|perm| perm.as_slice()),
    );

    let mut broken_variable_ids = Vec::new();
    for orbit in partition.iter_orbits() {
        let first = orbit[0];
        let orbit_broken = orbit[1..].iter().any(|&varid| {
            component.global_lower_bounds[varid] != component.global_lower_bounds[first]
                || component.global_upper_bounds[varid] != component.global_upper_bounds[first]
        });

        if orbit_broken {
            broken_variable_ids.extend_from_slice(orbit);
        }
    }

    if !broken_variable_ids.is_empty() {
        warn!(
            "Symmetry broken before branching started; {} of {} component variables are stabilized.",
            broken_variable_ids.len(),
            component.num_permvars(),
        );
    }

    component.record_broken_variable_ids(broken_variable_ids);
}

/// Where the stabilizer checks read variable bounds from.
#[derive(Clone, Copy, Debug)]
enum BoundSource<'a> {
    /// The bound state replayed along the shadow path.
    Override { lower: &'a [f64], upper: &'a [f64] },
    /// The live bounds of the focus node.
    Live,
}

impl BoundSource<'_> {
    fn lower(&self, component: &Component, domains: &Domains, varid: usize) -> f64 {
        match self {
            BoundSource::Override { lower, .. } => lower[varid],
            BoundSource::Live => domains.lower_bound(component.permvars[varid]),
        }
    }

    fn upper(&self, component: &Component, domains: &Domains, varid: usize) -> f64 {
        match self {
            BoundSource::Override { upper, .. } => upper[varid],
            BoundSource::Live => domains.upper_bound(component.permvars[varid]),
        }
    }
}

/// Computes a generating set, as indices into `component.perms`, for the
/// subgroup of the symmetry group that stabilizes the globally broken orbit
/// assignments and the given branching decisions.
///
/// A permutation qualifies if every branched variable `v` is mapped onto a
/// variable that can never be smaller, which the test
/// `ub(v) <= lb(perm(v))` captures. For the broken orbit indices the bounds
/// must meet with equality: since `lb <= ub` holds everywhere in an orbit, a
/// chain of such equalities forces all members onto the same fixed value.
fn stabilizer_subgroup(
    component: &Component,
    domains: &Domains,
    bounds: BoundSource<'_>,
    branched_variable_ids: &[usize],
) -> Vec<usize> {
    let mut chosen_perms = Vec::new();

    'perms: for (p, perm) in component.perms.iter().enumerate() {
        for &varid in component.broken_variable_ids() {
            let image = perm[varid];

            // A fixed point trivially respects the broken orbit.
            if image == varid {
                continue;
            }

            if bounds.upper(component, domains, varid) != bounds.lower(component, domains, image) {
                continue 'perms;
            }
        }

        for &varid in branched_variable_ids {
            let image = perm[varid];

            if image == varid {
                continue;
            }

            if bounds.upper(component, domains, varid) > bounds.lower(component, domains, image) {
                continue 'perms;
            }
        }

        chosen_perms.push(p);
    }

    chosen_perms
}

/// The orbit partition of the component indices under a set of generators.
///
/// The indices are argsorted by their disjoint-set representative; an orbit
/// is then a maximal run of equal representatives in the sorted sequence.
#[derive(Debug)]
struct OrbitPartition {
    orbit_ids: Vec<usize>,
    sorted_indices: Vec<usize>,
}

impl OrbitPartition {
    fn from_generators<'a>(
        num_permvars: usize,
        generators: impl Iterator<Item = &'a [usize]>,
    ) -> OrbitPartition {
        let mut sets = DisjointSets::new(num_permvars);
        for perm in generators {
            for (i, &image) in perm.iter().enumerate() {
                if i != image {
                    sets.union(i, image);
                }
            }
        }

        let orbit_ids: Vec<usize> = (0..num_permvars).map(|i| sets.find(i)).collect();
        let mut sorted_indices: Vec<usize> = (0..num_permvars).collect();
        sorted_indices.sort_unstable_by_key(|&i| orbit_ids[i]);

        OrbitPartition {
            orbit_ids,
            sorted_indices,
        }
    }

    /// The orbits, each a non-empty group of component indices.
    fn iter_orbits(&self) -> impl Iterator<Item = &'_ [usize]> {
        self.sorted_indices
            .chunk_by(|&a, &b| self.orbit_ids[a] == self.orbit_ids[b])
    }

    /// The orbit containing `varid`.
    fn orbit_of(&self, varid: usize) -> &[usize] {
        let orbit_id = self.orbit_ids[varid];
        self.iter_orbits()
            .find(|orbit| self.orbit_ids[orbit[0]] == orbit_id)
            .expect("every index belongs to exactly one orbit")
    }
}

/// The bound state an orbit intersection operates on. In replay mode every
/// derived bound is mirrored into the working arrays so that subsequent
/// branching steps observe it.
#[derive(Debug)]
enum OrbitBounds<'a> {
    Replay {
        lower: &'a mut [f64],
        upper: &'a mut [f64],
    },
    Live,
}

impl OrbitBounds<'_> {
    fn lower(&self, component: &Component, domains: &Domains, varid: usize) -> f64 {
        match self {
            OrbitBounds::Replay { lower, .. } => lower[varid],
            OrbitBounds::Live => domains.lower_bound(component.permvars[varid]),
        }
    }

    fn upper(&self, component: &Component, domains: &Domains, varid: usize) -> f64 {
        match self {
            OrbitBounds::Replay { upper, .. } => upper[varid],
            OrbitBounds::Live => domains.upper_bound(component.permvars[varid]),
        }
    }
}

/// Intersects the member domains within every orbit of size at least two and
/// tightens every member onto the intersection.
///
/// An empty intersection reports an [`OrbitConflict`]; no bounds of that
/// orbit are written in that case.
fn apply_orbital_reduction_to_orbits(
    component: &Component,
    domains: &mut Domains,
    partition: &OrbitPartition,
    mut bounds: OrbitBounds<'_>,
    num_reductions: &mut u64,
) -> PropagationStatus {
    for orbit in partition.iter_orbits() {
        // Orbits consisting of only one element cannot yield reductions.
        if orbit.len() <= 1 {
            continue;
        }

        let mut orbit_lower = f64::NEG_INFINITY;
        let mut orbit_upper = f64::INFINITY;
        for &varid in orbit {
            orbit_lower = orbit_lower.max(bounds.lower(component, domains, varid));
            orbit_upper = orbit_upper.min(bounds.upper(component, domains, varid));
        }

        if orbit_lower > orbit_upper {
            return Err(OrbitConflict {
                variable: component.permvars[orbit[0]],
                lower_bound: orbit_lower,
                upper_bound: orbit_upper,
            }
            .into());
        }

        for &varid in orbit {
            let variable = component.permvars[varid];

            if let OrbitBounds::Replay { lower, .. } = &mut bounds {
                calabash_assert_moderate!(lower[varid] <= orbit_lower);
                lower[varid] = orbit_lower;
            }
            if domains.lower_bound(variable) < orbit_lower {
                let tightened = domains.tighten_lower_bound(variable, orbit_lower)?;
                calabash_assert_moderate!(tightened);
                *num_reductions += 1;
            }

            if let OrbitBounds::Replay { upper, .. } = &mut bounds {
                calabash_assert_moderate!(upper[varid] >= orbit_upper);
                upper[varid] = orbit_upper;
            }
            if domains.upper_bound(variable) > orbit_upper {
                let tightened = domains.tighten_upper_bound(variable, orbit_upper)?;
                calabash_assert_moderate!(tightened);
                *num_reductions += 1;
            }
        }
    }

    Ok(())
}

/// The orbital branching step: replays the branching history up to the focus
/// node and mimics, for every branching decision of the focus node itself,
/// the constraint that the branching variable dominates its orbit.
///
/// In the binary case this specializes to orbital branching: after the
/// down-branch `x <= 0` every variable in the orbit of `x` is fixed to zero,
/// while in the up-branch `1 = x >= y` is a tautology.
fn apply_orbital_branching(
    component: &mut Component,
    context: &mut PropagationContext<'_>,
    num_reductions: &mut u64,
) -> PropagationStatus {
    let focus_node = context.focus_node;

    // Do nothing if this method has already run for this node.
    if component.last_node == Some(focus_node) {
        return Ok(());
    }
    component.last_node = Some(focus_node);

    let shadow_tree = context.shadow_tree;

    // The root has not been generated by branching decisions.
    if shadow_tree.node(focus_node).parent().is_none() {
        return Ok(());
    }

    let num_permvars = component.num_permvars();

    // Replay the bound state reached just before the focus node, starting
    // from the global bounds that held when branching began.
    let mut lower_bounds = component.global_lower_bounds.clone();
    let mut upper_bounds = component.global_upper_bounds.clone();
    let mut branched_variable_ids: Vec<usize> = Vec::new();
    let mut is_branched = vec![false; num_permvars];

    let rooted_path = shadow_tree.rooted_path(focus_node);
    for &node_id in &rooted_path[..rooted_path.len() - 1] {
        let node = shadow_tree.node(node_id);

        for decision in node.branching_decisions() {
            let Some(&varid) = component.permvar_map.get(&decision.variable) else {
                continue;
            };

            match decision.bound_type {
                BoundType::Lower => {
                    calabash_assert_moderate!(decision.new_bound >= lower_bounds[varid]);
                    lower_bounds[varid] = decision.new_bound;
                }
                BoundType::Upper => {
                    calabash_assert_moderate!(decision.new_bound <= upper_bounds[varid]);
                    upper_bounds[varid] = decision.new_bound;
                }
            }

            if !is_branched[varid] {
                branched_variable_ids.push(varid);
                is_branched[varid] = true;
            }
        }

        for update in node.propagations() {
            let Some(&varid) = component.permvar_map.get(&update.variable) else {
                continue;
            };

            calabash_assert_moderate!(lower_bounds[varid] <= upper_bounds[varid]);
            match update.bound_type {
                BoundType::Lower => {
                    calabash_assert_moderate!(update.new_bound >= lower_bounds[varid]);
                    lower_bounds[varid] = update.new_bound;
                }
                BoundType::Upper => {
                    calabash_assert_moderate!(update.new_bound <= upper_bounds[varid]);
                    upper_bounds[varid] = update.new_bound;
                }
            }
            calabash_assert_moderate!(lower_bounds[varid] <= upper_bounds[varid]);
        }
    }

    // The decisions of the focus node are applied one after the other: the
    // stabilizer just before the decision is computed, the orbit bounds are
    // synchronized, the decision itself is applied, and the domination is
    // propagated.
    for decision in shadow_tree.node(focus_node).branching_decisions() {
        // A decision outside the component has no effect here.
        let Some(&branch_varid) = component.permvar_map.get(&decision.variable) else {
            continue;
        };
        calabash_assert_moderate!(lower_bounds[branch_varid] <= upper_bounds[branch_varid]);

        let chosen_perms = stabilizer_subgroup(
            component,
            context.domains,
            BoundSource::Override {
                lower: &lower_bounds,
                upper: &upper_bounds,
            },
            &branched_variable_ids,
        );

        let partition = OrbitPartition::from_generators(
            num_permvars,
            chosen_perms.iter().map(|&p| component.perms[p].as_slice()),
        );

        // 1. Ensure the bounds are the tightest possible just before the
        // branching step. With complete propagation at the parent this is a
        // no-op, but that cannot be relied upon.
        apply_orbital_reduction_to_orbits(
            component,
            context.domains,
            &partition,
            OrbitBounds::Replay {
                lower: &mut lower_bounds,
                upper: &mut upper_bounds,
            },
            num_reductions,
        )?;

        // 2. Apply the branching step itself; the step above may have made
        // it redundant or infeasible.
        match decision.bound_type {
            BoundType::Lower => {
                if decision.new_bound > upper_bounds[branch_varid] {
                    return Err(Inconsistency::EmptyDomain);
                }
                calabash_assert_moderate!(lower_bounds[branch_varid] <= decision.new_bound);
                lower_bounds[branch_varid] = decision.new_bound;
            }
            BoundType::Upper => {
                if decision.new_bound < lower_bounds[branch_varid] {
                    return Err(Inconsistency::EmptyDomain);
                }
                calabash_assert_moderate!(upper_bounds[branch_varid] >= decision.new_bound);
                upper_bounds[branch_varid] = decision.new_bound;
            }
        }

        // 3. The branching variable is now the extremal member of its orbit:
        // for every other member y, propagating x >= y collapses the upper
        // bound of y onto the upper bound of x. The lower bounds need no
        // update, since the orbit members shared their bounds just before
        // the decision.
        let branch_upper = upper_bounds[branch_varid];
        for &varid in partition.orbit_of(branch_varid) {
            if varid == branch_varid {
                continue;
            }

            calabash_assert_moderate!(upper_bounds[varid] >= branch_upper);
            calabash_assert_moderate!(lower_bounds[varid] <= lower_bounds[branch_varid]);
            upper_bounds[varid] = branch_upper;

            let variable = component.permvars[varid];
            if context.domains.upper_bound(variable) > branch_upper {
                let tightened = context.domains.tighten_upper_bound(variable, branch_upper)?;
                calabash_assert_moderate!(tightened);
                *num_reductions += 1;
            }
        }

        // The next decision at this node sees this variable as branched.
        if !is_branched[branch_varid] {
            branched_variable_ids.push(branch_varid);
            is_branched[branch_varid] = true;
        }
    }

    Ok(())
}

/// The orbital reduction step: computes the stabilizer of all branching
/// decisions on the path from the root up to and including the focus node,
/// and intersects the variable domains within each of its orbits.
fn apply_orbital_reduction(
    component: &Component,
    context: &mut PropagationContext<'_>,
    num_reductions: &mut u64,
) -> PropagationStatus {
    let shadow_tree = context.shadow_tree;

    let mut branched_variable_ids: Vec<usize> = Vec::new();
    let mut is_branched = vec![false; component.num_permvars()];
    let mut node = Some(context.focus_node);
    while let Some(node_id) = node {
        let shadow_node = shadow_tree.node(node_id);
        for decision in shadow_node.branching_decisions() {
            let Some(&varid) = component.permvar_map.get(&decision.variable) else {
                continue;
            };
            if !is_branched[varid] {
                branched_variable_ids.push(varid);
                is_branched[varid] = true;
            }
        }
        node = shadow_node.parent();
    }

    let chosen_perms = stabilizer_subgroup(
        component,
        context.domains,
        BoundSource::Live,
        &branched_variable_ids,
    );

    // The trivial subgroup cannot yield reductions.
    if chosen_perms.is_empty() {
        return Ok(());
    }

    let partition = OrbitPartition::from_generators(
        component.num_permvars(),
        chosen_perms.iter().map(|&p| component.perms[p].as_slice()),
    );

    apply_orbital_reduction_to_orbits(
        component,
        context.domains,
        &partition,
        OrbitBounds::Live,
        num_reductions,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::basic_types::BoundType;
    use crate::engine::test_solver::TestSolver;

    /// Generators of the full symmetric group on three indices.
    fn symmetric_group_3() -> Vec<Vec<usize>> {
        vec![vec![1, 0, 2], vec![0, 2, 1]]
    }

    #[test]
    fn down_branch_fixes_the_orbit_of_the_branching_variable() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 1.0);
        let x1 = solver.new_variable(0.0, 1.0);
        let x2 = solver.new_variable(0.0, 1.0);

        // A single generator swapping x0 and x1, fixing x2.
        solver
            .add_component(&[x0, x1, x2], &[vec![1, 0, 2]])
            .expect("the component moves x0 and x1");

        let down = solver.branch_upper(solver.root(), x0, 0.0);
        let num_reductions = solver.propagate_at(down).expect("feasible");

        assert_eq!(num_reductions, 1);
        solver.assert_bounds(x1, 0.0, 0.0);
        solver.assert_bounds(x2, 0.0, 1.0);
    }

    #[test]
    fn up_branch_yields_no_reduction() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 1.0);
        let x1 = solver.new_variable(0.0, 1.0);
        let x2 = solver.new_variable(0.0, 1.0);

        solver
            .add_component(&[x0, x1, x2], &[vec![1, 0, 2]])
            .expect("the component moves x0 and x1");

        // In the up-branch the domination `1 = x0 >= x1` is a tautology.
        let up = solver.branch_lower(solver.root(), x0, 1.0);
        let num_reductions = solver.propagate_at(up).expect("feasible");

        assert_eq!(num_reductions, 0);
        solver.assert_bounds(x1, 0.0, 1.0);
    }

    #[test]
    fn equal_domains_yield_no_information_to_intersect() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 5.0);
        let x1 = solver.new_variable(0.0, 5.0);
        let x2 = solver.new_variable(0.0, 5.0);

        solver
            .add_component(&[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");

        // No branching decisions yet: the single orbit {x0, x1, x2} is
        // found, but all domains already equal their intersection.
        let num_reductions = solver.propagate_at(solver.root()).expect("feasible");

        assert_eq!(num_reductions, 0);
        solver.assert_bounds(x0, 0.0, 5.0);
        solver.assert_bounds(x1, 0.0, 5.0);
        solver.assert_bounds(x2, 0.0, 5.0);
    }

    #[test]
    fn globally_broken_symmetry_disables_the_component() {
        let mut solver = TestSolver::default();
        // Asymmetric global bounds: the orbit {x0, x1} is broken before any
        // branching happens.
        let x0 = solver.new_variable(0.0, 0.0);
        let x1 = solver.new_variable(0.0, 1.0);

        solver
            .add_component(&[x0, x1], &[vec![1, 0]])
            .expect("the component moves both variables");

        let child = solver.branch_upper(solver.root(), x1, 0.0);
        let num_reductions = solver.propagate_at(child).expect("never infeasible");

        assert_eq!(num_reductions, 0);
        solver.assert_bounds(x0, 0.0, 0.0);

        // Later rounds stay no-ops as well.
        let grandchild = solver.branch_lower(child, x1, 0.0);
        assert_eq!(solver.propagate_at(grandchild).expect("feasible"), 0);
    }

    #[test]
    fn disjoint_orbit_domains_are_infeasible() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 10.0);
        let x1 = solver.new_variable(0.0, 10.0);
        // A variable outside the component to branch on.
        let y = solver.new_variable(0.0, 1.0);

        solver
            .add_component(&[x0, x1], &[vec![1, 0]])
            .expect("the component moves both variables");

        let child = solver.branch_lower(solver.root(), y, 1.0);
        // Simulate propagation elsewhere separating the two domains.
        solver.apply_propagation(child, x0, BoundType::Lower, 3.0);
        solver.apply_propagation(child, x0, BoundType::Upper, 5.0);
        solver.apply_propagation(child, x1, BoundType::Lower, 6.0);
        solver.apply_propagation(child, x1, BoundType::Upper, 8.0);

        let result = solver.propagate_at(child);

        match result {
            Err(Inconsistency::Conflict(conflict)) => {
                assert_eq!(conflict.lower_bound, 6.0);
                assert_eq!(conflict.upper_bound, 5.0);
            }
            other => panic!("expected an orbit conflict, got {other:?}"),
        }

        // No partial writes beyond the detected conflict.
        solver.assert_bounds(x0, 3.0, 5.0);
        solver.assert_bounds(x1, 6.0, 8.0);
    }

    #[test]
    fn reduction_is_idempotent_at_a_fixed_node() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 5.0);
        let x1 = solver.new_variable(0.0, 5.0);
        let x2 = solver.new_variable(0.0, 5.0);

        solver
            .add_component(&[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");

        let child = solver.branch_upper(solver.root(), x0, 3.0);

        // The domination collapses the upper bounds of x1 and x2 onto 3.
        assert_eq!(solver.propagate_at(child).expect("feasible"), 2);
        solver.assert_bounds(x1, 0.0, 3.0);
        solver.assert_bounds(x2, 0.0, 3.0);

        // A second round at the same node finds nothing new.
        assert_eq!(solver.propagate_at(child).expect("feasible"), 0);
    }

    #[test]
    fn domination_holds_after_a_down_branch() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 5.0);
        let x1 = solver.new_variable(0.0, 5.0);
        let x2 = solver.new_variable(0.0, 5.0);

        solver
            .add_component(&[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");

        let child = solver.branch_upper(solver.root(), x1, 2.0);
        let _ = solver.propagate_at(child).expect("feasible");

        // Every variable in the pre-branch orbit of x1 obeys ub(y) <= ub(x1).
        assert!(solver.domains.upper_bound(x0) <= solver.domains.upper_bound(x1));
        assert!(solver.domains.upper_bound(x2) <= solver.domains.upper_bound(x1));
        solver.assert_bounds(x0, 0.0, 2.0);
        solver.assert_bounds(x2, 0.0, 2.0);
    }

    #[test]
    fn replay_covers_decisions_and_propagations_of_ancestors() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 5.0);
        let x1 = solver.new_variable(0.0, 5.0);
        let x2 = solver.new_variable(0.0, 5.0);

        solver
            .add_component(&[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");

        let child = solver.branch_upper(solver.root(), x0, 3.0);
        assert_eq!(solver.propagate_at(child).expect("feasible"), 2);

        // Branch deeper on x1; the stabilizer of x0 still swaps x1 and x2,
        // so the down-branch propagates onto x2 through the replayed state.
        let grandchild = solver.branch_upper(child, x1, 1.0);
        assert_eq!(solver.propagate_at(grandchild).expect("feasible"), 1);
        solver.assert_bounds(x2, 0.0, 1.0);
    }

    #[test]
    fn probing_and_repropagation_are_no_ops() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 1.0);
        let x1 = solver.new_variable(0.0, 1.0);

        solver
            .add_component(&[x0, x1], &[vec![1, 0]])
            .expect("the component moves both variables");

        let down = solver.branch_upper(solver.root(), x0, 0.0);

        let context =
            PropagationContext::new(&mut solver.domains, &solver.shadow_tree, down).with_probing();
        assert_eq!(
            solver.orbital_reduction.propagate(context).expect("no-op"),
            0
        );

        let context = PropagationContext::new(&mut solver.domains, &solver.shadow_tree, down)
            .with_repropagation();
        assert_eq!(
            solver.orbital_reduction.propagate(context).expect("no-op"),
            0
        );

        // The bound of x1 is untouched by both rounds.
        solver.assert_bounds(x1, 0.0, 1.0);
    }

    #[test]
    fn propagation_without_components_is_a_no_op() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 1.0);

        let down = solver.branch_upper(solver.root(), x0, 0.0);
        assert_eq!(solver.propagate_at(down).expect("no-op"), 0);
    }

    #[test]
    fn statistics_accumulate_across_rounds_and_conflicts() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 5.0);
        let x1 = solver.new_variable(0.0, 5.0);
        let x2 = solver.new_variable(0.0, 5.0);

        solver
            .add_component(&[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");

        let child = solver.branch_upper(solver.root(), x0, 3.0);
        assert_eq!(solver.propagate_at(child).expect("feasible"), 2);
        assert_eq!(
            solver.orbital_reduction.statistics().number_of_reductions,
            2
        );

        // Force a conflict one level deeper by separating the domains of x1
        // and x2, which share an orbit in the stabilizer of x0.
        let grandchild = solver.branch_lower(child, x0, 3.0);
        solver.apply_propagation(grandchild, x1, BoundType::Upper, 1.0);
        solver.apply_propagation(grandchild, x2, BoundType::Lower, 2.0);

        assert!(solver.propagate_at(grandchild).is_err());
        assert_eq!(solver.orbital_reduction.statistics().number_of_conflicts, 1);
        // The reductions found before the conflict are still recorded.
        assert_eq!(
            solver.orbital_reduction.statistics().number_of_reductions,
            2
        );
    }

    #[test]
    fn reset_removes_all_components() {
        let mut solver = TestSolver::default();
        let x0 = solver.new_variable(0.0, 1.0);
        let x1 = solver.new_variable(0.0, 1.0);

        solver
            .add_component(&[x0, x1], &[vec![1, 0]])
            .expect("the component moves both variables");
        assert_eq!(solver.orbital_reduction.num_components(), 1);

        solver.orbital_reduction.reset();
        assert_eq!(solver.orbital_reduction.num_components(), 0);

        // Propagation after the reset is a no-op.
        let down = solver.branch_upper(solver.root(), x0, 0.0);
        assert_eq!(solver.propagate_at(down).expect("no-op"), 0);
        solver.assert_bounds(x1, 0.0, 1.0);
    }

    #[test]
    fn stabilizer_shrinks_with_additional_branched_variables() {
        let mut domains = Domains::default();
        let x0 = domains.new_variable(0.0, 1.0);
        let x1 = domains.new_variable(0.0, 1.0);
        let x2 = domains.new_variable(0.0, 1.0);

        let mut component = Component::new(&domains, &[x0, x1, x2], &symmetric_group_3())
            .expect("the component moves all variables");
        component.record_broken_variable_ids(Vec::new());

        // Fix a bound state in which x0 is branched down and x1 is free.
        let lower = vec![0.0, 0.0, 0.0];
        let upper = vec![0.0, 1.0, 1.0];
        let bounds = BoundSource::Override {
            lower: &lower,
            upper: &upper,
        };

        let with_one = stabilizer_subgroup(&component, &domains, bounds, &[0]);
        let with_two = stabilizer_subgroup(&component, &domains, bounds, &[0, 1]);

        // Every generator surviving the larger branching set also survives
        // the smaller one.
        assert!(with_two.iter().all(|p| with_one.contains(p)));
    }
}
