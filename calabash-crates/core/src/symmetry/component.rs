use crate::basic_types::ComponentOperationError;
use crate::calabash_assert_eq_moderate;
use crate::calabash_assert_extreme;
use crate::calabash_assert_simple;
use crate::containers::HashMap;
use crate::engine::Domains;
use crate::engine::ShadowNodeId;
use crate::engine::VariableId;
use crate::engine::notifications::BoundChangeType;
use crate::engine::notifications::ScopedBoundSubscription;

/// Whether the orbits that are already asymmetric in the global bounds have
/// been identified for a component.
#[derive(Clone, Debug)]
pub(crate) enum SymmetryBrokenStatus {
    Unevaluated,
    Evaluated { broken_variable_ids: Vec<usize> },
}

/// One symmetry component: a set of permutations acting on the variables
/// they move. The variable sequence is deduplicated and re-indexed so that
/// every index is moved by at least one permutation.
///
/// The component caches the global bounds of its variables; the cache is
/// kept current through a scoped subscription until branching starts, after
/// which it describes the bound state from which the branching history is
/// replayed.
#[derive(Debug)]
pub(crate) struct Component {
    /// The variables moved by the component, in first-occurrence order.
    pub(crate) permvars: Vec<VariableId>,
    /// The permutations, re-indexed to `0..permvars.len()`.
    pub(crate) perms: Vec<Vec<usize>>,
    /// Maps each variable in `permvars` to its index.
    pub(crate) permvar_map: HashMap<VariableId, usize>,
    /// Global lower bounds, frozen once branching starts.
    pub(crate) global_lower_bounds: Vec<f64>,
    /// Global upper bounds, frozen once branching starts.
    pub(crate) global_upper_bounds: Vec<f64>,
    /// The last node at which orbital branching ran for this component.
    pub(crate) last_node: Option<ShadowNodeId>,
    symmetry_status: SymmetryBrokenStatus,
    subscription: ScopedBoundSubscription,
}

impl Component {
    /// Builds a component from permutations over the full `permvars`
    /// sequence. Indices fixed by every permutation are dropped and the
    /// permutations are re-indexed accordingly.
    pub(crate) fn new(
        domains: &Domains,
        permvars: &[VariableId],
        perms: &[Vec<usize>],
    ) -> Result<Component, ComponentOperationError> {
        if perms.is_empty() {
            return Err(ComponentOperationError::NoPermutations);
        }

        let full_len = permvars.len();
        for perm in perms {
            calabash_assert_simple!(
                perm.len() == full_len,
                "every permutation must cover the full variable sequence"
            );
        }

        // Which indices are moved by at least one permutation?
        let mut is_moved = vec![false; full_len];
        for perm in perms {
            for (i, &image) in perm.iter().enumerate() {
                calabash_assert_simple!(image < full_len);
                if image != i {
                    is_moved[i] = true;
                }
            }
        }

        // Re-index, dropping the fixed points.
        let mut reduced_index = vec![usize::MAX; full_len];
        let mut reduced_permvars = Vec::new();
        let mut permvar_map: HashMap<VariableId, usize> = HashMap::default();
        for (i, &variable) in permvars.iter().enumerate() {
            if !is_moved[i] {
                continue;
            }
            reduced_index[i] = reduced_permvars.len();
            let previous = permvar_map.insert(variable, reduced_permvars.len());
            calabash_assert_simple!(
                previous.is_none(),
                "the variables of a component must be unique"
            );
            reduced_permvars.push(variable);
        }

        if reduced_permvars.is_empty() {
            return Err(ComponentOperationError::FixedComponent);
        }

        let reduced_perms: Vec<Vec<usize>> = perms
            .iter()
            .map(|perm| {
                let mut reduced_perm = vec![0; reduced_permvars.len()];
                for (i, &image) in perm.iter().enumerate() {
                    if reduced_index[i] == usize::MAX {
                        continue;
                    }
                    // The image of a moved index is itself moved.
                    calabash_assert_simple!(reduced_index[image] != usize::MAX);
                    reduced_perm[reduced_index[i]] = reduced_index[image];
                }
                reduced_perm
            })
            .collect();

        calabash_assert_extreme!(
            reduced_perms.iter().all(|perm| {
                let mut seen = vec![false; perm.len()];
                perm.iter()
                    .all(|&image| !std::mem::replace(&mut seen[image], true))
            }),
            "every generator must be a bijection"
        );

        let global_lower_bounds = reduced_permvars
            .iter()
            .map(|&variable| domains.global_lower_bound(variable))
            .collect();
        let global_upper_bounds = reduced_permvars
            .iter()
            .map(|&variable| domains.global_upper_bound(variable))
            .collect();

        let subscription = domains.subscribe_to_global_bound_changes(
            reduced_permvars.iter().copied(),
            BoundChangeType::LowerBound | BoundChangeType::UpperBound,
        );

        Ok(Component {
            permvars: reduced_permvars,
            perms: reduced_perms,
            permvar_map,
            global_lower_bounds,
            global_upper_bounds,
            last_node: None,
            symmetry_status: SymmetryBrokenStatus::Unevaluated,
            subscription,
        })
    }

    pub(crate) fn num_permvars(&self) -> usize {
        self.permvars.len()
    }

    pub(crate) fn num_perms(&self) -> usize {
        self.perms.len()
    }

    pub(crate) fn is_symmetry_evaluated(&self) -> bool {
        matches!(self.symmetry_status, SymmetryBrokenStatus::Evaluated { .. })
    }

    /// Transitions `Unevaluated -> Evaluated`; the transition happens at
    /// most once per component.
    pub(crate) fn record_broken_variable_ids(&mut self, broken_variable_ids: Vec<usize>) {
        calabash_assert_simple!(
            !self.is_symmetry_evaluated(),
            "the broken orbits are identified at most once"
        );
        self.symmetry_status = SymmetryBrokenStatus::Evaluated {
            broken_variable_ids,
        };
    }

    /// The indices whose orbit had inconsistent global bounds. Only
    /// available after the evaluation.
    pub(crate) fn broken_variable_ids(&self) -> &[usize] {
        match &self.symmetry_status {
            SymmetryBrokenStatus::Unevaluated => {
                unreachable!("queried before the broken orbits were identified")
            }
            SymmetryBrokenStatus::Evaluated {
                broken_variable_ids,
            } => broken_variable_ids,
        }
    }

    /// Applies the global bound changes published since the last propagation
    /// round to the cached global bounds.
    pub(crate) fn update_global_bound_cache(&mut self) {
        for event in self.subscription.drain() {
            calabash_assert_simple!(
                !self.is_symmetry_evaluated(),
                "global bounds may not change once the broken orbits are identified"
            );
            let index = self.permvar_map[&event.variable];
            match event.bound {
                BoundChangeType::LowerBound => {
                    calabash_assert_eq_moderate!(self.global_lower_bounds[index], event.old_bound);
                    self.global_lower_bounds[index] = event.new_bound;
                }
                BoundChangeType::UpperBound => {
                    calabash_assert_eq_moderate!(self.global_upper_bounds[index], event.old_bound);
                    self.global_upper_bounds[index] = event.new_bound;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_points_are_dropped_and_permutations_re_indexed() {
        let mut domains = Domains::default();
        let x0 = domains.new_variable(0.0, 1.0);
        let x1 = domains.new_variable(0.0, 2.0);
        let x2 = domains.new_variable(0.0, 3.0);
        let x3 = domains.new_variable(0.0, 4.0);

        // x1 is fixed by the single generator which swaps x0 and x3 and
        // leaves x2 in place as well.
        let component = Component::new(&domains, &[x0, x1, x2, x3], &[vec![3, 1, 2, 0]])
            .expect("the component moves x0 and x3");

        assert_eq!(component.permvars, vec![x0, x3]);
        assert_eq!(component.perms, vec![vec![1, 0]]);
        assert_eq!(component.permvar_map[&x0], 0);
        assert_eq!(component.permvar_map[&x3], 1);
        assert_eq!(component.global_upper_bounds, vec![1.0, 4.0]);
    }

    #[test]
    fn a_component_without_permutations_is_rejected() {
        let mut domains = Domains::default();
        let x0 = domains.new_variable(0.0, 1.0);

        assert_eq!(
            Component::new(&domains, &[x0], &[]).err(),
            Some(ComponentOperationError::NoPermutations)
        );
    }

    #[test]
    fn a_component_moving_no_variable_is_rejected() {
        let mut domains = Domains::default();
        let x0 = domains.new_variable(0.0, 1.0);
        let x1 = domains.new_variable(0.0, 1.0);

        assert_eq!(
            Component::new(&domains, &[x0, x1], &[vec![0, 1]]).err(),
            Some(ComponentOperationError::FixedComponent)
        );
    }

    #[test]
    fn global_bound_events_update_the_cache() {
        let mut domains = Domains::default();
        let x0 = domains.new_variable(0.0, 1.0);
        let x1 = domains.new_variable(0.0, 1.0);

        let mut component =
            Component::new(&domains, &[x0, x1], &[vec![1, 0]]).expect("a valid component");

        domains.set_global_upper_bound(x1, 0.5);
        component.update_global_bound_cache();

        assert_eq!(component.global_upper_bounds, vec![1.0, 0.5]);
    }
}
