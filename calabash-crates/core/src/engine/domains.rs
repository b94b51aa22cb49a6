use enumset::EnumSet;

use crate::basic_types::BoundType;
use crate::basic_types::BoundUpdate;
use crate::calabash_assert_moderate;
use crate::calabash_assert_simple;
use crate::containers::KeyedVec;
use crate::engine::VariableId;
use crate::engine::notifications::BoundChangeType;
use crate::engine::notifications::GlobalBoundChange;
use crate::engine::notifications::GlobalBoundSubscriptions;
use crate::engine::notifications::ScopedBoundSubscription;

/// Signals that a bound tightening would make a variable domain empty.
#[derive(Clone, Copy, Debug)]
pub struct EmptyDomain;

/// The stage of the surrounding branch-and-bound search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SearchStage {
    /// Presolving and root processing; global bounds may still change, and
    /// every change is published to the subscribers.
    #[default]
    PreBranching,
    /// Branching has started. Global bound changes are no longer published:
    /// subscribers reason from the bounds that held when branching began.
    Branching,
}

#[derive(Clone, Copy, Debug)]
struct VariableDomain {
    lower_bound: f64,
    upper_bound: f64,
    global_lower_bound: f64,
    global_upper_bound: f64,
}

/// The variable bound store of the solver.
///
/// Every variable has a local bound pair, valid at the node the search is
/// currently processing, and a global bound pair that is only updated before
/// branching starts. Local tightenings report [`EmptyDomain`] instead of
/// writing an inconsistent bound, and are logged so that the search can
/// record them in the shadow tree.
#[derive(Debug, Default)]
pub struct Domains {
    domains: KeyedVec<VariableId, VariableDomain>,
    stage: SearchStage,
    subscriptions: GlobalBoundSubscriptions,
    bound_change_log: Vec<BoundUpdate>,
}

impl Domains {
    pub fn new_variable(&mut self, lower_bound: f64, upper_bound: f64) -> VariableId {
        calabash_assert_simple!(lower_bound <= upper_bound);

        self.domains.push(VariableDomain {
            lower_bound,
            upper_bound,
            global_lower_bound: lower_bound,
            global_upper_bound: upper_bound,
        })
    }

    pub fn num_variables(&self) -> usize {
        self.domains.len()
    }

    pub fn stage(&self) -> SearchStage {
        self.stage
    }

    /// Freezes the global bounds; to be called by the search when it creates
    /// the first child of the root.
    pub fn begin_branching(&mut self) {
        self.stage = SearchStage::Branching;
    }

    pub fn lower_bound(&self, variable: VariableId) -> f64 {
        self.domains[variable].lower_bound
    }

    pub fn upper_bound(&self, variable: VariableId) -> f64 {
        self.domains[variable].upper_bound
    }

    pub fn global_lower_bound(&self, variable: VariableId) -> f64 {
        self.domains[variable].global_lower_bound
    }

    pub fn global_upper_bound(&self, variable: VariableId) -> f64 {
        self.domains[variable].global_upper_bound
    }

    /// Tightens the local lower bound of `variable` to `new_bound`.
    ///
    /// Returns whether the bound was strictly improved, or [`EmptyDomain`]
    /// if the new bound lies above the upper bound. In that case the domain
    /// is left untouched.
    pub fn tighten_lower_bound(
        &mut self,
        variable: VariableId,
        new_bound: f64,
    ) -> Result<bool, EmptyDomain> {
        let domain = &mut self.domains[variable];

        if new_bound > domain.upper_bound {
            return Err(EmptyDomain);
        }
        if new_bound <= domain.lower_bound {
            return Ok(false);
        }

        domain.lower_bound = new_bound;
        self.bound_change_log.push(BoundUpdate {
            variable,
            bound_type: BoundType::Lower,
            new_bound,
        });
        Ok(true)
    }

    /// Tightens the local upper bound of `variable` to `new_bound`.
    ///
    /// See [`Domains::tighten_lower_bound`].
    pub fn tighten_upper_bound(
        &mut self,
        variable: VariableId,
        new_bound: f64,
    ) -> Result<bool, EmptyDomain> {
        let domain = &mut self.domains[variable];

        if new_bound < domain.lower_bound {
            return Err(EmptyDomain);
        }
        if new_bound >= domain.upper_bound {
            return Ok(false);
        }

        domain.upper_bound = new_bound;
        self.bound_change_log.push(BoundUpdate {
            variable,
            bound_type: BoundType::Upper,
            new_bound,
        });
        Ok(true)
    }

    /// Tightens the global lower bound of `variable`, updating the local
    /// bound along with it.
    ///
    /// Before branching starts the change is published to the subscribers;
    /// afterwards the published caches stay frozen.
    pub fn set_global_lower_bound(&mut self, variable: VariableId, new_bound: f64) {
        let domain = &mut self.domains[variable];
        let old_bound = domain.global_lower_bound;

        if new_bound == old_bound {
            return;
        }
        calabash_assert_moderate!(new_bound <= domain.global_upper_bound);

        domain.global_lower_bound = new_bound;
        domain.lower_bound = domain.lower_bound.max(new_bound);

        if self.stage == SearchStage::PreBranching {
            self.subscriptions.publish(GlobalBoundChange {
                variable,
                bound: BoundChangeType::LowerBound,
                old_bound,
                new_bound,
            });
        }
    }

    /// Tightens the global upper bound of `variable`.
    ///
    /// See [`Domains::set_global_lower_bound`].
    pub fn set_global_upper_bound(&mut self, variable: VariableId, new_bound: f64) {
        let domain = &mut self.domains[variable];
        let old_bound = domain.global_upper_bound;

        if new_bound == old_bound {
            return;
        }
        calabash_assert_moderate!(new_bound >= domain.global_lower_bound);

        domain.global_upper_bound = new_bound;
        domain.upper_bound = domain.upper_bound.min(new_bound);

        if self.stage == SearchStage::PreBranching {
            self.subscriptions.publish(GlobalBoundChange {
                variable,
                bound: BoundChangeType::UpperBound,
                old_bound,
                new_bound,
            });
        }
    }

    /// Registers for global bound changes of the given variables.
    pub fn subscribe_to_global_bound_changes(
        &self,
        variables: impl IntoIterator<Item = VariableId>,
        events: EnumSet<BoundChangeType>,
    ) -> ScopedBoundSubscription {
        self.subscriptions.subscribe(variables, events)
    }

    /// Removes and returns the local tightenings applied since the last
    /// drain, in application order. The search uses this to record
    /// propagations in the shadow tree.
    pub fn drain_bound_changes(&mut self) -> Vec<BoundUpdate> {
        std::mem::take(&mut self.bound_change_log)
    }
}
