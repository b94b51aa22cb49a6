use crate::engine::Domains;
use crate::engine::ShadowNodeId;
use crate::engine::ShadowTree;

/// Everything the orbital reduction propagator consumes from the surrounding
/// search for one propagation round: the bound store, the shadow tree, the
/// focus node, and the flags describing the state of the search.
#[derive(Debug)]
pub struct PropagationContext<'a> {
    pub(crate) domains: &'a mut Domains,
    pub(crate) shadow_tree: &'a ShadowTree,
    pub(crate) focus_node: ShadowNodeId,
    pub(crate) is_probing: bool,
    pub(crate) is_repropagating: bool,
}

impl<'a> PropagationContext<'a> {
    pub fn new(
        domains: &'a mut Domains,
        shadow_tree: &'a ShadowTree,
        focus_node: ShadowNodeId,
    ) -> Self {
        PropagationContext {
            domains,
            shadow_tree,
            focus_node,
            is_probing: false,
            is_repropagating: false,
        }
    }

    /// Marks the search as being in a probing (speculative, rolled-back)
    /// state; propagation is skipped there.
    pub fn with_probing(mut self) -> Self {
        self.is_probing = true;
        self
    }

    /// Marks this round as a repropagation pass; the path to the root may
    /// have changed, so propagation is skipped.
    pub fn with_repropagation(mut self) -> Self {
        self.is_repropagating = true;
        self
    }
}
