//! A shadow replica of the branch-and-bound tree.
//!
//! The shadow tree records, for every node, the branching decisions that
//! created it and the propagations applied while it was processed. The
//! orbital reduction propagator replays this history to reconstruct the
//! bound state along the path from the root to a node; the live search tree
//! itself is never walked.

use crate::basic_types::BoundUpdate;
use crate::calabash_assert_simple;
use crate::containers::KeyedVec;
use crate::containers::StorageKey;

/// Identifies a node of the shadow tree.
#[derive(Clone, PartialEq, Eq, Copy, Hash)]
pub struct ShadowNodeId {
    pub id: u32,
}

impl StorageKey for ShadowNodeId {
    fn index(&self) -> usize {
        self.id as usize
    }

    fn create_from_index(index: usize) -> Self {
        ShadowNodeId { id: index as u32 }
    }
}

impl std::fmt::Debug for ShadowNodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node{}", self.id)
    }
}

/// A single node of the shadow tree.
#[derive(Clone, Debug, Default)]
pub struct ShadowNode {
    parent: Option<ShadowNodeId>,
    propagations: Vec<BoundUpdate>,
    branching_decisions: Vec<BoundUpdate>,
}

impl ShadowNode {
    /// The parent of this node, or [`None`] for the root.
    pub fn parent(&self) -> Option<ShadowNodeId> {
        self.parent
    }

    /// The tightenings applied while this node was processed, in
    /// chronological order. Branching decisions are not part of this list.
    pub fn propagations(&self) -> &[BoundUpdate] {
        &self.propagations
    }

    /// The branching decisions that created this node from its parent, in
    /// the order in which they were applied.
    pub fn branching_decisions(&self) -> &[BoundUpdate] {
        &self.branching_decisions
    }
}

/// The arena holding all shadow nodes. Nodes are only ever added; the shadow
/// tree outlives the nodes of the live tree it mirrors.
#[derive(Clone, Debug, Default)]
pub struct ShadowTree {
    nodes: KeyedVec<ShadowNodeId, ShadowNode>,
}

impl ShadowTree {
    /// Creates the root node; to be called exactly once, before any child is
    /// added.
    pub fn add_root(&mut self) -> ShadowNodeId {
        calabash_assert_simple!(self.nodes.is_empty());

        self.nodes.push(ShadowNode::default())
    }

    pub fn add_child(&mut self, parent: ShadowNodeId) -> ShadowNodeId {
        self.nodes.push(ShadowNode {
            parent: Some(parent),
            ..ShadowNode::default()
        })
    }

    pub fn node(&self, node: ShadowNodeId) -> &ShadowNode {
        &self.nodes[node]
    }

    pub fn record_propagation(&mut self, node: ShadowNodeId, update: BoundUpdate) {
        self.nodes[node].propagations.push(update);
    }

    pub fn record_branching_decision(&mut self, node: ShadowNodeId, update: BoundUpdate) {
        self.nodes[node].branching_decisions.push(update);
    }

    /// The path from the root to `node`, both inclusive, starting at the
    /// root. Takes time linear in the depth of the node.
    pub fn rooted_path(&self, node: ShadowNodeId) -> Vec<ShadowNodeId> {
        let mut path = vec![node];
        let mut current = node;
        while let Some(parent) = self.nodes[current].parent {
            path.push(parent);
            current = parent;
        }
        path.reverse();
        path
    }
}
