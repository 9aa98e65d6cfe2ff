//! The set of live, participating nodes.

use std::collections::BTreeSet;

use gridwork_core::id::NodeId;

/// Tracks which nodes take part in connectivity and modifier broadcasts.
///
/// Membership only changes through [`register`](Self::register) and
/// [`unregister`](Self::unregister); both are idempotent.
#[derive(Debug, Clone, Default)]
pub struct NodeRegistry {
    members: BTreeSet<NodeId>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `node`. Returns `false` if it was already registered.
    pub fn register(&mut self, node: NodeId) -> bool {
        self.members.insert(node)
    }

    /// Remove `node`. Returns `false` if it was not registered.
    pub fn unregister(&mut self, node: NodeId) -> bool {
        self.members.remove(&node)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Owned snapshot of the current members, in key order. Safe to walk
    /// while the arena or the registry itself is being mutated.
    pub fn all(&self) -> Vec<NodeId> {
        self.members.iter().copied().collect()
    }

    /// Borrowing iterator for read-only passes.
    pub fn iter(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.iter().copied()
    }
}
