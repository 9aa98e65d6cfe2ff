//! Undirected links between nodes.
//!
//! Links are stored as mirrored neighbor entries on both endpoints (see
//! [`PowerNode`](crate::node::PowerNode)); [`Edge`] is the normalized value
//! form handed out by queries.

use gridwork_core::id::NodeId;
use serde::{Deserialize, Serialize};

/// An unordered pair of distinct nodes. `Edge::new(a, b) == Edge::new(b, a)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Edge {
    low: NodeId,
    high: NodeId,
}

impl Edge {
    /// Build the normalized pair. Returns `None` for a self-link.
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Self { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Self { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.low, self.high)
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.low == node || self.high == node
    }

    /// The endpoint opposite `node`, if `node` is on this edge.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.low {
            Some(self.high)
        } else if node == self.high {
            Some(self.low)
        } else {
            None
        }
    }
}
