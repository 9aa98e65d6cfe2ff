//! Reachability and aggregate production from the consumer root.
//!
//! The engine walks the link graph breadth-first from a single root node,
//! marks every reached node powered and every other registered node
//! unpowered, and sums production over the reached set. Cycles and
//! disconnected islands are ordinary inputs.

use std::collections::VecDeque;

use gridwork_core::fixed::{FIXED_ZERO, Fixed64};
use gridwork_core::id::NodeId;
use slotmap::{SecondaryMap, SlotMap};
use tracing::debug;

use crate::node::{Neighbors, PowerNode};
use crate::registry::NodeRegistry;

/// Outcome of a [`ConnectivityEngine::recompute`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectivityReport {
    pub total_production: Fixed64,
    /// Number of nodes reached from the root (the root included).
    pub powered_nodes: usize,
    /// Nodes that were unpowered before this pass and are powered now.
    pub newly_powered: Vec<NodeId>,
    /// Nodes that were powered before this pass and are unpowered now.
    pub newly_unpowered: Vec<NodeId>,
}

impl ConnectivityReport {
    /// Whether any powered flag flipped.
    pub fn changed(&self) -> bool {
        !self.newly_powered.is_empty() || !self.newly_unpowered.is_empty()
    }
}

/// Computes which nodes are connected to the root and how much they produce.
#[derive(Debug, Clone, Default)]
pub struct ConnectivityEngine {
    root: Option<NodeId>,
    /// Reached set from the last pass.
    powered: Vec<NodeId>,
    total_production: Fixed64,
}

impl ConnectivityEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Designate the root. Takes effect on the next [`recompute`](Self::recompute).
    pub fn set_root(&mut self, root: Option<NodeId>) {
        self.root = root;
    }

    /// Total production of the powered set as of the last pass or refresh.
    pub fn total_production(&self) -> Fixed64 {
        self.total_production
    }

    /// Nodes reached by the last pass.
    pub fn powered(&self) -> &[NodeId] {
        &self.powered
    }

    /// Recompute reachability and total production.
    ///
    /// Only nodes that are live in `nodes` and present in `registry` are
    /// traversed. A missing or unregistered root powers nothing.
    pub fn recompute(
        &mut self,
        nodes: &mut SlotMap<NodeId, PowerNode>,
        registry: &NodeRegistry,
    ) -> ConnectivityReport {
        let visited = self.traverse(nodes, registry);

        let mut report = ConnectivityReport::default();
        for id in registry.iter() {
            let Some(node) = nodes.get_mut(id) else {
                continue;
            };
            let reached = visited.contains_key(id);
            if node.powered() != reached {
                node.set_powered(reached);
                if reached {
                    report.newly_powered.push(id);
                } else {
                    report.newly_unpowered.push(id);
                }
            }
        }

        self.powered = visited.keys().collect();
        self.total_production = sum_production(nodes, &self.powered);

        report.total_production = self.total_production;
        report.powered_nodes = self.powered.len();

        debug!(
            root = ?self.root,
            powered = report.powered_nodes,
            total = %self.total_production,
            "connectivity recomputed"
        );
        report
    }

    /// Re-sum production over the current powered set without walking the
    /// graph again. Used after production changes that leave links intact.
    pub fn refresh_total(&mut self, nodes: &SlotMap<NodeId, PowerNode>) -> Fixed64 {
        self.total_production = sum_production(nodes, &self.powered);
        self.total_production
    }

    /// Breadth-first walk from the root. Each node is enqueued at most once.
    fn traverse(
        &self,
        nodes: &SlotMap<NodeId, PowerNode>,
        registry: &NodeRegistry,
    ) -> SecondaryMap<NodeId, ()> {
        let mut visited: SecondaryMap<NodeId, ()> = SecondaryMap::new();

        let Some(root) = self.root else {
            return visited;
        };
        if !nodes.contains_key(root) || !registry.contains(root) {
            return visited;
        }

        let mut queue: VecDeque<NodeId> = VecDeque::new();
        visited.insert(root, ());
        queue.push_back(root);

        while let Some(current) = queue.pop_front() {
            let neighbors = match nodes.get(current) {
                Some(node) => Neighbors::new(node, nodes),
                None => continue,
            };
            for next in neighbors {
                if !registry.contains(next) || visited.contains_key(next) {
                    continue;
                }
                visited.insert(next, ());
                queue.push_back(next);
            }
        }

        visited
    }
}

fn sum_production(nodes: &SlotMap<NodeId, PowerNode>, set: &[NodeId]) -> Fixed64 {
    set.iter()
        .filter_map(|id| nodes.get(*id))
        .map(PowerNode::production)
        .fold(FIXED_ZERO, |acc, p| acc.saturating_add(p))
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeSpec;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    struct Fixture {
        nodes: SlotMap<NodeId, PowerNode>,
        registry: NodeRegistry,
        engine: ConnectivityEngine,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                nodes: SlotMap::with_key(),
                registry: NodeRegistry::new(),
                engine: ConnectivityEngine::new(),
            }
        }

        fn add(&mut self, base: f64) -> NodeId {
            let id = self.nodes.insert(PowerNode::new(NodeSpec::producer(
                "n",
                "generator",
                fixed(base),
                fixed(base),
            )));
            self.registry.register(id);
            id
        }

        fn link(&mut self, a: NodeId, b: NodeId) {
            self.nodes[a].link(b);
            self.nodes[b].link(a);
        }

        fn unlink(&mut self, a: NodeId, b: NodeId) {
            self.nodes[a].unlink(b);
            self.nodes[b].unlink(a);
        }

        fn recompute(&mut self) -> ConnectivityReport {
            self.engine.recompute(&mut self.nodes, &self.registry)
        }
    }

    #[test]
    fn unset_root_powers_nothing() {
        let mut f = Fixture::new();
        let a = f.add(10.0);
        let b = f.add(5.0);
        f.link(a, b);

        let report = f.recompute();
        assert_eq!(report.total_production, fixed(0.0));
        assert_eq!(report.powered_nodes, 0);
        assert!(!f.nodes[a].powered() && !f.nodes[b].powered());
    }

    #[test]
    fn root_alone_is_powered() {
        let mut f = Fixture::new();
        let root = f.add(0.0);
        f.engine.set_root(Some(root));

        let report = f.recompute();
        assert_eq!(report.powered_nodes, 1);
        assert_eq!(report.newly_powered, vec![root]);
        assert!(f.nodes[root].powered());
    }

    #[test]
    fn line_break_disconnects_tail() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(1.0);
        let b = f.add(2.0);
        let c = f.add(4.0);
        f.link(r, a);
        f.link(a, b);
        f.link(b, c);
        f.engine.set_root(Some(r));

        assert_eq!(f.recompute().total_production, fixed(7.0));

        f.unlink(a, b);
        let report = f.recompute();
        assert!(f.nodes[a].powered());
        assert!(!f.nodes[b].powered());
        assert!(!f.nodes[c].powered());
        assert_eq!(report.total_production, fixed(1.0));
        assert_eq!(report.newly_unpowered.len(), 2);
        assert!(report.newly_powered.is_empty());
    }

    #[test]
    fn cycles_are_visited_once() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(10.0);
        let b = f.add(20.0);
        let c = f.add(30.0);
        f.link(r, a);
        f.link(a, b);
        f.link(b, c);
        f.link(c, a);
        f.link(c, r);
        f.engine.set_root(Some(r));

        let report = f.recompute();
        assert_eq!(report.powered_nodes, 4);
        assert_eq!(report.total_production, fixed(60.0));
    }

    #[test]
    fn islands_stay_unpowered() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(10.0);
        let x = f.add(99.0);
        let y = f.add(99.0);
        f.link(r, a);
        f.link(x, y);
        f.engine.set_root(Some(r));

        let report = f.recompute();
        assert_eq!(report.total_production, fixed(10.0));
        assert!(!f.nodes[x].powered() && !f.nodes[y].powered());
    }

    #[test]
    fn unregistered_nodes_block_traversal() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(10.0);
        let b = f.add(20.0);
        f.link(r, a);
        f.link(a, b);
        f.engine.set_root(Some(r));
        f.recompute();

        f.registry.unregister(a);
        let report = f.recompute();
        assert_eq!(report.total_production, fixed(0.0));
        assert!(!f.nodes[b].powered());
    }

    #[test]
    fn removed_neighbor_is_skipped() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(10.0);
        let b = f.add(20.0);
        f.link(r, a);
        f.link(r, b);
        f.engine.set_root(Some(r));

        // Drop `a` from the arena without unlinking: the stale id on `r`
        // must be ignored.
        f.nodes.remove(a);
        let report = f.recompute();
        assert_eq!(report.total_production, fixed(20.0));
        assert_eq!(report.powered_nodes, 2);
    }

    #[test]
    fn refresh_total_tracks_production_changes() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        let a = f.add(10.0);
        f.link(r, a);
        f.engine.set_root(Some(r));
        f.recompute();

        f.nodes[a].clear_modifier();
        let m = crate::modifier::Modifier::new(gridwork_core::id::ModifierId(1), "half")
            .with_target("generator")
            .with_coefficients(crate::modifier::ModifierCoefficients {
                output_multiplier: fixed(0.5),
                ..Default::default()
            });
        f.nodes[a].apply_modifier(&m);
        assert_eq!(f.engine.refresh_total(&f.nodes), fixed(5.0));
        assert_eq!(f.engine.total_production(), fixed(5.0));
    }

    #[test]
    fn report_is_quiet_when_nothing_flips() {
        let mut f = Fixture::new();
        let r = f.add(0.0);
        f.engine.set_root(Some(r));
        assert!(f.recompute().changed());
        assert!(!f.recompute().changed());
    }
}
