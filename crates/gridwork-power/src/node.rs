//! Network nodes: producers and consumers with modifier-adjusted output.

use gridwork_core::fixed::{FIXED_ZERO, Fixed64, clamp_fixed};
use gridwork_core::id::{ClassTag, Generation, NodeId};
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::modifier::{Modifier, ModifierCoefficients};

/// Whether a node's output also depends on an environment multiplier.
///
/// Resolved once at spawn time. Static nodes settle synchronously when a
/// modifier is broadcast; dynamic nodes settle on their own update schedule
/// and report back to the barrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ProducerKind {
    #[default]
    Static,
    Dynamic,
}

/// Template used to spawn a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub name: String,
    pub class: ClassTag,
    pub base_production: Fixed64,
    pub max_production: Fixed64,
    #[serde(default)]
    pub kind: ProducerKind,
}

impl NodeSpec {
    /// A static producer.
    pub fn producer(
        name: impl Into<String>,
        class: impl Into<ClassTag>,
        base_production: Fixed64,
        max_production: Fixed64,
    ) -> Self {
        Self {
            name: name.into(),
            class: class.into(),
            base_production,
            max_production,
            kind: ProducerKind::Static,
        }
    }

    /// A pure consumer: produces nothing.
    pub fn consumer(name: impl Into<String>, class: impl Into<ClassTag>) -> Self {
        Self::producer(name, class, FIXED_ZERO, FIXED_ZERO)
    }

    pub fn dynamic(mut self) -> Self {
        self.kind = ProducerKind::Dynamic;
        self
    }
}

/// A live node in the power network.
///
/// `production` is derived and only changes through the recompute methods;
/// `powered` is owned by the connectivity engine.
#[derive(Debug, Clone)]
pub struct PowerNode {
    name: String,
    class: ClassTag,
    kind: ProducerKind,
    base_production: Fixed64,
    max_production: Fixed64,
    coefficients: ModifierCoefficients,
    /// Last environment multiplier supplied to a dynamic node.
    environment: Fixed64,
    production: Fixed64,
    powered: bool,
    /// Directly linked nodes. Duplicate-free; mirrored on every neighbor.
    neighbors: Vec<NodeId>,
    /// Last broadcast generation this (dynamic) node has settled on.
    settled: Option<Generation>,
}

impl PowerNode {
    pub fn new(spec: NodeSpec) -> Self {
        let mut node = Self {
            name: spec.name,
            class: spec.class,
            kind: spec.kind,
            base_production: spec.base_production,
            max_production: spec.max_production,
            coefficients: ModifierCoefficients::NEUTRAL,
            environment: FIXED_ZERO,
            production: FIXED_ZERO,
            powered: false,
            neighbors: Vec::new(),
            settled: None,
        };
        node.recompute();
        node
    }

    // --- Accessors ---

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn class(&self) -> &ClassTag {
        &self.class
    }

    pub fn kind(&self) -> ProducerKind {
        self.kind
    }

    pub fn is_dynamic(&self) -> bool {
        self.kind == ProducerKind::Dynamic
    }

    pub fn base_production(&self) -> Fixed64 {
        self.base_production
    }

    pub fn max_production(&self) -> Fixed64 {
        self.max_production
    }

    pub fn coefficients(&self) -> ModifierCoefficients {
        self.coefficients
    }

    pub fn environment(&self) -> Fixed64 {
        self.environment
    }

    pub fn production(&self) -> Fixed64 {
        self.production
    }

    pub fn powered(&self) -> bool {
        self.powered
    }

    /// Broadcast generation this node last adopted, if any.
    pub fn settled_generation(&self) -> Option<Generation> {
        self.settled
    }

    /// Raw neighbor ids, including any that may no longer be live.
    /// Prefer [`Neighbors`] when walking the graph.
    pub fn neighbor_ids(&self) -> &[NodeId] {
        &self.neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_linked_to(&self, other: NodeId) -> bool {
        self.neighbors.contains(&other)
    }

    /// `(max_production + flat_max_bonus) * max_multiplier`. May be negative
    /// under hostile modifiers; clamping treats a negative ceiling as zero.
    pub fn effective_max(&self) -> Fixed64 {
        self.max_production
            .saturating_add(self.coefficients.flat_max_bonus)
            .saturating_mul(self.coefficients.max_multiplier)
    }

    // --- Modifiers ---

    /// Take `modifier`'s coefficients if this node's class is targeted,
    /// otherwise reset to neutral. Recomputes production.
    pub fn apply_modifier(&mut self, modifier: &Modifier) {
        self.coefficients = modifier.coefficients_for(&self.class);
        self.recompute();
    }

    /// Reset all coefficients to neutral. Recomputes production.
    pub fn clear_modifier(&mut self) {
        self.coefficients = ModifierCoefficients::NEUTRAL;
        self.recompute();
    }

    // --- Production ---

    /// Recompute using the path matching this node's kind. Dynamic nodes
    /// reuse the last environment multiplier they were given.
    pub fn recompute(&mut self) {
        match self.kind {
            ProducerKind::Static => self.recompute_static(),
            ProducerKind::Dynamic => self.recompute_with_environment(self.environment),
        }
    }

    /// `clamp((base + flat_output_bonus) * output_multiplier, 0, effective_max)`.
    pub fn recompute_static(&mut self) {
        let raw = self.raw_output();
        self.production = clamp_fixed(raw, FIXED_ZERO, self.effective_max());
    }

    /// Like [`recompute_static`](Self::recompute_static) with an extra
    /// environment factor. Negative multipliers are floored at zero.
    pub fn recompute_with_environment(&mut self, env_multiplier: Fixed64) {
        let env = env_multiplier.max(FIXED_ZERO);
        self.environment = env;
        let raw = self.raw_output().saturating_mul(env);
        self.production = clamp_fixed(raw, FIXED_ZERO, self.effective_max());
    }

    fn raw_output(&self) -> Fixed64 {
        self.base_production
            .saturating_add(self.coefficients.flat_output_bonus)
            .saturating_mul(self.coefficients.output_multiplier)
    }

    // --- Crate-internal state owned by other components ---

    pub(crate) fn set_powered(&mut self, powered: bool) {
        self.powered = powered;
    }

    pub(crate) fn mark_settled(&mut self, generation: Generation) {
        self.settled = Some(generation);
    }

    /// Record a link to `other`. Returns `false` if it already existed.
    pub(crate) fn link(&mut self, other: NodeId) -> bool {
        if self.neighbors.contains(&other) {
            return false;
        }
        self.neighbors.push(other);
        true
    }

    /// Drop the link to `other`. Returns `false` if there was none.
    pub(crate) fn unlink(&mut self, other: NodeId) -> bool {
        let before = self.neighbors.len();
        self.neighbors.retain(|n| *n != other);
        self.neighbors.len() != before
    }

    pub(crate) fn take_neighbors(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.neighbors)
    }
}

// ---------------------------------------------------------------------------
// Neighbor iteration
// ---------------------------------------------------------------------------

/// Lazy iterator over the live neighbors of a node. Ids whose node has been
/// removed from the arena are skipped. Cloning restarts from the current
/// position, so the sequence can be walked again.
#[derive(Clone)]
pub struct Neighbors<'a> {
    ids: std::slice::Iter<'a, NodeId>,
    arena: &'a SlotMap<NodeId, PowerNode>,
}

impl<'a> Neighbors<'a> {
    pub(crate) fn new(node: &'a PowerNode, arena: &'a SlotMap<NodeId, PowerNode>) -> Self {
        Self {
            ids: node.neighbors.iter(),
            arena,
        }
    }

    /// An iterator that yields nothing, used for unknown nodes.
    pub(crate) fn empty(arena: &'a SlotMap<NodeId, PowerNode>) -> Self {
        let none: &'a [NodeId] = &[];
        Self {
            ids: none.iter(),
            arena,
        }
    }
}

impl Iterator for Neighbors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids
            .by_ref()
            .copied()
            .find(|id| self.arena.contains_key(*id))
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use gridwork_core::id::ModifierId;
    use proptest::prelude::*;

    fn fixed(v: f64) -> Fixed64 {
        Fixed64::from_num(v)
    }

    fn turbine() -> PowerNode {
        PowerNode::new(NodeSpec::producer("t1", "wind_turbine", fixed(12.5), fixed(25.0)).dynamic())
    }

    fn reactor() -> PowerNode {
        PowerNode::new(NodeSpec::producer("r1", "reactor", fixed(70.0), fixed(70.0)))
    }

    fn coefficients(flat_out: f64, flat_max: f64, out_mul: f64, max_mul: f64) -> ModifierCoefficients {
        ModifierCoefficients {
            flat_output_bonus: fixed(flat_out),
            flat_max_bonus: fixed(flat_max),
            output_multiplier: fixed(out_mul),
            max_multiplier: fixed(max_mul),
        }
    }

    #[test]
    fn static_node_starts_at_base_production() {
        let node = reactor();
        assert_eq!(node.production(), fixed(70.0));
        assert_eq!(node.effective_max(), fixed(70.0));
        assert!(!node.powered());
        assert!(node.coefficients().is_neutral());
    }

    #[test]
    fn consumer_produces_nothing() {
        let node = PowerNode::new(NodeSpec::consumer("goal", "consumer"));
        assert_eq!(node.production(), fixed(0.0));
    }

    #[test]
    fn dynamic_node_waits_for_environment() {
        let mut node = turbine();
        assert_eq!(node.production(), fixed(0.0));

        node.recompute_with_environment(fixed(1.0));
        assert_eq!(node.production(), fixed(12.5));

        node.recompute_with_environment(fixed(0.5));
        assert_eq!(node.production(), fixed(6.25));
        assert_eq!(node.environment(), fixed(0.5));
    }

    #[test]
    fn static_output_is_clamped_to_effective_max() {
        let mut node = reactor();
        let m = Modifier::new(ModifierId(1), "overdrive")
            .with_target("reactor")
            .with_coefficients(coefficients(10.0, 0.0, 2.0, 1.0));
        node.apply_modifier(&m);
        // (70 + 10) * 2 = 160, capped at 70.
        assert_eq!(node.production(), fixed(70.0));
    }

    #[test]
    fn raising_the_cap_lets_output_grow() {
        let mut node = reactor();
        let m = Modifier::new(ModifierId(1), "overdrive")
            .with_target("reactor")
            .with_coefficients(coefficients(10.0, 30.0, 1.5, 2.0));
        node.apply_modifier(&m);
        // (70 + 10) * 1.5 = 120, cap (70 + 30) * 2 = 200.
        assert_eq!(node.effective_max(), fixed(200.0));
        assert_eq!(node.production(), fixed(120.0));
    }

    #[test]
    fn negative_multiplier_floors_at_zero() {
        let mut node = reactor();
        let m = Modifier::new(ModifierId(2), "sabotage")
            .with_target("reactor")
            .with_coefficients(coefficients(0.0, 0.0, -1.0, 1.0));
        node.apply_modifier(&m);
        assert_eq!(node.production(), fixed(0.0));
    }

    #[test]
    fn negative_ceiling_forces_zero_output() {
        let mut node = reactor();
        let m = Modifier::new(ModifierId(2), "meltdown")
            .with_target("reactor")
            .with_coefficients(coefficients(0.0, 0.0, 1.0, -1.0));
        node.apply_modifier(&m);
        assert!(node.effective_max() < fixed(0.0));
        assert_eq!(node.production(), fixed(0.0));
    }

    #[test]
    fn negative_environment_is_floored() {
        let mut node = turbine();
        node.recompute_with_environment(fixed(-3.0));
        assert_eq!(node.environment(), fixed(0.0));
        assert_eq!(node.production(), fixed(0.0));
    }

    #[test]
    fn untargeted_modifier_resets_to_neutral() {
        let mut node = reactor();
        let boost = Modifier::new(ModifierId(1), "boost")
            .with_target("reactor")
            .with_coefficients(coefficients(0.0, 0.0, 0.5, 1.0));
        node.apply_modifier(&boost);
        assert_eq!(node.production(), fixed(35.0));

        let other = Modifier::new(ModifierId(2), "solar_only")
            .with_target("solar_panel")
            .with_coefficients(coefficients(5.0, 5.0, 3.0, 3.0));
        node.apply_modifier(&other);
        assert!(node.coefficients().is_neutral());
        assert_eq!(node.production(), fixed(70.0));
    }

    #[test]
    fn clear_modifier_restores_base() {
        let mut node = reactor();
        let m = Modifier::new(ModifierId(1), "half")
            .with_target("reactor")
            .with_coefficients(coefficients(0.0, 0.0, 0.5, 1.0));
        node.apply_modifier(&m);
        node.clear_modifier();
        assert!(node.coefficients().is_neutral());
        assert_eq!(node.production(), fixed(70.0));
    }

    #[test]
    fn dynamic_modifier_reuses_last_environment() {
        let mut node = turbine();
        node.recompute_with_environment(fixed(0.5));
        let m = Modifier::new(ModifierId(1), "blades")
            .with_target("wind_turbine")
            .with_coefficients(coefficients(0.0, 0.0, 2.0, 1.0));
        node.apply_modifier(&m);
        // 12.5 * 2 * 0.5 = 12.5
        assert_eq!(node.production(), fixed(12.5));
    }

    #[test]
    fn link_is_duplicate_free() {
        let mut arena = SlotMap::<NodeId, PowerNode>::with_key();
        let a = arena.insert(reactor());
        let b = arena.insert(turbine());

        assert!(arena[a].link(b));
        assert!(!arena[a].link(b));
        assert_eq!(arena[a].degree(), 1);
        assert!(arena[a].unlink(b));
        assert!(!arena[a].unlink(b));
    }

    #[test]
    fn neighbors_skip_removed_nodes_and_restart() {
        let mut arena = SlotMap::<NodeId, PowerNode>::with_key();
        let a = arena.insert(reactor());
        let b = arena.insert(turbine());
        let c = arena.insert(turbine());
        arena[a].link(b);
        arena[a].link(c);
        arena.remove(b);

        let walk = Neighbors::new(&arena[a], &arena);
        let again = walk.clone();
        assert_eq!(walk.collect::<Vec<_>>(), vec![c]);
        assert_eq!(again.collect::<Vec<_>>(), vec![c]);
    }

    proptest! {
        #[test]
        fn production_stays_within_bounds(
            base in 0.0f64..1000.0,
            max in 0.0f64..1000.0,
            flat_out in -500.0f64..500.0,
            flat_max in -500.0f64..500.0,
            out_mul in -10.0f64..10.0,
            max_mul in -10.0f64..10.0,
            env in -5.0f64..5.0,
        ) {
            let mut node = PowerNode::new(
                NodeSpec::producer("p", "x", fixed(base), fixed(max)).dynamic(),
            );
            let m = Modifier::new(ModifierId(0), "m")
                .with_target("x")
                .with_coefficients(coefficients(flat_out, flat_max, out_mul, max_mul));
            node.apply_modifier(&m);

            node.recompute_with_environment(fixed(env));
            let ceiling = node.effective_max().max(fixed(0.0));
            prop_assert!(node.production() >= fixed(0.0));
            prop_assert!(node.production() <= ceiling);

            node.recompute_static();
            prop_assert!(node.production() >= fixed(0.0));
            prop_assert!(node.production() <= ceiling);
        }
    }
}
