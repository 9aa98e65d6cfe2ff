//! Shared test helpers for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use gridwork_core::fixed::Fixed64;
use gridwork_core::id::{ModifierId, NodeId};

use crate::modifier::{Modifier, ModifierCoefficients};
use crate::network::PowerNetwork;
use crate::node::NodeSpec;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Node specs
// ===========================================================================

/// A static producer with `f64` figures.
pub fn producer(name: &str, class: &str, base: f64, max: f64) -> NodeSpec {
    NodeSpec::producer(name, class, fixed(base), fixed(max))
}

/// A consumer of class `consumer`.
pub fn consumer(name: &str) -> NodeSpec {
    NodeSpec::consumer(name, "consumer")
}

// ===========================================================================
// Modifiers
// ===========================================================================

/// A modifier scaling both output and ceiling of `target` by `factor`.
pub fn scale_modifier(id: u32, target: &str, factor: f64) -> Modifier {
    Modifier::new(ModifierId(id), format!("scale_{target}"))
        .with_target(target)
        .with_coefficients(ModifierCoefficients {
            output_multiplier: fixed(factor),
            max_multiplier: fixed(factor),
            ..ModifierCoefficients::NEUTRAL
        })
}

// ===========================================================================
// Network builders
// ===========================================================================

/// Build `root - n1 - n2 - ...` where the root is a consumer and every other
/// node is a static `generator` with base and max equal to its figure.
/// `figures[0]` is ignored (the root). Returns ids in line order.
pub fn line_network(figures: &[f64]) -> (PowerNetwork, Vec<NodeId>) {
    let mut net = PowerNetwork::new();
    let mut ids = Vec::with_capacity(figures.len());

    let root = net.spawn_node(consumer("root"));
    net.set_root(Some(root));
    ids.push(root);

    for (i, v) in figures.iter().enumerate().skip(1) {
        let id = net.spawn_node(producer(&format!("gen{i}"), "generator", *v, *v));
        net.add_edge(ids[i - 1], id);
        ids.push(id);
    }
    (net, ids)
}

/// Star network: a consumer root with `spokes` static generators and
/// `dynamic` dynamic `wind` producers attached directly.
pub fn star_network(spokes: usize, dynamic: usize) -> (PowerNetwork, NodeId) {
    let mut net = PowerNetwork::new();
    let root = net.spawn_node(consumer("root"));
    net.set_root(Some(root));

    for i in 0..spokes {
        let id = net.spawn_node(producer(&format!("gen{i}"), "generator", 10.0, 20.0));
        net.add_edge(root, id);
    }
    for i in 0..dynamic {
        let id = net.spawn_node(producer(&format!("wind{i}"), "wind", 10.0, 40.0).dynamic());
        net.add_edge(root, id);
    }
    (net, root)
}
