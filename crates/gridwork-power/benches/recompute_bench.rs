//! Criterion benchmarks for power network recomputation.
//!
//! Three benchmark groups:
//! - `grid_recompute`: full BFS over a 50x50 lattice of static producers
//! - `link_toggle`: add/remove of a single bridging link in a large grid
//! - `broadcast`: modifier broadcast settled by 500 dynamic producers

use criterion::{Criterion, criterion_group, criterion_main};
use gridwork_core::id::NodeId;
use gridwork_power::PowerNetwork;
use gridwork_power::test_utils::*;

// ===========================================================================
// Network builders
// ===========================================================================

/// Build a `side x side` lattice with the consumer root in one corner.
/// Every non-root cell is a static generator linked right and down.
fn build_grid(side: usize) -> (PowerNetwork, Vec<NodeId>) {
    let mut net = PowerNetwork::new();
    let mut cells: Vec<NodeId> = Vec::with_capacity(side * side);

    for i in 0..side * side {
        let id = if i == 0 {
            net.spawn_node(consumer("root"))
        } else {
            net.spawn_node(producer(&format!("cell{i}"), "generator", 1.0, 2.0))
        };
        cells.push(id);
    }
    net.set_root(Some(cells[0]));

    for row in 0..side {
        for col in 0..side {
            let here = cells[row * side + col];
            if col + 1 < side {
                net.add_edge(here, cells[row * side + col + 1]);
            }
            if row + 1 < side {
                net.add_edge(here, cells[(row + 1) * side + col]);
            }
        }
    }
    (net, cells)
}

// ===========================================================================
// Benchmarks
// ===========================================================================

fn bench_grid_recompute(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_recompute");
    group.sample_size(50);

    let (mut net, _) = build_grid(50);

    group.bench_function("2500_nodes", |b| {
        b.iter(|| {
            net.recompute();
        });
    });

    group.finish();
}

fn bench_link_toggle(c: &mut Criterion) {
    let mut group = c.benchmark_group("link_toggle");
    group.sample_size(50);

    // Two grids joined by one bridge; toggling it powers or drops half the cells.
    let (mut net, cells) = build_grid(40);
    let far = cells[cells.len() - 1];
    let island = net.spawn_node(producer("island", "generator", 5.0, 5.0));

    group.bench_function("bridge_on_off", |b| {
        b.iter(|| {
            net.add_edge(far, island);
            net.remove_edge(far, island);
        });
    });

    group.finish();
}

fn bench_broadcast(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast");
    group.sample_size(30);

    let (mut net, _) = star_network(500, 500);
    let dynamic = net.dynamic_nodes();
    let boost = scale_modifier(1, "wind", 1.5);

    group.bench_function("500_static_500_dynamic", |b| {
        b.iter(|| {
            net.broadcast_modifier(boost.clone());
            for id in &dynamic {
                net.update_dynamic(*id, fixed(0.75));
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_grid_recompute, bench_link_toggle, bench_broadcast);
criterion_main!(benches);
