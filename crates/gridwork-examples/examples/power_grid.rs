//! Power grid example: reachability, cable breaks, and event subscribers.
//!
//! Builds a headquarters with a reactor and a generator chained behind it,
//! prints production as links are added, then cuts the spine and shows the
//! far side dropping out.
//!
//! Run with: `RUST_LOG=gridwork_power=debug cargo run -p gridwork-examples --example power_grid`

use gridwork_core::event::{Event, EventKind};
use gridwork_core::fixed::Fixed64;
use gridwork_power::{NodeSpec, PowerNetwork};
use tracing_subscriber::EnvFilter;

fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut net = PowerNetwork::new();

    // Print every powered flip as it happens.
    net.subscribe(
        EventKind::PoweredChanged,
        Box::new(|event| {
            if let Event::PoweredChanged { node, powered } = event {
                println!("  {node:?} is now {}", if *powered { "powered" } else { "dark" });
            }
        }),
    );

    let hq = net.spawn_node(NodeSpec::consumer("hq", "consumer"));
    let reactor = net.spawn_node(NodeSpec::producer("reactor", "reactor", fixed(70.0), fixed(70.0)));
    let generator = net.spawn_node(NodeSpec::producer(
        "generator",
        "generator",
        fixed(12.5),
        fixed(25.0),
    ));
    let lamp_post = net.spawn_node(NodeSpec::consumer("lamp_post", "consumer"));

    println!("--- Designate headquarters as root ---");
    net.set_root(Some(hq));
    println!("total production: {}", net.total_production());

    println!("--- Link hq <-> reactor ---");
    net.add_edge(hq, reactor);
    println!("total production: {}", net.total_production());

    println!("--- Link reactor <-> generator <-> lamp_post ---");
    net.add_edge(reactor, generator);
    net.add_edge(generator, lamp_post);
    println!("total production: {}", net.total_production());

    println!("--- Duplicate link is ignored ---");
    println!("added again: {}", net.add_edge(generator, reactor));
    println!("edges: {}", net.edges().len());

    println!("--- A cycle changes nothing ---");
    net.add_edge(lamp_post, hq);
    println!(
        "total production: {} ({} powered)",
        net.total_production(),
        net.powered_nodes().len()
    );

    println!("--- Cut hq <-> reactor and lamp_post <-> hq ---");
    net.remove_edge(hq, reactor);
    net.remove_edge(lamp_post, hq);
    println!("total production: {}", net.total_production());
    for (id, node) in net.nodes() {
        println!(
            "  {:<10} {:?} production={} powered={}",
            node.name(),
            id,
            node.production(),
            node.powered()
        );
    }
}
