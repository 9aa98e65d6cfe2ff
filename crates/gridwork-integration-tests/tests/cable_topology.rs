//! Integration test: cable topology changes on a loaded network.
//!
//! Loads the same grid from TOML and JSON, then plays the role of a
//! cable-building collaborator: cuts and re-lays cables, demolishes a
//! pylon, and toggles a node out of the registry. After every step the
//! powered set and total production are checked, along with the events a
//! UI layer would consume.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use gridwork_core::event::{Event, EventKind};
use gridwork_data::{Format, LoadedNetwork, parse_network};
use gridwork_power::test_utils::fixed;

const GRID_TOML: &str = r#"
root = "hq"
links = [
    ["hq", "pylon_a"],
    ["pylon_a", "reactor"],
    ["pylon_a", "pylon_b"],
    ["pylon_b", "generator"],
    { a = "generator", b = "reactor" },
]

[[templates]]
name = "hq"
class = "consumer"

[[templates]]
name = "pylon"
class = "pylon"

[[templates]]
name = "reactor"
class = "reactor"
base_production = 70.0
max_production = 70.0

[[templates]]
name = "generator"
class = "generator"
base_production = 12.5
max_production = 25.0

[[nodes]]
name = "hq"
template = "hq"

[[nodes]]
name = "pylon_a"
template = "pylon"

[[nodes]]
name = "pylon_b"
template = "pylon"

[[nodes]]
name = "reactor"
template = "reactor"

[[nodes]]
name = "generator"
template = "generator"
"#;

const GRID_JSON: &str = r#"{
    "root": "hq",
    "links": [
        ["hq", "pylon_a"],
        ["pylon_a", "reactor"],
        ["pylon_a", "pylon_b"],
        ["pylon_b", "generator"],
        {"a": "generator", "b": "reactor"}
    ],
    "templates": [
        {"name": "hq", "class": "consumer"},
        {"name": "pylon", "class": "pylon"},
        {"name": "reactor", "class": "reactor", "base_production": 70.0, "max_production": 70.0},
        {"name": "generator", "class": "generator", "base_production": 12.5, "max_production": 25.0}
    ],
    "nodes": [
        {"name": "hq", "template": "hq"},
        {"name": "pylon_a", "template": "pylon"},
        {"name": "pylon_b", "template": "pylon"},
        {"name": "reactor", "template": "reactor"},
        {"name": "generator", "template": "generator"}
    ]
}"#;

fn id(loaded: &LoadedNetwork, name: &str) -> gridwork_core::id::NodeId {
    loaded.node(name).unwrap_or_else(|| panic!("node {name} missing"))
}

#[test]
fn toml_and_json_load_the_same_grid() {
    let toml = parse_network(GRID_TOML, Format::Toml, Path::new("grid.toml")).unwrap();
    let json = parse_network(GRID_JSON, Format::Json, Path::new("grid.json")).unwrap();

    for loaded in [&toml, &json] {
        assert_eq!(loaded.network.len(), 5);
        assert_eq!(loaded.network.edges().len(), 5);
        assert_eq!(loaded.network.total_production(), fixed(82.5));
        assert_eq!(loaded.network.powered_nodes().len(), 5);
    }
}

#[test]
fn cutting_cables_follows_reachability() {
    let mut loaded = parse_network(GRID_TOML, Format::Toml, Path::new("grid.toml")).unwrap();
    let hq = id(&loaded, "hq");
    let pylon_a = id(&loaded, "pylon_a");
    let pylon_b = id(&loaded, "pylon_b");
    let reactor = id(&loaded, "reactor");
    let generator = id(&loaded, "generator");

    // The generator still reaches hq through the reactor.
    loaded.network.remove_edge(pylon_a, pylon_b);
    assert!(loaded.network.is_powered(pylon_b));
    assert_eq!(loaded.network.total_production(), fixed(82.5));

    // Now the generator and pylon_b form an island.
    loaded.network.remove_edge(generator, reactor);
    assert!(!loaded.network.is_powered(pylon_b));
    assert!(!loaded.network.is_powered(generator));
    assert_eq!(loaded.network.total_production(), fixed(70.0));

    // Re-lay the cable from the other end.
    loaded.network.add_edge(pylon_b, pylon_a);
    assert!(loaded.network.is_powered(generator));
    assert_eq!(loaded.network.total_production(), fixed(82.5));

    // Cutting hq off powers everything down except hq itself.
    loaded.network.remove_edge(hq, pylon_a);
    assert_eq!(loaded.network.powered_nodes(), vec![hq]);
    assert_eq!(loaded.network.total_production(), fixed(0.0));
}

#[test]
fn demolishing_a_pylon_emits_events_and_recomputes() {
    let mut loaded = parse_network(GRID_TOML, Format::Toml, Path::new("grid.toml")).unwrap();
    let pylon_a = id(&loaded, "pylon_a");

    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in [
        EventKind::ConnectivityChanged,
        EventKind::PoweredChanged,
        EventKind::NodeDespawned,
        EventKind::NetworkRecomputed,
    ] {
        let sink = log.clone();
        loaded
            .network
            .subscribe(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }

    assert!(loaded.network.despawn_node(pylon_a));

    let events = log.borrow();
    let cut = events
        .iter()
        .filter(|e| matches!(e, Event::ConnectivityChanged { connected: false, .. }))
        .count();
    let dark = events
        .iter()
        .filter(|e| matches!(e, Event::PoweredChanged { powered: false, .. }))
        .count();
    assert_eq!(cut, 3, "pylon_a had three cables");
    // pylon_b, reactor and generator all lose their path to hq.
    assert_eq!(dark, 3);
    assert!(events.contains(&Event::NodeDespawned { node: pylon_a }));
    assert!(events.iter().any(|e| matches!(
        e,
        Event::NetworkRecomputed { powered_nodes: 1, total_production } if *total_production == fixed(0.0)
    )));
}

#[test]
fn unregistering_a_relay_blocks_power_until_registered() {
    let mut loaded = parse_network(GRID_JSON, Format::Json, Path::new("grid.json")).unwrap();
    let pylon_a = id(&loaded, "pylon_a");
    let generator = id(&loaded, "generator");

    assert!(loaded.network.unregister(pylon_a));
    assert!(!loaded.network.is_powered(pylon_a));
    assert!(!loaded.network.is_powered(generator));
    assert_eq!(loaded.network.total_production(), fixed(0.0));
    // Links are untouched while unregistered.
    assert_eq!(loaded.network.edges().len(), 5);

    assert!(loaded.network.register(pylon_a));
    assert_eq!(loaded.network.total_production(), fixed(82.5));
}

#[test]
fn new_buildings_join_through_templates() {
    let mut loaded = parse_network(GRID_TOML, Format::Toml, Path::new("grid.toml")).unwrap();
    let pylon_b = id(&loaded, "pylon_b");

    let extra = loaded
        .spawn_from_template("reactor", "reactor_2")
        .expect("template exists");
    assert!(!loaded.network.is_powered(extra));

    loaded.network.add_edge(pylon_b, extra);
    assert!(loaded.network.is_powered(extra));
    assert_eq!(loaded.network.total_production(), fixed(152.5));
}
