//! Gridwork Power -- connectivity-gated power networks with broadcast modifiers.
//!
//! Producers and consumers are linked into an undirected graph. Only nodes
//! reachable from a designated consumer root are powered, and total
//! production is the sum over that powered set.
//!
//! # Modifier Broadcasts
//!
//! Global modifiers (upgrades, weather, research) are broadcast to every
//! node. Static nodes apply them immediately; dynamic nodes, whose output
//! also depends on an environment multiplier, apply them on their next
//! update and report back. A generation-tagged barrier counts those reports
//! and emits [`Event::BroadcastReady`](gridwork_core::event::Event) exactly
//! once per broadcast, after which total production is consistent.
//!
//! ```rust,ignore
//! let mut net = PowerNetwork::new();
//! let goal = net.spawn_node(NodeSpec::consumer("goal", "consumer"));
//! let mill = net.spawn_node(NodeSpec::producer("mill", "wind", fixed(10.0), fixed(40.0)).dynamic());
//! net.set_root(Some(goal));
//! net.add_edge(goal, mill);
//!
//! let ticket = net.broadcast_modifier(boost);
//! net.update_dynamic(mill, fixed(0.8)); // last report: Ready fires
//! ```
//!
//! # Key Types
//!
//! - [`PowerNetwork`] -- The service owning nodes, links, registry, barrier
//!   and event bus.
//! - [`PowerNode`] / [`NodeSpec`] -- Node state and spawn template.
//! - [`ConnectivityEngine`] -- Breadth-first reachability from the root.
//! - [`BroadcastBarrier`] -- Fan-out/fan-in countdown with generations.
//! - [`Modifier`] -- Coefficients plus the class tags they target.

pub mod barrier;
pub mod connectivity;
pub mod edge;
pub mod modifier;
pub mod network;
pub mod node;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use barrier::{BarrierState, BroadcastBarrier, BroadcastTicket, ReportOutcome, Superseded};
pub use connectivity::{ConnectivityEngine, ConnectivityReport};
pub use edge::Edge;
pub use modifier::{Modifier, ModifierCoefficients};
pub use network::PowerNetwork;
pub use node::{Neighbors, NodeSpec, PowerNode, ProducerKind};
pub use registry::NodeRegistry;
