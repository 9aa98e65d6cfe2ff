//! Gridwork Data -- data-driven power network definitions.
//!
//! A single `network.ron`, `network.toml` or `network.json` file describes
//! node templates, the nodes spawned from them, initial links, the consumer
//! root and a catalog of modifiers. [`load_network`] reads the file, resolves
//! every name to an id and returns a ready [`PowerNetwork`](gridwork_power::PowerNetwork).

pub mod loader;
pub mod network;
pub mod schema;

pub use loader::{DataLoadError, Format, Source};
pub use network::{LoadedNetwork, ModifierCatalog, load_network, load_network_file, parse_network};
