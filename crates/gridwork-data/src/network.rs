//! Build a [`PowerNetwork`] from a network definition file.
//!
//! Resolution order: templates, modifiers, nodes, links, root. Every name is
//! checked for duplicates within its own namespace and every reference must
//! resolve, otherwise loading fails with a [`DataLoadError`].

use std::collections::HashMap;
use std::path::Path;

use gridwork_core::id::{ClassTag, ModifierId, NodeId};
use gridwork_power::{Modifier, ModifierCoefficients, NodeSpec, PowerNetwork};
use tracing::{debug, info};

use crate::loader::{DataLoadError, Format, NameTable, Record, Source};
use crate::schema::{ModifierData, NetworkData, TemplateData};

/// Base name of the network definition file.
pub const NETWORK_FILE: &str = "network";

// ===========================================================================
// Resolved output
// ===========================================================================

/// Modifiers from the data file, keyed by name. Ids follow file order.
#[derive(Debug, Clone, Default)]
pub struct ModifierCatalog {
    by_name: HashMap<String, Modifier>,
}

impl ModifierCatalog {
    pub fn get(&self, name: &str) -> Option<&Modifier> {
        self.by_name.get(name)
    }

    pub fn by_id(&self, id: ModifierId) -> Option<&Modifier> {
        self.by_name.values().find(|m| m.id == id)
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Names in id order.
    pub fn names(&self) -> Vec<&str> {
        let mut all: Vec<&Modifier> = self.by_name.values().collect();
        all.sort_by_key(|m| m.id);
        all.into_iter().map(|m| m.name.as_str()).collect()
    }
}

/// A network built from data, plus the name tables needed to drive it.
#[derive(Debug)]
pub struct LoadedNetwork {
    pub network: PowerNetwork,
    /// Node name to spawned id.
    pub nodes: HashMap<String, NodeId>,
    /// Template name to spawn template, for spawning more nodes later.
    pub templates: HashMap<String, NodeSpec>,
    pub modifiers: ModifierCatalog,
}

impl LoadedNetwork {
    pub fn node(&self, name: &str) -> Option<NodeId> {
        self.nodes.get(name).copied()
    }

    /// Spawn a new node from a named template. Returns `None` for an unknown
    /// template.
    pub fn spawn_from_template(&mut self, template: &str, name: &str) -> Option<NodeId> {
        let mut spec = self.templates.get(template)?.clone();
        spec.name = name.to_string();
        let id = self.network.spawn_node(spec);
        self.nodes.insert(name.to_string(), id);
        Some(id)
    }
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Find `network.{ron,toml,json}` in `dir` and build it.
pub fn load_network(dir: &Path) -> Result<LoadedNetwork, DataLoadError> {
    let source = Source::require(dir, NETWORK_FILE)?;
    let data: NetworkData = source.read()?;
    build_network(data, &source.path)
}

/// Build the network described by a single file.
pub fn load_network_file(path: &Path) -> Result<LoadedNetwork, DataLoadError> {
    let data: NetworkData = Source::from_path(path)?.read()?;
    build_network(data, path)
}

/// Build a network from in-memory content. `origin` names the source in
/// error messages.
pub fn parse_network(
    content: &str,
    format: Format,
    origin: &Path,
) -> Result<LoadedNetwork, DataLoadError> {
    let data: NetworkData = format.parse(content, origin)?;
    build_network(data, origin)
}

// ===========================================================================
// Resolution
// ===========================================================================

fn build_network(data: NetworkData, file: &Path) -> Result<LoadedNetwork, DataLoadError> {
    let templates = resolve_templates(&data.templates, file)?;
    let modifiers = resolve_modifiers(&data.modifiers, file)?;

    let mut network = PowerNetwork::new();
    let mut nodes: NameTable<'_, NodeId> = NameTable::new("node", file);

    for node in &data.nodes {
        let mut spec = templates.lookup(&node.template)?.clone();
        spec.name = node.name.clone();
        let id = network.spawn_node(spec);
        nodes.declare(&node.name, id)?;
    }

    for link in &data.links {
        let (a, b) = link.endpoints();
        let a_id = *nodes.lookup(a)?;
        let b_id = *nodes.lookup(b)?;
        if a_id == b_id {
            return Err(Record::new(file, a).invalid("a node cannot be linked to itself"));
        }
        if !network.add_edge(a_id, b_id) {
            debug!(a, b, "duplicate link in data file ignored");
        }
    }

    if let Some(root) = &data.root {
        network.set_root(Some(*nodes.lookup(root)?));
    }

    info!(
        file = %file.display(),
        nodes = nodes.len(),
        links = network.edges().len(),
        modifiers = modifiers.len(),
        total = %network.total_production(),
        "network loaded"
    );

    Ok(LoadedNetwork {
        network,
        nodes: nodes.into_map(),
        templates: templates.into_map(),
        modifiers,
    })
}

fn resolve_templates<'f>(
    templates: &[TemplateData],
    file: &'f Path,
) -> Result<NameTable<'f, NodeSpec>, DataLoadError> {
    let mut table = NameTable::new("template", file);
    for t in templates {
        let record = Record::new(file, &t.name);
        let mut spec = NodeSpec::producer(
            t.name.clone(),
            t.class.as_str(),
            record.fixed("base_production", t.base_production)?,
            record.fixed("max_production", t.max_production)?,
        );
        if t.dynamic {
            spec = spec.dynamic();
        }
        table.declare(&t.name, spec)?;
    }
    Ok(table)
}

fn resolve_modifiers(
    modifiers: &[ModifierData],
    file: &Path,
) -> Result<ModifierCatalog, DataLoadError> {
    let mut table = NameTable::new("modifier", file);
    for (index, m) in modifiers.iter().enumerate() {
        let record = Record::new(file, &m.name);
        let id = u32::try_from(index)
            .ok()
            .filter(|i| *i != ModifierId::NEUTRAL.0)
            .ok_or_else(|| record.invalid("too many modifiers"))?;

        let coefficients = ModifierCoefficients {
            flat_output_bonus: record.fixed("flat_output_bonus", m.flat_output_bonus)?,
            flat_max_bonus: record.fixed("flat_max_bonus", m.flat_max_bonus)?,
            output_multiplier: record.fixed("output_multiplier", m.output_multiplier)?,
            max_multiplier: record.fixed("max_multiplier", m.max_multiplier)?,
        };

        let modifier = m.targets.iter().fold(
            Modifier::new(ModifierId(id), m.name.clone()).with_coefficients(coefficients),
            |modifier, target| modifier.with_target(ClassTag::new(target.clone())),
        );
        table.declare(&m.name, modifier)?;
    }
    Ok(ModifierCatalog {
        by_name: table.into_map(),
    })
}

// ===========================================================================
// Tests
// ===========================================================================
