//! Serde data file structs for network definitions.
//!
//! These structs define the on-disk format. Numbers are plain `f64` here and
//! are validated and converted to fixed-point by the loader.

use serde::Deserialize;

// ===========================================================================
// Network file
// ===========================================================================

/// Top-level contents of a `network.{ron,toml,json}` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkData {
    #[serde(default)]
    pub templates: Vec<TemplateData>,
    #[serde(default)]
    pub nodes: Vec<NodeData>,
    #[serde(default)]
    pub links: Vec<LinkData>,
    /// Name of the consumer root node.
    #[serde(default)]
    pub root: Option<String>,
    #[serde(default)]
    pub modifiers: Vec<ModifierData>,
}

// ===========================================================================
// Templates and nodes
// ===========================================================================

/// A reusable node template.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateData {
    pub name: String,
    pub class: String,
    #[serde(default)]
    pub base_production: f64,
    #[serde(default)]
    pub max_production: f64,
    /// Output also depends on an environment multiplier.
    #[serde(default)]
    pub dynamic: bool,
}

/// A node instance spawned from a template.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeData {
    pub name: String,
    pub template: String,
}

/// A link between two named nodes, either as a pair or with explicit fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LinkData {
    /// Short form: `("a", "b")`.
    Pair(String, String),
    /// Full form: `(a: "a", b: "b")`.
    Full { a: String, b: String },
}

impl LinkData {
    pub fn endpoints(&self) -> (&str, &str) {
        match self {
            LinkData::Pair(a, b) | LinkData::Full { a, b } => (a, b),
        }
    }
}

// ===========================================================================
// Modifiers
// ===========================================================================

/// A modifier in the catalog. Unset coefficients are neutral.
#[derive(Debug, Clone, Deserialize)]
pub struct ModifierData {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub flat_output_bonus: f64,
    #[serde(default)]
    pub flat_max_bonus: f64,
    #[serde(default = "default_multiplier")]
    pub output_multiplier: f64,
    #[serde(default = "default_multiplier")]
    pub max_multiplier: f64,
}

fn default_multiplier() -> f64 {
    1.0
}

// ===========================================================================
// Tests
// ===========================================================================
