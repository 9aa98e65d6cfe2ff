//! Global production modifiers (upgrades, weather events, research boosts).
//!
//! A [`Modifier`] carries four coefficients and the set of class tags it
//! targets. Applying it network-wide copies the coefficients onto every
//! targeted node and resets every other node to [`ModifierCoefficients::NEUTRAL`].

use std::collections::BTreeSet;

use gridwork_core::fixed::{FIXED_ONE, FIXED_ZERO, Fixed64};
use gridwork_core::id::{ClassTag, ModifierId};
use serde::{Deserialize, Serialize};

/// The four production coefficients a modifier controls.
///
/// Output: `(base + flat_output_bonus) * output_multiplier`.
/// Ceiling: `(max + flat_max_bonus) * max_multiplier`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModifierCoefficients {
    pub flat_output_bonus: Fixed64,
    pub flat_max_bonus: Fixed64,
    pub output_multiplier: Fixed64,
    pub max_multiplier: Fixed64,
}

impl ModifierCoefficients {
    /// No bonus, unit multipliers.
    pub const NEUTRAL: ModifierCoefficients = ModifierCoefficients {
        flat_output_bonus: FIXED_ZERO,
        flat_max_bonus: FIXED_ZERO,
        output_multiplier: FIXED_ONE,
        max_multiplier: FIXED_ONE,
    };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

impl Default for ModifierCoefficients {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

/// A modifier definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifier {
    pub id: ModifierId,
    pub name: String,
    /// Class tags this modifier applies to. Empty means it targets nothing,
    /// so broadcasting it resets every node.
    pub targets: BTreeSet<ClassTag>,
    pub coefficients: ModifierCoefficients,
}

impl Modifier {
    /// Create a modifier with neutral coefficients and no targets.
    pub fn new(id: ModifierId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            targets: BTreeSet::new(),
            coefficients: ModifierCoefficients::NEUTRAL,
        }
    }

    /// The reset modifier broadcast by a network-wide clear.
    pub fn neutral() -> Self {
        Self::new(ModifierId::NEUTRAL, "neutral")
    }

    pub fn with_target(mut self, tag: impl Into<ClassTag>) -> Self {
        self.targets.insert(tag.into());
        self
    }

    pub fn with_coefficients(mut self, coefficients: ModifierCoefficients) -> Self {
        self.coefficients = coefficients;
        self
    }

    /// Whether a node with class `tag` receives this modifier's coefficients.
    pub fn targets(&self, tag: &ClassTag) -> bool {
        self.targets.contains(tag)
    }

    /// Coefficients a node of class `tag` should carry under this modifier.
    pub fn coefficients_for(&self, tag: &ClassTag) -> ModifierCoefficients {
        if self.targets(tag) {
            self.coefficients
        } else {
            ModifierCoefficients::NEUTRAL
        }
    }
}
