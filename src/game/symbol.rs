//! Symbol Catalog
//!
//! The ordered set of distinct symbols boards are built from.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::error::GameError;

/// Names of the reference catalog, in catalog order.
pub const REFERENCE_SYMBOLS: [&str; 10] = [
    "hearts",
    "water-drop",
    "dice-six-faces-five",
    "umbrella",
    "cube",
    "beach-ball",
    "dragonfly",
    "hummingbird",
    "flower-emblem",
    "open-book",
];

/// A symbol identifier: its position in the catalog.
///
/// Only equality is meaningful to the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Symbol(pub u16);

impl Symbol {
    /// Catalog position.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Fixed, ordered catalog of distinct symbol names.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    names: Vec<String>,
}

impl Catalog {
    /// Build a catalog from names. Names must be non-empty and distinct.
    pub fn new<I, S>(names: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.len() > u16::MAX as usize {
            return Err(GameError::InvalidConfiguration(format!(
                "catalog holds {} symbols, at most {} are supported",
                names.len(),
                u16::MAX
            )));
        }

        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(GameError::InvalidConfiguration(format!(
                    "catalog symbol {} has an empty name",
                    i
                )));
            }
            if names[..i].contains(name) {
                return Err(GameError::InvalidConfiguration(format!(
                    "catalog symbol '{}' appears more than once",
                    name
                )));
            }
        }

        Ok(Self { names })
    }

    /// The ten-symbol reference catalog (boards up to 20 tiles).
    pub fn reference() -> Self {
        Self {
            names: REFERENCE_SYMBOLS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the catalog has no symbols.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Largest board this catalog can fill.
    pub fn max_tile_count(&self) -> usize {
        self.names.len() * 2
    }

    /// First `count` symbols in catalog order.
    pub fn first(&self, count: usize) -> Option<Vec<Symbol>> {
        if count > self.names.len() {
            return None;
        }
        Some((0..count).map(|i| Symbol(i as u16)).collect())
    }

    /// Display name of a symbol.
    pub fn name(&self, symbol: Symbol) -> Option<&str> {
        self.names.get(symbol.index()).map(String::as_str)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::reference()
    }
}
