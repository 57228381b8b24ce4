//! Board Generation
//!
//! Builds the shuffled, paired tile layout a session plays on.

use std::collections::BTreeMap;
use serde::Serialize;

use crate::core::hash::{StateHash, StateHasher, compute_state_hash};
use crate::core::rng::DeterministicRng;
use crate::game::error::GameError;
use crate::game::symbol::{Catalog, Symbol};
use crate::game::tile::{Tile, TileState};

/// Ordered, fixed-length sequence of tiles.
///
/// Every symbol on the board appears exactly twice. Only tile states
/// change after construction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Board {
    tiles: Vec<Tile>,
}

/// Generate a new board of `tile_count` tiles.
///
/// Uses the first `tile_count / 2` catalog symbols, two copies each,
/// in a uniformly random order drawn from `rng`.
pub fn generate(
    tile_count: usize,
    catalog: &Catalog,
    rng: &mut DeterministicRng,
) -> Result<Board, GameError> {
    check_tile_count(tile_count)?;

    let pair_count = tile_count / 2;
    let used = catalog.first(pair_count).ok_or_else(|| {
        GameError::InvalidConfiguration(format!(
            "{} tiles need {} symbols but the catalog only has {}",
            tile_count,
            pair_count,
            catalog.len()
        ))
    })?;

    let mut contents: Vec<Symbol> = used.iter().chain(used.iter()).copied().collect();
    rng.shuffle(&mut contents);

    Ok(Board {
        tiles: contents.into_iter().map(Tile::new).collect(),
    })
}

/// Reject tile counts no board can have.
pub fn check_tile_count(tile_count: usize) -> Result<(), GameError> {
    if tile_count % 2 != 0 {
        return Err(GameError::InvalidConfiguration(format!(
            "the number of tiles must be even, got {}",
            tile_count
        )));
    }
    if tile_count == 0 {
        return Err(GameError::InvalidConfiguration(
            "a board needs at least one pair".to_string(),
        ));
    }
    Ok(())
}

impl Board {
    /// Build a board with a fixed layout.
    ///
    /// Used for replays and fixtures; the layout must still pair up.
    pub fn from_symbols(symbols: Vec<Symbol>) -> Result<Self, GameError> {
        check_tile_count(symbols.len())?;

        let mut counts: BTreeMap<Symbol, usize> = BTreeMap::new();
        for symbol in &symbols {
            *counts.entry(*symbol).or_default() += 1;
        }
        if let Some((symbol, count)) = counts.iter().find(|(_, count)| **count != 2) {
            return Err(GameError::InvalidConfiguration(format!(
                "symbol {} appears {} times, expected 2",
                symbol, count
            )));
        }

        Ok(Self {
            tiles: symbols.into_iter().map(Tile::new).collect(),
        })
    }

    /// Number of tiles.
    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Always false for a generated board.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// All tiles in board order.
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Tile at `index`.
    pub fn get(&self, index: usize) -> Result<&Tile, GameError> {
        self.tiles.get(index).ok_or(GameError::OutOfRange {
            index,
            len: self.tiles.len(),
        })
    }

    /// Symbols in board order.
    pub fn symbols(&self) -> Vec<Symbol> {
        self.tiles.iter().map(|t| t.content).collect()
    }

    /// States in board order.
    pub fn states(&self) -> Vec<TileState> {
        self.tiles.iter().map(|t| t.state).collect()
    }

    /// Indices of tiles currently face up.
    pub fn flipped_indices(&self) -> Vec<usize> {
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, t)| t.is_flipped())
            .map(|(i, _)| i)
            .collect()
    }

    /// Count of tiles currently face up.
    pub fn flipped_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_flipped()).count()
    }

    /// True once every tile is matched.
    pub fn all_matched(&self) -> bool {
        self.tiles.iter().all(Tile::is_matched)
    }

    /// Pairs found so far.
    pub fn matched_pairs(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_matched()).count() / 2
    }

    /// Pairs on the board.
    pub fn total_pairs(&self) -> usize {
        self.tiles.len() / 2
    }

    /// Hash of the symbol layout, ignoring tile states.
    pub fn fingerprint(&self) -> StateHash {
        compute_state_hash(StateHasher::for_board_layout(), self.tiles.len(), |hasher| {
            for tile in &self.tiles {
                hasher.update_u16(tile.content.0);
            }
        })
    }

    /// Move one tile along a state machine edge.
    pub(crate) fn transition(&mut self, index: usize, next: TileState) -> Result<(), GameError> {
        let len = self.tiles.len();
        let tile = self
            .tiles
            .get_mut(index)
            .ok_or(GameError::OutOfRange { index, len })?;

        if !tile.state.can_transition_to(next) {
            return Err(GameError::InvalidState(format!(
                "tile {} cannot go from {} to {}",
                index, tile.state, next
            )));
        }

        tile.state = next;
        Ok(())
    }
}
