//! Game Events
//!
//! Events generated by flips and resolutions, drained by the session layer
//! and forwarded to subscribers.

use serde::{Serialize, Deserialize};

use crate::game::symbol::Symbol;
use crate::game::tile::TileState;

/// Game event data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventData {
    /// A tile was turned face up.
    TileFlipped {
        index: usize,
        symbol: Symbol,
    },

    /// The second flip of a pair revealed equal symbols.
    ///
    /// Emitted synchronously, before the pair is resolved.
    MatchDetected {
        pair: [usize; 2],
        symbol: Symbol,
    },

    /// A pending pair was settled after the resolution delay.
    PairResolved {
        pair: [usize; 2],
        state: TileState,
        finished: bool,
    },

    /// Every tile is matched and the end-of-game delay has elapsed.
    GameComplete {
        try_count: u32,
    },
}

/// A game event stamped with the try count at the time it happened.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tries made when the event occurred
    pub try_count: u32,

    /// Event data
    pub data: GameEventData,
}

impl GameEvent {
    /// Create a new event.
    pub fn new(try_count: u32, data: GameEventData) -> Self {
        Self { try_count, data }
    }

    /// Create tile flipped event.
    pub fn tile_flipped(try_count: u32, index: usize, symbol: Symbol) -> Self {
        Self::new(try_count, GameEventData::TileFlipped { index, symbol })
    }

    /// Create match detected event.
    pub fn match_detected(try_count: u32, pair: [usize; 2], symbol: Symbol) -> Self {
        Self::new(try_count, GameEventData::MatchDetected { pair, symbol })
    }

    /// Create pair resolved event.
    pub fn pair_resolved(try_count: u32, pair: [usize; 2], state: TileState, finished: bool) -> Self {
        Self::new(try_count, GameEventData::PairResolved { pair, state, finished })
    }

    /// Create game complete event.
    pub fn game_complete(try_count: u32) -> Self {
        Self::new(try_count, GameEventData::GameComplete { try_count })
    }

    /// Is this the match-detected notification?
    pub fn is_match_detected(&self) -> bool {
        matches!(self.data, GameEventData::MatchDetected { .. })
    }

    /// Is this the game-complete notification?
    pub fn is_game_complete(&self) -> bool {
        matches!(self.data, GameEventData::GameComplete { .. })
    }
}
