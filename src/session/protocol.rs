//! Snapshot Protocol
//!
//! What the presentation layer reads back after each flip or event.
//! Encodable as JSON (for UIs) or bincode (compact, same-process replay).

use serde::{Serialize, Deserialize};

use crate::game::state::GameState;
use crate::game::tile::Tile;

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// No board requested yet.
    AwaitingBoard,
    /// Board dealt, game running.
    Playing,
    /// Every tile matched.
    Finished,
    /// Presentation layer is done with the session.
    Closed,
}

/// Read-only view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Session identifier (UUID string).
    pub session_id: String,
    /// Lifecycle phase.
    pub phase: SessionPhase,
    /// Tiles in board order; empty until a board is generated.
    pub tiles: Vec<Tile>,
    /// Second flips made so far.
    pub try_count: u32,
    /// True once every tile is matched.
    pub finished: bool,
    /// Pairs found so far.
    pub matched_pairs: usize,
    /// Pairs on the board.
    pub total_pairs: usize,
}

impl Snapshot {
    /// Snapshot of a session that has no board yet.
    pub fn empty(session_id: String, phase: SessionPhase) -> Self {
        Self {
            session_id,
            phase,
            tiles: Vec::new(),
            try_count: 0,
            finished: false,
            matched_pairs: 0,
            total_pairs: 0,
        }
    }

    /// Snapshot of a running game.
    pub fn of_game(session_id: String, phase: SessionPhase, game: &GameState) -> Self {
        let board = game.board();
        Self {
            session_id,
            phase,
            tiles: board.tiles().to_vec(),
            try_count: game.try_count(),
            finished: game.is_finished(),
            matched_pairs: board.matched_pairs(),
            total_pairs: board.total_pairs(),
        }
    }

    /// Number of tiles face up.
    pub fn flipped_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.is_flipped()).count()
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}
