//! Tiles and the per-tile state machine.
//!
//! `Start -> Flipped -> {Start, Matched}`; `Matched` is terminal.

use std::fmt;
use serde::{Serialize, Deserialize};

use crate::game::error::GameError;
use crate::game::symbol::Symbol;

/// Visible state of a tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[repr(u8)]
pub enum TileState {
    /// Face down.
    #[default]
    Start = 0,
    /// Face up, waiting for its pair to resolve.
    Flipped = 1,
    /// Paired off; never changes again.
    Matched = 2,
}

impl TileState {
    /// Wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TileState::Start => "start",
            TileState::Flipped => "flipped",
            TileState::Matched => "matched",
        }
    }

    /// State from its numeric tag.
    pub fn from_index(index: u8) -> Result<TileState, GameError> {
        match index {
            0 => Ok(TileState::Start),
            1 => Ok(TileState::Flipped),
            2 => Ok(TileState::Matched),
            other => Err(GameError::InvalidState(format!("unknown tile state tag {}", other))),
        }
    }

    /// Whether `self -> next` is an edge of the tile state machine.
    pub fn can_transition_to(self, next: TileState) -> bool {
        matches!(
            (self, next),
            (TileState::Start, TileState::Flipped)
                | (TileState::Flipped, TileState::Start)
                | (TileState::Flipped, TileState::Matched)
        )
    }
}

impl fmt::Display for TileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<TileState> for String {
    fn from(state: TileState) -> Self {
        state.as_str().to_string()
    }
}

impl TryFrom<&str> for TileState {
    type Error = GameError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "start" => Ok(TileState::Start),
            "flipped" => Ok(TileState::Flipped),
            "matched" => Ok(TileState::Matched),
            other => Err(GameError::InvalidState(format!("unknown tile state '{}'", other))),
        }
    }
}

impl TryFrom<String> for TileState {
    type Error = GameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TileState::try_from(value.as_str())
    }
}

/// A single board tile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    /// Hidden symbol.
    pub content: Symbol,
    /// Current state.
    pub state: TileState,
}

impl Tile {
    /// A face-down tile.
    pub const fn new(content: Symbol) -> Self {
        Self {
            content,
            state: TileState::Start,
        }
    }

    /// Is the tile face up and unresolved?
    #[inline]
    pub fn is_flipped(&self) -> bool {
        self.state == TileState::Flipped
    }

    /// Has the tile been paired off?
    #[inline]
    pub fn is_matched(&self) -> bool {
        self.state == TileState::Matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_tile_starts_face_down() {
        let tile = Tile::new(Symbol(3));
        assert_eq!(tile.state, TileState::Start);
        assert!(!tile.is_flipped());
        assert!(!tile.is_matched());
        assert_eq!(TileState::default(), TileState::Start);
        assert_eq!(TileState::default() as u8, 0);
    }

    #[test]
    fn test_transitions() {
        assert!(TileState::Start.can_transition_to(TileState::Flipped));
        assert!(TileState::Flipped.can_transition_to(TileState::Start));
        assert!(TileState::Flipped.can_transition_to(TileState::Matched));

        assert!(!TileState::Start.can_transition_to(TileState::Matched));
        assert!(!TileState::Matched.can_transition_to(TileState::Start));
        assert!(!TileState::Matched.can_transition_to(TileState::Flipped));
        assert!(!TileState::Flipped.can_transition_to(TileState::Flipped));
    }

    #[test]
    fn test_from_index() {
        assert_eq!(TileState::from_index(0), Ok(TileState::Start));
        assert_eq!(TileState::from_index(2), Ok(TileState::Matched));
        assert!(matches!(TileState::from_index(3), Err(GameError::InvalidState(_))));
    }

    #[test]
    fn test_wire_tags() {
        assert_eq!(serde_json::to_string(&TileState::Flipped).unwrap(), "\"flipped\"");

        let parsed: TileState = serde_json::from_str("\"matched\"").unwrap();
        assert_eq!(parsed, TileState::Matched);

        let err = serde_json::from_str::<TileState>("\"sideways\"").unwrap_err();
        assert!(err.to_string().contains("Invalid state"));
    }
}
