//! Game Errors
//!
//! Every failure here is a caller or programmer error; the engine does no I/O.

/// Errors raised by board generation and the flip state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// Board generation was asked for an impossible board.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Flip index outside the board.
    #[error("Tile index {index} out of range (board has {len} tiles)")]
    OutOfRange {
        /// Requested index.
        index: usize,
        /// Board length.
        len: usize,
    },

    /// A tile or board was found in a state the engine never produces.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}
