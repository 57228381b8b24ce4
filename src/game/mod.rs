//! Game Logic Module
//!
//! Board generation and the flip state machine. Deterministic and free of
//! timers; the session layer drives the delayed steps.
//!
//! ## Module Structure
//!
//! - `symbol`: Symbol catalog
//! - `tile`: Tile and tile state
//! - `board`: Board generation and pairing invariants
//! - `state`: Flip sequencing, match detection, try counting
//! - `events`: Events emitted for subscribers
//! - `error`: Game errors

pub mod symbol;
pub mod tile;
pub mod board;
pub mod state;
pub mod events;
pub mod error;

// Re-export key types
pub use symbol::{Catalog, Symbol, REFERENCE_SYMBOLS};
pub use tile::{Tile, TileState};
pub use board::{Board, generate};
pub use state::{GameState, FlipOutcome, RejectReason, PendingResolution, Resolution, MAX_FLIPPED};
pub use events::{GameEvent, GameEventData};
pub use error::GameError;
