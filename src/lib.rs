//! # Memory Match
//!
//! Game-state engine for a tile-matching memory game.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       MEMORY MATCH                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── rng.rs      - Seeded xoroshiro128+ PRNG and shuffle     │
//! │  └── hash.rs     - Board and state fingerprints              │
//! │                                                              │
//! │  game/           - Game logic (deterministic, no timers)     │
//! │  ├── symbol.rs   - Symbol catalog                            │
//! │  ├── tile.rs     - Tile and tile state                       │
//! │  ├── board.rs    - Board generation                          │
//! │  ├── state.rs    - Flip state machine                        │
//! │  └── events.rs   - Game events                               │
//! │                                                              │
//! │  session/        - Runtime (timers, subscribers)             │
//! │  ├── game_session.rs - Session handle and manager            │
//! │  ├── scheduler.rs    - Delayed continuations                 │
//! │  └── protocol.rs     - Snapshots                             │
//! │                                                              │
//! │  config.rs       - Session configuration                     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Flow
//!
//! A session deals its board once. Each accepted flip turns a tile face
//! up; every second flip counts as a try and, after the resolve delay,
//! the pair is either matched or turned back. When the last pair is
//! matched the session signals completion after the finish delay.
//!
//! Given the same seed, the same board is dealt on every platform.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod session;

// Re-export commonly used types
pub use config::{ConfigError, SessionConfig};
pub use core::rng::DeterministicRng;
pub use game::{Board, Catalog, FlipOutcome, GameError, GameEvent, GameState, Symbol, Tile, TileState};
pub use session::{GameSession, ManualScheduler, SessionManager, SessionPhase, Snapshot, TokioScheduler};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
