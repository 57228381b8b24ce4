//! Core deterministic primitives.
//!
//! Randomness and hashing shared by the board generator and the engine.

pub mod rng;
pub mod hash;

// Re-export core types
pub use rng::{DeterministicRng, derive_session_seed};
pub use hash::{StateHash, StateHasher, compute_state_hash};
