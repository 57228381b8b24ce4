//! State Hashing
//!
//! Deterministic SHA-256 hashing of boards and game state for:
//! - Log correlation (board fingerprints)
//! - Checking that a rejected flip left the state untouched
//! - Confirming a memoized board is the one handed out before

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for game state.
///
/// Order of updates is significant.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for a board layout (symbols only).
    pub fn for_board_layout() -> Self {
        Self::new(b"MEMORY_MATCH_BOARD_V1")
    }

    /// Create hasher for full game state.
    pub fn for_game_state() -> Self {
        Self::new(b"MEMORY_MATCH_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u16 value (little-endian).
    #[inline]
    pub fn update_u16(&mut self, value: u16) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute a hash seeded with the board length.
///
/// The closure adds the per-tile data.
pub fn compute_state_hash<F>(mut hasher: StateHasher, tile_count: usize, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    hasher.update_u32(tile_count as u32);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Short hex prefix of a hash, for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..6])
}

// =============================================================================
// TESTS
// =============================================================================
