//! Seeded randomness for dealing boards.
//!
//! xoroshiro128+ seeded through SplitMix64. A seed always deals the same
//! board, on any platform, so a session can be replayed from its seed.

use sha2::{Sha256, Digest};

/// xoroshiro128+ generator (rotate 24, shift 16, rotate 37).
///
/// ```
/// use memory_match::core::rng::DeterministicRng;
///
/// let mut deck = [1, 2, 3, 4];
/// DeterministicRng::new(7).shuffle(&mut deck);
///
/// let mut again = [1, 2, 3, 4];
/// DeterministicRng::new(7).shuffle(&mut again);
/// assert_eq!(deck, again);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeterministicRng {
    s: [u64; 2],
}

impl DeterministicRng {
    /// Generator for `seed`. Any seed is fine, zero included.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let s = [splitmix64(&mut sm), splitmix64(&mut sm)];

        // The all-zero state is a fixed point.
        if s == [0, 0] {
            return Self { s: [1, 1] };
        }
        Self { s }
    }

    /// Generator keyed by a session id. See [`derive_session_seed`].
    pub fn for_session(session_id: &[u8; 16]) -> Self {
        Self::new(derive_session_seed(session_id))
    }

    /// Next raw output.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let [a, mut b] = self.s;
        let out = a.wrapping_add(b);

        b ^= a;
        self.s = [a.rotate_left(24) ^ b ^ (b << 16), b.rotate_left(37)];
        out
    }

    /// Uniform value in `0..bound`; 0 when `bound` is 0.
    pub fn next_below(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        // Outputs at or above the last full multiple of `bound` are redrawn.
        let limit = u64::MAX - u64::MAX % bound;
        loop {
            let draw = self.next_u64();
            if draw < limit {
                return draw % bound;
            }
        }
    }

    /// Uniform in-place permutation (Fisher–Yates, high to low).
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for hi in (1..items.len()).rev() {
            let pick = self.next_below(hi as u64 + 1) as usize;
            items.swap(hi, pick);
        }
    }
}

#[inline]
fn splitmix64(x: &mut u64) -> u64 {
    *x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Shuffle seed for a session without an explicit one.
///
/// Session ids are random UUIDs, so the seed is unpredictable before the
/// session exists but reproducible from the id afterwards.
pub fn derive_session_seed(session_id: &[u8; 16]) -> u64 {
    let digest = Sha256::new()
        .chain_update(b"MEMORY_MATCH_SEED_V1")
        .chain_update(session_id)
        .finalize();

    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn dealt(seed: u64, n: u32) -> Vec<u32> {
        let mut deck: Vec<u32> = (0..n).collect();
        DeterministicRng::new(seed).shuffle(&mut deck);
        deck
    }

    #[test]
    fn test_seed_fixes_sequence() {
        let mut a = DeterministicRng::new(404);
        let mut b = a.clone();
        let xs: Vec<u64> = (0..256).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..256).map(|_| b.next_u64()).collect();
        assert_eq!(xs, ys);

        assert_ne!(DeterministicRng::new(1).next_u64(), DeterministicRng::new(2).next_u64());
    }

    #[test]
    fn test_xoroshiro_step() {
        let mut rng = DeterministicRng { s: [1, 2] };
        assert_eq!(rng.next_u64(), 3);
        assert_eq!(rng.s, [(1 << 24) ^ 3 ^ (3 << 16), 3u64.rotate_left(37)]);
    }

    #[test]
    fn test_zero_seed_is_usable() {
        let mut rng = DeterministicRng::new(0);
        let first = rng.next_u64();
        assert_ne!(first, rng.next_u64());
    }

    #[test]
    fn test_next_below_bounds() {
        let mut rng = DeterministicRng::new(9);
        assert_eq!(rng.next_below(0), 0);
        assert_eq!(rng.next_below(1), 0);
        assert!((0..2000).all(|_| rng.next_below(7) < 7));
    }

    #[test]
    fn test_shuffle_keeps_every_tile() {
        let mut deck = dealt(2024, 20);
        assert_ne!(deck, (0..20).collect::<Vec<_>>());
        deck.sort_unstable();
        assert_eq!(deck, (0..20).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_deal() {
        assert_eq!(dealt(31, 16), dealt(31, 16));
        assert_ne!(dealt(31, 16), dealt(32, 16));
    }

    #[test]
    fn test_shuffle_reaches_every_ordering() {
        // Three tiles have six orderings; all must show up.
        let mut rng = DeterministicRng::new(77);
        let seen: BTreeSet<[u8; 3]> = (0..600)
            .map(|_| {
                let mut trio = [0u8, 1, 2];
                rng.shuffle(&mut trio);
                trio
            })
            .collect();
        assert_eq!(seen.len(), 6);
    }

    #[test]
    fn test_short_slices_untouched() {
        let mut rng = DeterministicRng::new(5);
        let mut empty: [u8; 0] = [];
        rng.shuffle(&mut empty);
        let mut one = [42];
        rng.shuffle(&mut one);
        assert_eq!(one, [42]);
    }

    #[test]
    fn test_session_seed() {
        assert_eq!(derive_session_seed(&[1; 16]), derive_session_seed(&[1; 16]));
        assert_ne!(derive_session_seed(&[1; 16]), derive_session_seed(&[2; 16]));
        assert_eq!(
            DeterministicRng::for_session(&[3; 16]),
            DeterministicRng::new(derive_session_seed(&[3; 16]))
        );
    }
}
