//! Deterministic random number generation.
//!
//! RULE: Nothing in the game core may call any platform RNG.
//! All randomness flows through GameRng streams derived from the
//! game's base seed string plus a purpose suffix.
//!
//! Each purpose (daily cards, daily events, consequence delays, event
//! amounts) gets its own stream, seeded from FNV-1a(base_seed + purpose).
//! This means:
//!   - Draws for unrelated purposes never interleave or influence each other.
//!   - Identical seed + purpose reproduces the identical sequence, forever,
//!     across processes.

use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;

/// A named, deterministic RNG for a single purpose.
pub struct GameRng {
    pub purpose: String,
    inner: Pcg64Mcg,
}

impl GameRng {
    /// Derive a stream from the game's base seed and a purpose suffix,
    /// e.g. `GameRng::for_purpose(seed, &format!("-cards-{date}"))`.
    pub fn for_purpose(base_seed: &str, purpose: &str) -> Self {
        let derived = fnv1a_64(base_seed.as_bytes(), purpose.as_bytes());
        Self {
            purpose: purpose.to_string(),
            inner: Pcg64Mcg::seed_from_u64(derived),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        use rand::RngCore;
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Draw a raw u64 (full range).
    pub fn next_u64(&mut self) -> u64 {
        use rand::RngCore;
        self.inner.next_u64()
    }

    /// Roll a u64 in [0, n).
    pub fn next_u64_below(&mut self, n: u64) -> u64 {
        use rand::RngCore;
        assert!(n > 0, "n must be > 0");
        self.inner.next_u64() % n
    }

    /// Roll an i64 in [lo, hi] inclusive.
    pub fn range_i64(&mut self, lo: i64, hi: i64) -> i64 {
        assert!(lo <= hi, "range_i64: lo > hi");
        let span = (hi - lo) as u64 + 1;
        lo + self.next_u64_below(span) as i64
    }

    /// Bernoulli trial: returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    /// Pick one index from a weight table, proportional to weight.
    /// Returns None when every weight is zero or the table is empty.
    pub fn weighted_index(&mut self, weights: &[f64]) -> Option<usize> {
        let total: f64 = weights.iter().filter(|w| **w > 0.0).sum();
        if total <= 0.0 {
            return None;
        }
        let mut roll = self.next_f64() * total;
        for (i, w) in weights.iter().enumerate() {
            if *w <= 0.0 {
                continue;
            }
            if roll < *w {
                return Some(i);
            }
            roll -= *w;
        }
        // Float rounding can leave a sliver; fall back to the last
        // positive-weight entry.
        weights.iter().rposition(|w| *w > 0.0)
    }
}

/// FNV-1a over two byte slices, folded into one u64 seed.
/// Stable across platforms and releases — never change the constants.
fn fnv1a_64(a: &[u8], b: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in a.iter().chain(b.iter()) {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = GameRng::for_purpose("seed-1", "-events-2024-03-01");
        let mut b = GameRng::for_purpose("seed-1", "-events-2024-03-01");
        for _ in 0..64 {
            assert_eq!(a.next_u64(), b.next_u64());
        }
    }

    #[test]
    fn purposes_do_not_interleave() {
        let mut cards = GameRng::for_purpose("seed-1", "-cards-2024-03-01");
        let mut events = GameRng::for_purpose("seed-1", "-events-2024-03-01");
        assert_ne!(cards.next_u64(), events.next_u64());
    }

    #[test]
    fn weighted_index_respects_zero_weights() {
        let mut rng = GameRng::for_purpose("seed-w", "-test");
        for _ in 0..100 {
            let idx = rng.weighted_index(&[0.0, 5.0, 0.0]).unwrap();
            assert_eq!(idx, 1);
        }
        assert!(rng.weighted_index(&[0.0, 0.0]).is_none());
        assert!(rng.weighted_index(&[]).is_none());
    }
}
