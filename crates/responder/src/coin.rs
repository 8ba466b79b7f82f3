//! The randomness source: a two-sided coin.
//!
//! [`Coin`] is the port the responder draws from. [`SeededCoin`] is the
//! production implementation: one pseudo-random generator per process, seeded
//! once from the clock and shared by every request. [`FixedCoin`] always lands
//! on the same side and exists for deterministic tests.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Result of one flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Heads,
    Tails,
}

impl Outcome {
    /// Both sides of the coin, in draw order.
    pub const ALL: [Outcome; 2] = [Outcome::Heads, Outcome::Tails];

    /// Returns the wire value (`"heads"` or `"tails"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Heads => "heads",
            Self::Tails => "tails",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Port
// ---------------------------------------------------------------------------

/// Selects one of the two [`Outcome`]s.
///
/// Implementations are shared across concurrently running requests and must
/// tolerate simultaneous calls. A flip always succeeds.
pub trait Coin: Send + Sync {
    /// Draws one outcome.
    fn flip(&self) -> Outcome;
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

/// A uniformly random coin backed by a seeded [`StdRng`].
///
/// The generator sits behind a mutex that is held only for the single draw.
pub struct SeededCoin {
    rng: Mutex<StdRng>,
}

impl SeededCoin {
    /// Creates a coin seeded from the current time in nanoseconds since the
    /// Unix epoch.
    pub fn from_time() -> Self {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        Self::from_seed(nanos)
    }

    /// Creates a coin with an explicit seed. The same seed yields the same
    /// sequence of outcomes.
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Coin for SeededCoin {
    fn flip(&self) -> Outcome {
        // A panic cannot leave a StdRng half-updated, so a poisoned lock is
        // still usable.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Outcome::ALL[rng.random_range(0..Outcome::ALL.len())]
    }
}

impl std::fmt::Debug for SeededCoin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeededCoin").finish_non_exhaustive()
    }
}

/// A coin that always lands on the same side.
#[derive(Debug, Clone, Copy)]
pub struct FixedCoin(pub Outcome);

impl Coin for FixedCoin {
    fn flip(&self) -> Outcome {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_outcome_wire_values() {
        assert_eq!(Outcome::Heads.to_string(), "heads");
        assert_eq!(Outcome::Tails.as_str(), "tails");
        assert_eq!(serde_json::to_string(&Outcome::Heads).unwrap(), "\"heads\"");
    }

    #[test]
    fn test_both_sides_observed() {
        let coin = SeededCoin::from_time();
        let heads = (0..1000).filter(|_| coin.flip() == Outcome::Heads).count();
        assert!(heads > 0, "no heads in 1000 flips");
        assert!(heads < 1000, "no tails in 1000 flips");
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = SeededCoin::from_seed(42);
        let b = SeededCoin::from_seed(42);
        let seq_a: Vec<_> = (0..64).map(|_| a.flip()).collect();
        let seq_b: Vec<_> = (0..64).map(|_| b.flip()).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn test_concurrent_flips() {
        let coin = Arc::new(SeededCoin::from_seed(7));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coin = Arc::clone(&coin);
                std::thread::spawn(move || (0..500).map(|_| coin.flip()).collect::<Vec<_>>())
            })
            .collect();

        let mut total = 0;
        for handle in handles {
            let flips = handle.join().unwrap();
            total += flips.len();
        }
        assert_eq!(total, 4000);
    }

    #[test]
    fn test_fixed_coin() {
        let coin = FixedCoin(Outcome::Tails);
        assert!((0..10).all(|_| coin.flip() == Outcome::Tails));
    }
}
