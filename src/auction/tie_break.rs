//! Tie-break resolution
//!
//! All randomness of a clearing run goes through one [`TieBreaker`]. The
//! production one is still seeded: the seed is drawn from OS entropy and
//! recorded in the outcome, so any run can be replayed.
use super::ClearingError;
use rand::{rngs::OsRng, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub trait TieBreaker {
    /// Pick one of `candidates` (`> 0`), uniformly
    fn choose(&mut self, candidates: usize) -> usize;

    /// Seed to replay the same choices, if there is one
    fn seed(&self) -> Option<u64> {
        None
    }
}

pub struct SeededTieBreaker {
    seed: u64,
    rng: ChaCha8Rng,
}

impl SeededTieBreaker {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self::with_seed(OsRng.next_u64())
    }
}

impl TieBreaker for SeededTieBreaker {
    fn choose(&mut self, candidates: usize) -> usize {
        if candidates <= 1 {
            return 0;
        }
        self.rng.gen_range(0..candidates)
    }

    fn seed(&self) -> Option<u64> {
        Some(self.seed)
    }
}

/// Ask `tie_breaker` for a candidate and make sure the answer is usable
pub fn resolve(tie_breaker: &mut dyn TieBreaker, candidates: usize) -> Result<usize, ClearingError> {
    if candidates == 0 {
        return Err(ClearingError::TieUnresolved {
            candidates,
            picked: 0,
        });
    }
    let picked = tie_breaker.choose(candidates);
    if picked >= candidates {
        return Err(ClearingError::TieUnresolved { candidates, picked });
    }
    Ok(picked)
}

/// Fisher-Yates shuffle driven by `tie_breaker`
pub fn shuffle<T>(tie_breaker: &mut dyn TieBreaker, items: &mut [T]) {
    for i in (1..items.len()).rev() {
        let j = tie_breaker.choose(i + 1).min(i);
        items.swap(i, j);
    }
}
