use core::ops::Range;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Picks the slot a random write replaces.
pub trait VictimPolicy {
    /// Choose a slot from `slots`, which is never empty.
    fn choose(&mut self, slots: Range<usize>) -> usize;
}

/// Pseudo-random replacement, modelling the r3000 `Random` register.
#[derive(Debug, Clone)]
pub struct RandomVictim {
    rng: SmallRng,
}

impl RandomVictim {
    pub const DEFAULT_SEED: u64 = 0x7362_3030_6d69_7073;

    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomVictim {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

impl VictimPolicy for RandomVictim {
    fn choose(&mut self, slots: Range<usize>) -> usize {
        self.rng.gen_range(slots)
    }
}

/// Cycles through the eligible slots in order. Deterministic; used by tests.
#[derive(Debug, Clone, Default)]
pub struct RoundRobinVictim {
    next: usize,
}

impl RoundRobinVictim {
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }
}

impl VictimPolicy for RoundRobinVictim {
    fn choose(&mut self, slots: Range<usize>) -> usize {
        if !slots.contains(&self.next) {
            self.next = slots.start;
        }
        let slot = self.next;
        self.next = if slot + 1 < slots.end {
            slot + 1
        } else {
            slots.start
        };
        slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robin_wraps_within_range() {
        let mut rr = RoundRobinVictim::new();
        let picks: Vec<_> = (0..5).map(|_| rr.choose(8..11)).collect();
        assert_eq!(picks, [8, 9, 10, 8, 9]);
    }

    #[test]
    fn random_stays_in_range_and_is_reproducible() {
        let mut a = RandomVictim::new(42);
        let mut b = RandomVictim::new(42);
        for _ in 0..1000 {
            let slot = a.choose(8..64);
            assert!((8..64).contains(&slot));
            assert_eq!(slot, b.choose(8..64));
        }
    }
}
