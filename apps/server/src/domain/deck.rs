//! Deck construction and seeded shuffling.
//!
//! The shuffle is deterministic given a seed so tests can drive exact
//! decks; live games seed from OS entropy (`rand::random`).

use crate::domain::cards::{Card, Rank, Suit};

/// All 40 cards in a fixed enumeration order (suits then ranks).
pub fn full_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(40);
    for suit in Suit::ALL {
        for rank in Rank::ALL {
            deck.push(Card::new(suit, rank));
        }
    }
    deck
}

/// SplitMix64: well-distributed 64-bit generator, fast and deterministic
/// given a seed. Predictability is not a security concern here, only
/// statistical uniformity.
pub(crate) struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub(crate) fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z ^= z >> 30;
        z = z.wrapping_mul(0xBF58476D1CE4E5B9);
        z ^= z >> 27;
        z = z.wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }

    /// Uniform value in `0..max` via rejection sampling (no modulo bias).
    pub(crate) fn next_range(&mut self, max: usize) -> usize {
        let m = max as u64;
        let limit = u64::MAX - (u64::MAX % m);
        loop {
            let x = self.next();
            if x < limit {
                return (x % m) as usize;
            }
        }
    }
}

/// Fisher-Yates shuffle.
pub(crate) fn shuffle(deck: &mut [Card], rng: &mut SplitMix64) {
    for i in (1..deck.len()).rev() {
        let j = rng.next_range(i + 1);
        deck.swap(i, j);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn deck_has_forty_unique_cards() {
        let deck = full_deck();
        assert_eq!(deck.len(), 40);
        let ids: HashSet<String> = deck.iter().map(Card::id).collect();
        assert_eq!(ids.len(), 40);
    }

    #[test]
    fn deck_points_total_120() {
        let total: u16 = full_deck().iter().map(|c| c.value()).sum();
        assert_eq!(total, 120);
    }

    #[test]
    fn shuffle_is_deterministic_per_seed() {
        let mut a = full_deck();
        let mut b = full_deck();
        shuffle(&mut a, &mut SplitMix64::new(42));
        shuffle(&mut b, &mut SplitMix64::new(42));
        assert_eq!(a, b);

        let mut c = full_deck();
        shuffle(&mut c, &mut SplitMix64::new(43));
        assert_ne!(a, c);
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut deck = full_deck();
        shuffle(&mut deck, &mut SplitMix64::new(7));
        let ids: HashSet<String> = deck.iter().map(Card::id).collect();
        assert_eq!(ids.len(), 40);
    }
}
