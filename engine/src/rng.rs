//! The session's single entropy source.
//!
//! Every probabilistic rule (dice, shuffles, corruption rolls, malfunction
//! checks) goes through [`GameRng`], so a seeded instance reproduces an
//! entire session deterministically.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::rules::Die;

#[derive(Debug)]
pub struct GameRng {
    inner: StdRng,
}

impl GameRng {
    pub fn new() -> Self {
        Self {
            inner: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Rolls a die, returning a value in `1..=sides`.
    pub fn roll(&mut self, die: Die) -> u8 {
        self.inner.gen_range(1..=die.sides())
    }

    /// Independent check succeeding with the given probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.inner.gen_bool(probability.clamp(0.0, 1.0))
    }

    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(&mut self.inner);
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        items.choose(&mut self.inner)
    }

    /// Uniform index into a non-empty collection.
    pub fn index(&mut self, len: usize) -> usize {
        self.inner.gen_range(0..len)
    }

    pub fn range(&mut self, low: i32, high: i32) -> i32 {
        self.inner.gen_range(low..high)
    }
}

impl Default for GameRng {
    fn default() -> Self {
        Self::new()
    }
}
