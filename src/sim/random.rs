//! Injectable randomness for the simulators.
//!
//! Every simulator draws through [`RandomSource`] instead of a global RNG, so a
//! run can be made reproducible by seeding (`SIM_SEED`) or scripted outright
//! in tests.

use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait RandomSource: Send + Sync {
    /// Uniform draw in [0, 1).
    fn next_unit(&self) -> f64;

    /// Uniform draw in [lo, hi).
    fn uniform(&self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_unit()
    }

    /// Uniform integer in [lo, hi].
    fn uniform_int(&self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        let span = f64::from(hi - lo) + 1.0;
        let offset = (self.next_unit() * span).floor() as u32;
        lo + offset.min(hi - lo)
    }
}

/// `StdRng` behind a mutex. Seeded for reproducible runs, entropy otherwise.
pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng: Mutex::new(rng) }
    }
}

impl RandomSource for SeededSource {
    fn next_unit(&self) -> f64 {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of unit draws, cycling when exhausted.
#[cfg(test)]
pub struct ScriptedSource {
    values: Vec<f64>,
    cursor: Mutex<usize>,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "scripted source needs at least one value");
        Self { values, cursor: Mutex::new(0) }
    }

    /// Always returns `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

#[cfg(test)]
impl RandomSource for ScriptedSource {
    fn next_unit(&self) -> f64 {
        let mut cursor = self.cursor.lock().unwrap_or_else(PoisonError::into_inner);
        let v = self.values[*cursor % self.values.len()];
        *cursor += 1;
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let a = SeededSource::new(Some(42));
        let b = SeededSource::new(Some(42));
        for _ in 0..16 {
            assert_eq!(a.next_unit().to_bits(), b.next_unit().to_bits());
        }
    }

    #[test]
    fn uniform_stays_in_range() {
        let src = SeededSource::new(Some(7));
        for _ in 0..1_000 {
            let v = src.uniform(-0.05, 0.05);
            assert!((-0.05..0.05).contains(&v), "v={v}");
            let n = src.uniform_int(50_000, 70_000);
            assert!((50_000..=70_000).contains(&n), "n={n}");
        }
    }

    #[test]
    fn uniform_int_hits_both_ends() {
        assert_eq!(ScriptedSource::constant(0.0).uniform_int(10, 20), 10);
        assert_eq!(ScriptedSource::constant(0.999_999).uniform_int(10, 20), 20);
        assert_eq!(ScriptedSource::constant(0.5).uniform_int(5, 5), 5);
    }

    #[test]
    fn scripted_source_cycles() {
        let src = ScriptedSource::new(vec![0.1, 0.9]);
        assert_eq!(src.next_unit(), 0.1);
        assert_eq!(src.next_unit(), 0.9);
        assert_eq!(src.next_unit(), 0.1);
    }
}
