use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Source of every random draw the simulation makes.
///
/// The engine owns exactly one source and draws from it only inside a
/// transition, so implementations need no interior synchronization.
pub trait RandomSource {
    /// Uniform draw in `[0, 1)`.
    fn uniform(&mut self) -> f64;

    fn standard_normal(&mut self) -> f64;

    /// Uniform draw in `[lo, hi)`.
    fn uniform_between(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.uniform()
    }

    /// Uniform index in `0..len`; `len` must be non-zero.
    fn index(&mut self, len: usize) -> usize;

    /// Uniform integer in `lo..hi`; requires `lo < hi`.
    fn int_between(&mut self, lo: u64, hi: u64) -> u64;
}

#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }

    fn int_between(&mut self, lo: u64, hi: u64) -> u64 {
        self.rng.gen_range(lo..hi)
    }
}

#[cfg(test)]
pub(crate) mod scripted {
    use std::collections::VecDeque;

    use super::RandomSource;

    /// Replays queued draws, falling back to fixed values once a queue is empty.
    ///
    /// The uniform fallback sits above any sane news probability so ticks stay
    /// quiet unless a test queues a firing draw.
    #[derive(Debug, Default)]
    pub(crate) struct ScriptedRandom {
        pub(crate) uniforms: VecDeque<f64>,
        pub(crate) normals: VecDeque<f64>,
        pub(crate) indices: VecDeque<usize>,
        pub(crate) ints: VecDeque<u64>,
    }

    impl ScriptedRandom {
        pub(crate) fn quiet() -> Self {
            Self::default()
        }

        pub(crate) fn push_normals(&mut self, draws: &[f64]) -> &mut Self {
            self.normals.extend(draws.iter().copied());
            self
        }

        pub(crate) fn push_uniforms(&mut self, draws: &[f64]) -> &mut Self {
            self.uniforms.extend(draws.iter().copied());
            self
        }

        pub(crate) fn push_indices(&mut self, draws: &[usize]) -> &mut Self {
            self.indices.extend(draws.iter().copied());
            self
        }

        pub(crate) fn push_ints(&mut self, draws: &[u64]) -> &mut Self {
            self.ints.extend(draws.iter().copied());
            self
        }
    }

    impl RandomSource for ScriptedRandom {
        fn uniform(&mut self) -> f64 {
            self.uniforms.pop_front().unwrap_or(0.999)
        }

        fn standard_normal(&mut self) -> f64 {
            self.normals.pop_front().unwrap_or(0.0)
        }

        fn index(&mut self, len: usize) -> usize {
            self.indices.pop_front().unwrap_or(0) % len
        }

        fn int_between(&mut self, lo: u64, hi: u64) -> u64 {
            self.ints.pop_front().unwrap_or(lo).clamp(lo, hi - 1)
        }
    }
}
