//! Random sources for the outcome resolvers.
//!
//! - `EntropySource`: draws from the thread-local, OS-seeded generator on
//!   every call. Nothing about a draw can be predicted from earlier ones.
//! - `SeededSource`: a `SmallRng` for reproducible simulation runs.
//! - `ScriptedSource`: replays fixed values, for deterministic tests.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use wmm_core::traits::RandomSource;

/// Fresh entropy on every draw. The production source.
#[derive(Debug, Default, Clone, Copy)]
pub struct EntropySource;

impl RandomSource for EntropySource {
    fn uniform(&mut self) -> f64 {
        rand::rng().random::<f64>()
    }

    fn standard_normal(&mut self) -> f64 {
        rand::rng().sample(StandardNormal)
    }

    fn index(&mut self, len: usize) -> usize {
        rand::rng().random_range(0..len.max(1))
    }
}

/// A reproducible source seeded once at construction.
#[derive(Debug, Clone)]
pub struct SeededSource {
    rng: SmallRng,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }
}

impl RandomSource for SeededSource {
    fn uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    fn standard_normal(&mut self) -> f64 {
        self.rng.sample(StandardNormal)
    }

    fn index(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len.max(1))
    }
}

/// Replays scripted values, cycling when exhausted.
///
/// An empty script yields `0.0` / index `0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    uniforms: Vec<f64>,
    normals: Vec<f64>,
    indices: Vec<usize>,
    cursor: [usize; 3],
}

impl ScriptedSource {
    /// A source whose uniform draws cycle through `values`.
    pub fn new(uniforms: impl Into<Vec<f64>>) -> Self {
        Self {
            uniforms: uniforms.into(),
            ..Self::default()
        }
    }

    pub fn with_normals(mut self, values: impl Into<Vec<f64>>) -> Self {
        self.normals = values.into();
        self
    }

    pub fn with_indices(mut self, values: impl Into<Vec<usize>>) -> Self {
        self.indices = values.into();
        self
    }

    fn next<T: Copy + Default>(values: &[T], cursor: &mut usize) -> T {
        if values.is_empty() {
            return T::default();
        }
        let value = values[*cursor % values.len()];
        *cursor += 1;
        value
    }
}

impl RandomSource for ScriptedSource {
    fn uniform(&mut self) -> f64 {
        Self::next(&self.uniforms, &mut self.cursor[0])
    }

    fn standard_normal(&mut self) -> f64 {
        Self::next(&self.normals, &mut self.cursor[1])
    }

    fn index(&mut self, len: usize) -> usize {
        Self::next(&self.indices, &mut self.cursor[2]) % len.max(1)
    }
}
