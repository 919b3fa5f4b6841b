//! Bounded random sampling of instances and frames.
//!
//! The pipeline never scores a whole scan: it draws 10% of the pool, never
//! fewer than 10 and never more than the pool itself, uniformly without
//! replacement. The same rule applies across the frame axis of a
//! multi-frame instance.

use rand::rngs::StdRng;
use rand::{seq::index, Rng, SeedableRng};
use thiserror::Error;

use crate::piqe::PixelData;

/// Error type for sampling operations.
#[derive(Debug, Error)]
pub enum SampleError {
    /// The pool has no members to draw from.
    #[error("cannot sample from an empty pool")]
    EmptyPool,
    /// The pixel buffer rank is not handled by the pipeline.
    #[error("unsupported pixel buffer dimensionality: rank {0}")]
    UnsupportedDimensionality(usize),
}

/// Fraction of the pool to draw.
const SAMPLE_FRACTION: f64 = 0.1;
/// Lower bound on the draw, pool permitting.
const MIN_SAMPLE: usize = 10;

/// Sample size for a pool of `n`: `min(n, max(10, floor(0.1 * n)))`.
pub fn sample_size(n: usize) -> usize {
    n.min(MIN_SAMPLE.max((n as f64 * SAMPLE_FRACTION).floor() as usize))
}

/// A seedable uniform sampler.
///
/// Seed it for reproducible draws in tests; production use seeds from
/// entropy.
#[derive(Debug)]
pub struct Sampler {
    rng: StdRng,
}

impl Sampler {
    /// Sampler seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Sampler with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Derive an independent sampler, deterministically when `self` is
    /// seeded. Used to hand each parallel scoring task its own RNG.
    pub fn fork(&mut self) -> Sampler {
        Sampler::seeded(self.rng.gen())
    }

    /// Draw `sample_size(pool_size)` distinct indices in `0..pool_size`.
    pub fn sample_indices(&mut self, pool_size: usize) -> Result<Vec<usize>, SampleError> {
        if pool_size == 0 {
            return Err(SampleError::EmptyPool);
        }
        let amount = sample_size(pool_size);
        Ok(index::sample(&mut self.rng, pool_size, amount).into_vec())
    }

    /// Pick one index in `0..pool_size` uniformly.
    pub fn pick_one(&mut self, pool_size: usize) -> Result<usize, SampleError> {
        if pool_size == 0 {
            return Err(SampleError::EmptyPool);
        }
        Ok(self.rng.gen_range(0..pool_size))
    }

    /// Apply the sampling rule over the frame axis of a pixel buffer.
    ///
    /// `None` for a rank-2 (single-frame) buffer; a frame index sample for a
    /// rank-3 stack. Higher ranks are unsupported.
    pub fn sample_frames(&mut self, pixels: &PixelData) -> Result<Option<Vec<usize>>, SampleError> {
        match pixels.ndim() {
            2 => Ok(None),
            3 => self.sample_indices(pixels.shape()[0]).map(Some),
            n => Err(SampleError::UnsupportedDimensionality(n)),
        }
    }
}

impl Default for Sampler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    #[test]
    fn test_sample_size_rule() {
        for (pool, expected) in [(1, 1), (9, 9), (10, 10), (50, 10), (100, 10), (200, 20)] {
            assert_eq!(sample_size(pool), expected, "pool {}", pool);
        }
    }

    #[test]
    fn test_empty_pool_fails() {
        let mut sampler = Sampler::seeded(1);
        assert!(matches!(
            sampler.sample_indices(0),
            Err(SampleError::EmptyPool)
        ));
        assert!(matches!(sampler.pick_one(0), Err(SampleError::EmptyPool)));
    }

    #[test]
    fn test_indices_distinct_and_in_range() {
        let mut sampler = Sampler::seeded(7);
        let indices = sampler.sample_indices(200).unwrap();
        assert_eq!(indices.len(), 20);
        let mut sorted = indices.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 20);
        assert!(indices.iter().all(|&i| i < 200));
    }

    #[test]
    fn test_seeded_draws_reproducible() {
        let a = Sampler::seeded(99).sample_indices(50).unwrap();
        let b = Sampler::seeded(99).sample_indices(50).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_frame_sampling_by_rank() {
        let mut sampler = Sampler::seeded(3);

        let single = PixelData::U8(ArrayD::zeros(vec![32, 32]));
        assert!(sampler.sample_frames(&single).unwrap().is_none());

        let stack = PixelData::U8(ArrayD::zeros(vec![24, 32, 32]));
        let frames = sampler.sample_frames(&stack).unwrap().unwrap();
        assert_eq!(frames.len(), 10);
        assert!(frames.iter().all(|&f| f < 24));

        let four_d = PixelData::U8(ArrayD::zeros(vec![2, 24, 32, 32]));
        assert!(matches!(
            sampler.sample_frames(&four_d),
            Err(SampleError::UnsupportedDimensionality(4))
        ));
    }
}
