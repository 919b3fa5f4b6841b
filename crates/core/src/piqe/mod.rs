//! Perception-based image quality evaluator (PIQE).
//!
//! A no-reference quality metric: the image is normalized by its local mean
//! and deviation, partitioned into non-overlapping 16x16 blocks, and each
//! spatially active block is tested for blocking artifacts and Gaussian
//! noise. Only active blocks contribute to the final distortion score.
//!
//! The score is a scalar in [0, 100] where 0 is excellent and 100 is bad.
//! A uniform image has no active blocks and scores exactly 100.

mod engine;
mod types;
mod validate;

pub use engine::score;
pub use types::{PiqeError, PiqeOutput, PixelData};
pub use validate::validate;
