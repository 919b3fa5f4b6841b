//! Input validation for the quality scorer.

use super::types::{PiqeError, PixelData};

/// Validate a pixel buffer for scoring.
///
/// Accepts a non-empty, finite, real-valued buffer of rank 2, or rank 3 with
/// exactly 3 channels in the last axis (color). The supported sample types
/// are fixed by the [`PixelData`] enum (u8, u16, i16, f32, f64).
pub fn validate(image: &PixelData) -> Result<(), PiqeError> {
    if image.is_empty() {
        return Err(PiqeError::InvalidImage("image is empty".to_string()));
    }

    let (has_nan, has_inf) = image.has_non_finite();
    if has_nan {
        return Err(PiqeError::InvalidImage(
            "image contains NaN values".to_string(),
        ));
    }
    if has_inf {
        return Err(PiqeError::InvalidImage(
            "image contains infinite values".to_string(),
        ));
    }

    match image.ndim() {
        2 => Ok(()),
        3 if image.shape()[2] == 3 => Ok(()),
        3 => Err(PiqeError::InvalidImage(format!(
            "expected a 3-channel color image, got {} channels",
            image.shape()[2]
        ))),
        n => Err(PiqeError::InvalidImage(format!(
            "expected a 2-D or 3-D array, got rank {}",
            n
        ))),
    }
}
