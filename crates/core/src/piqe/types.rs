//! Pixel buffer and scorer output types.

use ndarray::{Array2, ArrayD, Axis};
use thiserror::Error;

/// Error type for the quality scorer.
#[derive(Debug, Error)]
pub enum PiqeError {
    /// The input image failed validation.
    #[error("invalid image: {0}")]
    InvalidImage(String),
}

/// A pixel buffer with its sample type preserved.
///
/// Rank 2 is a single grayscale image (H x W), rank 3 is either a color
/// image (H x W x 3, accepted by the scorer) or a multi-frame stack
/// (frames x H x W, handled by the scan pipeline one frame at a time).
#[derive(Debug, Clone)]
pub enum PixelData {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

impl PixelData {
    /// Shape of the underlying array.
    pub fn shape(&self) -> &[usize] {
        match self {
            PixelData::U8(a) => a.shape(),
            PixelData::U16(a) => a.shape(),
            PixelData::I16(a) => a.shape(),
            PixelData::F32(a) => a.shape(),
            PixelData::F64(a) => a.shape(),
        }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Total number of samples.
    pub fn len(&self) -> usize {
        self.shape().iter().product()
    }

    /// True when the buffer holds no samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample type name, for diagnostics.
    pub fn dtype_name(&self) -> &'static str {
        match self {
            PixelData::U8(_) => "u8",
            PixelData::U16(_) => "u16",
            PixelData::I16(_) => "i16",
            PixelData::F32(_) => "f32",
            PixelData::F64(_) => "f64",
        }
    }

    /// Convert to a double-precision array, preserving shape.
    pub fn to_f64(&self) -> ArrayD<f64> {
        match self {
            PixelData::U8(a) => a.mapv(f64::from),
            PixelData::U16(a) => a.mapv(f64::from),
            PixelData::I16(a) => a.mapv(f64::from),
            PixelData::F32(a) => a.mapv(f64::from),
            PixelData::F64(a) => a.clone(),
        }
    }

    /// Number of frames for a rank-3 stack (frame axis first), `None` for
    /// rank-2 buffers.
    pub fn num_frames(&self) -> Option<usize> {
        if self.ndim() == 3 {
            Some(self.shape()[0])
        } else {
            None
        }
    }

    /// Extract one frame of a rank-3 stack as a rank-2 buffer of the same
    /// sample type. `None` when the buffer is not rank 3 or the index is out
    /// of range.
    pub fn frame(&self, idx: usize) -> Option<PixelData> {
        if self.ndim() != 3 || idx >= self.shape()[0] {
            return None;
        }
        Some(match self {
            PixelData::U8(a) => PixelData::U8(a.index_axis(Axis(0), idx).to_owned()),
            PixelData::U16(a) => PixelData::U16(a.index_axis(Axis(0), idx).to_owned()),
            PixelData::I16(a) => PixelData::I16(a.index_axis(Axis(0), idx).to_owned()),
            PixelData::F32(a) => PixelData::F32(a.index_axis(Axis(0), idx).to_owned()),
            PixelData::F64(a) => PixelData::F64(a.index_axis(Axis(0), idx).to_owned()),
        })
    }

    /// True when any sample is NaN or infinite. Integer buffers are always
    /// finite.
    pub fn has_non_finite(&self) -> (bool, bool) {
        match self {
            PixelData::F32(a) => (
                a.iter().any(|v| v.is_nan()),
                a.iter().any(|v| v.is_infinite()),
            ),
            PixelData::F64(a) => (
                a.iter().any(|v| v.is_nan()),
                a.iter().any(|v| v.is_infinite()),
            ),
            _ => (false, false),
        }
    }
}

/// Result of scoring one image.
///
/// Masks always have the input's height and width, even when the image was
/// padded up to a block multiple internally.
#[derive(Debug, Clone)]
pub struct PiqeOutput {
    /// Distortion score in [0, 100]; higher is worse.
    pub score: f64,
    /// Active blocks affected by blocking / sudden artifacts.
    pub artifact_mask: Array2<bool>,
    /// Active blocks affected by Gaussian-noise-like distortion.
    pub noise_mask: Array2<bool>,
    /// Spatially active (salient) blocks.
    pub activity_mask: Array2<bool>,
}
