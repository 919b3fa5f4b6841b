//! Block-based scoring engine.
//!
//! Pipeline: validate, pad to a block multiple (symmetric mirror), collapse
//! color to luminance, rescale to 0-255, normalize by a 7x7 Gaussian local
//! mean/deviation, then classify each 16x16 tile of the normalized image.

use ndarray::{s, Array2, Array3, ArrayView2};

use super::types::{PiqeError, PiqeOutput, PixelData};
use super::validate::validate;

/// Side of the square analysis block.
const BLOCK_SIZE: usize = 16;
/// Variance threshold above which a block counts as spatially active.
const ACTIVITY_THRESHOLD: f64 = 0.1;
/// Segment deviation threshold below which a block edge looks impaired.
const BLOCK_IMPAIRED_THRESHOLD: f64 = 0.1;
/// Length of one overlapping edge segment.
const WINDOW_SIZE: usize = 6;
/// Stability constant in the final score.
const STABILITY_C: f64 = 1.0;

/// Compute the PIQE score and spatial quality masks for one image.
///
/// The score is in [0, 100] (0 excellent, 100 bad). The returned masks have
/// the input's height and width regardless of internal padding. A uniform
/// image has no active blocks and scores exactly 100.
pub fn score(image: &PixelData) -> Result<PiqeOutput, PiqeError> {
    validate(image)?;

    let gray = to_gray(image)?;
    let (rows, cols) = gray.dim();

    let padded = pad_to_block_multiple(&gray);
    let rescaled = rescale_to_255(padded);

    // Local zero-mean, ~unit-deviation normalization with a circularly
    // symmetric Gaussian weighting sampled out to 3 standard deviations.
    let mu = gaussian_blur_7(&rescaled);
    let squared_blur = gaussian_blur_7(&(&rescaled * &rescaled));
    let mut norm = Array2::<f64>::zeros(rescaled.dim());
    ndarray::Zip::from(&mut norm)
        .and(&rescaled)
        .and(&mu)
        .and(&squared_blur)
        .for_each(|n, &x, &m, &sq| {
            let sigma = (sq - m * m).abs().sqrt();
            *n = (x - m) / (sigma + 1.0);
        });

    let (padded_rows, padded_cols) = norm.dim();
    let mut artifact_mask = Array2::from_elem((padded_rows, padded_cols), false);
    let mut noise_mask = Array2::from_elem((padded_rows, padded_cols), false);
    let mut activity_mask = Array2::from_elem((padded_rows, padded_cols), false);

    let mut distortion = 0.0;
    let mut active_blocks = 0usize; // NHSA

    for block_row in (0..padded_rows).step_by(BLOCK_SIZE) {
        for block_col in (0..padded_cols).step_by(BLOCK_SIZE) {
            let region = s![
                block_row..block_row + BLOCK_SIZE,
                block_col..block_col + BLOCK_SIZE
            ];
            let block = norm.slice(region);
            let values: Vec<f64> = block.iter().copied().collect();
            let variance = sample_variance(&values);

            if variance <= ACTIVITY_THRESHOLD {
                continue;
            }
            activity_mask.slice_mut(region).fill(true);
            active_blocks += 1;

            let impaired = block_impaired(&block);
            if impaired {
                artifact_mask.slice_mut(region).fill(true);
            }

            let block_sigma = variance.sqrt();
            let center_sur_dev = center_surround_deviation(&block);
            let block_beta =
                (block_sigma - center_sur_dev).abs() / block_sigma.max(center_sur_dev);
            let noisy = block_sigma > 2.0 * block_beta;
            if noisy {
                noise_mask.slice_mut(region).fill(true);
            }

            // An active block that is both impaired and noisy contributes
            // both terms.
            if impaired {
                distortion += 1.0 - variance;
            }
            if noisy {
                distortion += variance;
            }
        }
    }

    let score = ((distortion + STABILITY_C) / (STABILITY_C + active_blocks as f64)) * 100.0;

    Ok(PiqeOutput {
        score,
        artifact_mask: artifact_mask.slice(s![..rows, ..cols]).to_owned(),
        noise_mask: noise_mask.slice(s![..rows, ..cols]).to_owned(),
        activity_mask: activity_mask.slice(s![..rows, ..cols]).to_owned(),
    })
}

/// Collapse a validated buffer to a rank-2 double-precision image, applying
/// Rec.601 luminance weights to color input.
fn to_gray(image: &PixelData) -> Result<Array2<f64>, PiqeError> {
    let arr = image.to_f64();
    if arr.ndim() == 2 {
        return arr
            .into_dimensionality()
            .map_err(|_| PiqeError::InvalidImage("expected a 2-D array".to_string()));
    }
    let rgb: Array3<f64> = arr
        .into_dimensionality()
        .map_err(|_| PiqeError::InvalidImage("expected an H x W x 3 array".to_string()))?;
    let (h, w, _) = rgb.dim();
    let mut gray = Array2::zeros((h, w));
    for r in 0..h {
        for c in 0..w {
            gray[[r, c]] =
                0.299 * rgb[[r, c, 0]] + 0.587 * rgb[[r, c, 1]] + 0.114 * rgb[[r, c, 2]];
        }
    }
    Ok(gray)
}

/// Pad the bottom and right with a symmetric (edge-including mirror)
/// extension until both dimensions are block multiples. Images smaller than
/// one block are padded up to a full block.
fn pad_to_block_multiple(image: &Array2<f64>) -> Array2<f64> {
    let (rows, cols) = image.dim();
    let pad_rows = (BLOCK_SIZE - rows % BLOCK_SIZE) % BLOCK_SIZE;
    let pad_cols = (BLOCK_SIZE - cols % BLOCK_SIZE) % BLOCK_SIZE;
    if pad_rows == 0 && pad_cols == 0 {
        return image.clone();
    }
    Array2::from_shape_fn((rows + pad_rows, cols + pad_cols), |(r, c)| {
        image[[mirror_index(r, rows), mirror_index(c, cols)]]
    })
}

/// Symmetric extension index: [a b c] extends to [a b c | c b a | a b c ...].
fn mirror_index(i: usize, n: usize) -> usize {
    let m = i % (2 * n);
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}

/// Scale samples to 0-255 by the image maximum and round. An image whose
/// maximum is zero stays as-is (it is uniform and scores 100 either way).
fn rescale_to_255(mut image: Array2<f64>) -> Array2<f64> {
    let max = image.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max != 0.0 {
        image.mapv_inplace(|v| (255.0 * v / max).round());
    }
    image
}

/// 7-tap Gaussian kernel, sigma = 7/6, normalized to unit sum.
fn gaussian_kernel_7() -> [f64; 7] {
    let sigma = 7.0 / 6.0;
    let mut kernel = [0.0; 7];
    let mut sum = 0.0;
    for (i, tap) in kernel.iter_mut().enumerate() {
        let x = i as f64 - 3.0;
        *tap = (-x * x / (2.0 * sigma * sigma)).exp();
        sum += *tap;
    }
    for tap in kernel.iter_mut() {
        *tap /= sum;
    }
    kernel
}

/// Separable 7x7 Gaussian blur with replicated borders.
fn gaussian_blur_7(image: &Array2<f64>) -> Array2<f64> {
    let kernel = gaussian_kernel_7();
    let (rows, cols) = image.dim();

    let mut horizontal = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (t, tap) in kernel.iter().enumerate() {
                let cc = clamp_index(c as isize + t as isize - 3, cols);
                acc += tap * image[[r, cc]];
            }
            horizontal[[r, c]] = acc;
        }
    }

    let mut blurred = Array2::zeros((rows, cols));
    for r in 0..rows {
        for c in 0..cols {
            let mut acc = 0.0;
            for (t, tap) in kernel.iter().enumerate() {
                let rr = clamp_index(r as isize + t as isize - 3, rows);
                acc += tap * horizontal[[rr, c]];
            }
            blurred[[r, c]] = acc;
        }
    }
    blurred
}

fn clamp_index(i: isize, n: usize) -> usize {
    i.clamp(0, n as isize - 1) as usize
}

/// Sample variance with ddof = 1. NaN for fewer than two samples.
fn sample_variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return f64::NAN;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64
}

fn sample_std(values: &[f64]) -> f64 {
    sample_variance(values).sqrt()
}

/// Artifact test: any overlapping 6-pixel segment on any of the four block
/// edges with a deviation below the impairment threshold marks the block.
fn block_impaired(block: &ArrayView2<f64>) -> bool {
    let n = block.nrows();
    let edges = [
        block.row(0).to_vec(),
        block.column(n - 1).to_vec(),
        block.row(n - 1).to_vec(),
        block.column(0).to_vec(),
    ];
    let n_segments = n - WINDOW_SIZE + 1;
    for edge in &edges {
        for start in 0..n_segments {
            if sample_std(&edge[start..start + WINDOW_SIZE]) < BLOCK_IMPAIRED_THRESHOLD {
                return true;
            }
        }
    }
    false
}

/// Ratio of the deviation of the two innermost columns to the deviation of
/// the remaining columns. An undefined (NaN) ratio collapses to 0, which
/// covers degenerate single-column surrounds.
fn center_surround_deviation(block: &ArrayView2<f64>) -> f64 {
    let n = block.ncols();
    if n < 3 {
        return 0.0;
    }
    let center_lo = n / 2 - 1;
    let center_hi = n / 2;

    let mut center = block.column(center_lo).to_vec();
    center.extend(block.column(center_hi).iter().copied());

    let surround: Vec<f64> = (0..n)
        .filter(|&c| c != center_lo && c != center_hi)
        .flat_map(|c| block.column(c).to_vec())
        .collect();

    let ratio = sample_std(&center) / sample_std(&surround);
    if ratio.is_nan() {
        0.0
    } else {
        ratio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::ArrayD;

    /// Deterministic pseudo-noise image (LCG over u8).
    fn noise_image(rows: usize, cols: usize, seed: u64) -> Array2<f64> {
        let mut state = seed;
        Array2::from_shape_fn((rows, cols), |_| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % 256) as f64
        })
    }

    fn pixels_u8(image: &Array2<f64>) -> PixelData {
        PixelData::U8(image.mapv(|v| v as u8).into_dyn())
    }

    #[test]
    fn test_kernel_normalized_and_symmetric() {
        let kernel = gaussian_kernel_7();
        let sum: f64 = kernel.iter().sum();
        assert!((sum - 1.0).abs() < 1e-12);
        for i in 0..3 {
            assert!((kernel[i] - kernel[6 - i]).abs() < 1e-15);
        }
        assert!(kernel[3] > kernel[2]);
    }

    #[test]
    fn test_mirror_index() {
        // [a b c] -> a b c c b a a b c
        let extended: Vec<usize> = (0..9).map(|i| mirror_index(i, 3)).collect();
        assert_eq!(extended, vec![0, 1, 2, 2, 1, 0, 0, 1, 2]);
    }

    #[test]
    fn test_pad_alignment() {
        let image = Array2::<f64>::zeros((17, 20));
        let padded = pad_to_block_multiple(&image);
        assert_eq!(padded.dim(), (32, 32));

        let aligned = Array2::<f64>::zeros((32, 16));
        assert_eq!(pad_to_block_multiple(&aligned).dim(), (32, 16));
    }

    #[test]
    fn test_pad_smaller_than_block() {
        let image = Array2::from_shape_fn((5, 4), |(r, c)| (r * 4 + c) as f64);
        let padded = pad_to_block_multiple(&image);
        assert_eq!(padded.dim(), (16, 16));
        // Mirrored content, not zero fill.
        assert_eq!(padded[[5, 0]], image[[4, 0]]);
        assert_eq!(padded[[0, 4]], image[[0, 3]]);
    }

    #[test]
    fn test_sample_variance_matches_ddof1() {
        let values = [1.0, 2.0, 3.0, 4.0];
        // mean 2.5, squared deviations sum 5.0, / 3
        assert!((sample_variance(&values) - 5.0 / 3.0).abs() < 1e-12);
        assert!(sample_variance(&[1.0]).is_nan());
    }

    #[test]
    fn test_constant_image_scores_100() {
        for value in [0u8, 7, 255] {
            let image = PixelData::U8(ArrayD::from_elem(vec![30, 22], value));
            let out = score(&image).unwrap();
            assert_eq!(out.score, 100.0, "value {}", value);
            assert!(out.activity_mask.iter().all(|&a| !a));
            assert!(out.artifact_mask.iter().all(|&a| !a));
            assert!(out.noise_mask.iter().all(|&a| !a));
        }
    }

    #[test]
    fn test_masks_cropped_to_input_size() {
        let image = pixels_u8(&noise_image(17, 20, 3));
        let out = score(&image).unwrap();
        assert_eq!(out.activity_mask.dim(), (17, 20));
        assert_eq!(out.artifact_mask.dim(), (17, 20));
        assert_eq!(out.noise_mask.dim(), (17, 20));
    }

    #[test]
    fn test_masks_keep_aligned_size() {
        let image = pixels_u8(&noise_image(32, 48, 9));
        let out = score(&image).unwrap();
        assert_eq!(out.activity_mask.dim(), (32, 48));
    }

    #[test]
    fn test_noise_image_detected() {
        let image = pixels_u8(&noise_image(64, 64, 42));
        let out = score(&image).unwrap();
        assert!(out.score >= 0.0 && out.score <= 100.0, "score {}", out.score);
        assert!(out.activity_mask.iter().any(|&a| a));
        assert!(out.noise_mask.iter().any(|&a| a));
    }

    #[test]
    fn test_flat_edge_marks_artifact() {
        // Noise with a flat band wide enough to zero the normalized values
        // along the top edge of the blocks starting at row 16.
        let mut raw = noise_image(64, 64, 7);
        for r in 13..20 {
            for c in 0..64 {
                raw[[r, c]] = 128.0;
            }
        }
        let out = score(&pixels_u8(&raw)).unwrap();
        assert!(out.artifact_mask.iter().any(|&a| a));
        // Artifact blocks are a subset of active blocks.
        ndarray::Zip::from(&out.artifact_mask)
            .and(&out.activity_mask)
            .for_each(|&art, &act| {
                if art {
                    assert!(act);
                }
            });
    }

    #[test]
    fn test_color_matches_equal_channel_gray() {
        let gray = noise_image(48, 48, 11);
        let rgb = ndarray::Array3::from_shape_fn((48, 48, 3), |(r, c, _)| gray[[r, c]] as u8);
        let gray_out = score(&pixels_u8(&gray)).unwrap();
        let rgb_out = score(&PixelData::U8(rgb.into_dyn())).unwrap();
        assert!((gray_out.score - rgb_out.score).abs() < 1e-9);
    }

    #[test]
    fn test_i16_and_f32_dtypes_accepted() {
        let raw = noise_image(32, 32, 23);
        let as_i16 = PixelData::I16(raw.mapv(|v| v as i16).into_dyn());
        let as_f32 = PixelData::F32(raw.mapv(|v| v as f32).into_dyn());
        let a = score(&as_i16).unwrap();
        let b = score(&as_f32).unwrap();
        assert!((a.score - b.score).abs() < 1e-9);
    }
}
