//! Otsu thresholding.
//!
//! Foreground is ink: a pixel belongs to the foreground when its value is
//! `<= threshold`, which matches an inverted binary threshold on a
//! white-paper scan.

use crate::{GrayImage, GrayImageView};

/// Compute Otsu threshold from a set of sample intensities.
///
/// Returns the last intensity of the dark class. Degenerate inputs are
/// handled explicitly: an empty slice yields 127, a constant slice yields
/// that constant, and a two-level slice yields the midpoint of the levels.
pub fn otsu_threshold_from_samples(samples: &[u8]) -> u8 {
    if samples.is_empty() {
        return 127;
    }

    let mut min_v = 255u8;
    let mut max_v = 0u8;
    for &v in samples {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v == max_v {
        return min_v;
    }

    let mut hist = [0u32; 256];
    for &v in samples {
        hist[v as usize] += 1;
    }
    let nonzero_bins = hist.iter().filter(|&&h| h > 0).count();
    if nonzero_bins <= 2 {
        return ((min_v as u16 + max_v as u16) / 2) as u8;
    }

    let total: f64 = samples.len() as f64;
    let mut sum_total = 0f64;
    for (i, &h) in hist.iter().enumerate() {
        sum_total += (i as f64) * (h as f64);
    }

    let mut sum_b = 0f64;
    let mut w_b = 0f64;
    let mut best_var = -1f64;
    let mut best_t = 127u8;

    for (t, &h) in hist.iter().enumerate() {
        w_b += h as f64;
        if w_b < 1.0 {
            continue;
        }
        let w_f = total - w_b;
        if w_f < 1.0 {
            break;
        }

        sum_b += (t as f64) * (h as f64);
        let m_b = sum_b / w_b;
        let m_f = (sum_total - sum_b) / w_f;

        let var_between = w_b * w_f * (m_b - m_f) * (m_b - m_f);
        if var_between > best_var {
            best_var = var_between;
            best_t = t as u8;
        }
    }

    best_t
}

/// Otsu threshold for ink detection, `None` when the samples carry no
/// contrast at all (a constant region holds no mark to separate).
pub fn otsu_ink_threshold(samples: &[u8]) -> Option<u8> {
    let first = *samples.first()?;
    if samples.iter().all(|&v| v == first) {
        return None;
    }
    Some(otsu_threshold_from_samples(samples))
}

/// Inverted binarization: ink (`<= threshold`) becomes 255, paper becomes 0.
pub fn binarize_inverted(img: &GrayImageView<'_>, threshold: u8) -> GrayImage {
    GrayImage {
        width: img.width,
        height: img.height,
        data: img
            .data
            .iter()
            .map(|&v| if v <= threshold { 255 } else { 0 })
            .collect(),
    }
}
