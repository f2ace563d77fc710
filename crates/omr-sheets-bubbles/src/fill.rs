use nalgebra::Point2;
use omr_sheets_core::{otsu_ink_threshold, CanonicalFrame, FrameSize, GrayImageView};
use omr_sheets_layout::SamplePoint;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;
#[cfg(feature = "tracing")]
use tracing::instrument;

/// Uniform patches darker than this are solid ink.
const MID_GRAY: u8 = 128;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillParams {
    /// Patch half-width for sample points without a calibrated radius.
    pub default_radius_px: f32,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            default_radius_px: 20.0,
        }
    }
}

/// Ink coverage of one bubble.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FillMeasurement {
    pub question: u32,
    pub option: usize,
    pub label: String,
    /// Number of ink pixels in the sample patch.
    pub fill: u32,
    /// Patch center in canonical-frame pixels.
    pub position_px: Point2<f32>,
}

/// Measure the fill of every sample point on a rectified sheet.
///
/// Output order matches `points`.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(frame, points, params), fields(points = points.len()))
)]
pub fn measure_fills(
    frame: &CanonicalFrame,
    points: &[SamplePoint],
    params: &FillParams,
) -> Vec<FillMeasurement> {
    let view = frame.view();
    let size = frame.size();

    #[cfg(feature = "parallel")]
    {
        points
            .par_iter()
            .map(|p| measure_point(&view, size, p, params))
            .collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        points
            .iter()
            .map(|p| measure_point(&view, size, p, params))
            .collect()
    }
}

fn measure_point(
    view: &GrayImageView<'_>,
    size: FrameSize,
    point: &SamplePoint,
    params: &FillParams,
) -> FillMeasurement {
    let center = point.pixel(size);
    let radius = point.radius_px.unwrap_or(params.default_radius_px);
    FillMeasurement {
        question: point.question,
        option: point.option,
        label: point.label.clone(),
        fill: patch_fill(view, center, radius),
        position_px: center,
    }
}

/// Count ink pixels in the `2r × 2r` patch centered on `center`, clamped to
/// the frame. A patch without contrast is all ink when darker than mid-gray
/// (a scribble wider than the patch) and blank otherwise.
fn patch_fill(view: &GrayImageView<'_>, center: Point2<f32>, radius: f32) -> u32 {
    let r = radius.max(0.0).round() as i64;
    let cx = center.x.floor() as i64;
    let cy = center.y.floor() as i64;
    let clamp_x = |v: i64| v.clamp(0, view.width as i64) as usize;
    let clamp_y = |v: i64| v.clamp(0, view.height as i64) as usize;

    let patch = view.window(clamp_x(cx - r), clamp_y(cy - r), clamp_x(cx + r), clamp_y(cy + r));
    match otsu_ink_threshold(&patch) {
        Some(t) => patch.iter().filter(|&&v| v <= t).count() as u32,
        None if patch.first().is_some_and(|&v| v < MID_GRAY) => patch.len() as u32,
        None => 0,
    }
}
