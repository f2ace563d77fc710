//! Perspective rectification into the canonical sheet frame.

use crate::{warp_perspective_gray, GrayImage, GrayImageView, Homography};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Smallest triangle spanned by any three corners, relative to the squared
/// longest corner-to-corner distance.
const MIN_RELATIVE_TRIANGLE_AREA: f32 = 1e-3;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum RectifyError {
    #[error("canonical frame size must be non-zero (got {width}x{height})")]
    EmptyFrame { width: usize, height: usize },
    #[error("marker quadrilateral is degenerate (relative area {relative_area:.2e})")]
    DegenerateQuad { relative_area: f32 },
    #[error("marker quadrilateral is not convex in TL, TR, BR, BL order")]
    NonConvexQuad,
    #[error("marker quadrilateral has parallel adjacent edges")]
    HomographyFailed,
}

/// Pixel size of the canonical frame, fixed per sheet template.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: usize,
    pub height: usize,
}

impl FrameSize {
    pub fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    /// Corners of the frame in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let w = self.width as f32;
        let h = self.height as f32;
        [
            Point2::new(0.0, 0.0),
            Point2::new(w, 0.0),
            Point2::new(w, h),
            Point2::new(0.0, h),
        ]
    }
}

/// A rectified sheet. All bubble geometry is expressed in this frame.
#[derive(Clone, Debug)]
pub struct CanonicalFrame {
    pub image: GrayImage,
    pub h_img_from_frame: Homography,
}

impl CanonicalFrame {
    pub fn size(&self) -> FrameSize {
        FrameSize::new(self.image.width, self.image.height)
    }

    pub fn view(&self) -> GrayImageView<'_> {
        self.image.view()
    }
}

/// Warp `src` so that the ordered corners (TL, TR, BR, BL) land on the
/// corners of a `size.width × size.height` frame.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "debug",
        skip(src, corners),
        fields(width = size.width, height = size.height)
    )
)]
pub fn rectify(
    src: &GrayImageView<'_>,
    corners: &[Point2<f32>; 4],
    size: FrameSize,
) -> Result<CanonicalFrame, RectifyError> {
    if size.width == 0 || size.height == 0 {
        return Err(RectifyError::EmptyFrame {
            width: size.width,
            height: size.height,
        });
    }
    check_quad(corners)?;

    let h_img_from_frame =
        Homography::frame_to_quad(size.width as f64, size.height as f64, corners)
            .ok_or(RectifyError::HomographyFailed)?;

    let image = warp_perspective_gray(src, h_img_from_frame, size.width, size.height);
    log::debug!(
        "rectified {}x{} source into {}x{} frame",
        src.width,
        src.height,
        size.width,
        size.height
    );

    Ok(CanonicalFrame {
        image,
        h_img_from_frame,
    })
}

fn cross(o: Point2<f32>, a: Point2<f32>, b: Point2<f32>) -> f32 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn check_quad(q: &[Point2<f32>; 4]) -> Result<(), RectifyError> {
    let mut max_d2 = 0.0f32;
    for i in 0..4 {
        for j in (i + 1)..4 {
            max_d2 = max_d2.max((q[i] - q[j]).norm_squared());
        }
    }
    if max_d2 <= f32::EPSILON {
        return Err(RectifyError::DegenerateQuad { relative_area: 0.0 });
    }

    let triples = [(0, 1, 2), (1, 2, 3), (2, 3, 0), (3, 0, 1)];
    let mut min_area = f32::INFINITY;
    let mut signs = [0.0f32; 4];
    for (k, &(a, b, c)) in triples.iter().enumerate() {
        let z = cross(q[a], q[b], q[c]);
        signs[k] = z;
        min_area = min_area.min(0.5 * z.abs());
    }

    let relative_area = min_area / max_d2;
    if relative_area < MIN_RELATIVE_TRIANGLE_AREA {
        return Err(RectifyError::DegenerateQuad { relative_area });
    }
    let positive = signs.iter().all(|&z| z > 0.0);
    let negative = signs.iter().all(|&z| z < 0.0);
    if !(positive || negative) {
        return Err(RectifyError::NonConvexQuad);
    }
    Ok(())
}
