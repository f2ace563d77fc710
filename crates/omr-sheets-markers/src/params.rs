use serde::{Deserialize, Serialize};

/// Parameters of the fiducial locator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkerLocatorParams {
    /// Gaussian blur sigma applied before thresholding.
    pub blur_sigma: f32,
    /// Minimal bounding-box area (px²) of a marker; smaller blobs are speckle.
    pub min_area_px: f32,
    /// Optional upper bound on the bounding-box area (px²).
    pub max_area_px: Option<f32>,
    /// Accepted width/height range of a marker bounding box.
    pub min_aspect: f32,
    pub max_aspect: f32,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub polygon_epsilon_frac: f32,
}

impl Default for MarkerLocatorParams {
    fn default() -> Self {
        Self {
            // Matches a 5x5 kernel with automatic sigma.
            blur_sigma: 1.1,
            min_area_px: 2000.0,
            max_area_px: None,
            min_aspect: 0.8,
            max_aspect: 1.2,
            polygon_epsilon_frac: 0.02,
        }
    }
}

impl MarkerLocatorParams {
    pub(crate) fn accepts_box(&self, w: f32, h: f32) -> bool {
        if w <= 0.0 || h <= 0.0 {
            return false;
        }
        let area = w * h;
        if area < self.min_area_px {
            return false;
        }
        if self.max_area_px.is_some_and(|max| area > max) {
            return false;
        }
        let ratio = w / h;
        (self.min_aspect..=self.max_aspect).contains(&ratio)
    }
}
