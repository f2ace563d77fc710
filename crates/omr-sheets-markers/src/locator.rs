use image::GrayImage as ImageBuffer;
use imageproc::contours::{find_contours, BorderType};
use imageproc::filter::gaussian_blur_f32;
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point;
use nalgebra::Point2;
use omr_sheets_core::{binarize_inverted, otsu_ink_threshold, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{MarkerCandidate, MarkerLocateError, MarkerLocatorParams, MarkerSet};

/// Intermediate state of one locator run.
#[derive(Clone, Debug)]
pub struct MarkerLocateDebug {
    /// Inverted Otsu binarization: ink is 255.
    pub binarized: GrayImage,
    pub threshold: u8,
    pub candidates: Vec<MarkerCandidate>,
    pub result: Result<MarkerSet, MarkerLocateError>,
}

pub struct MarkerLocator {
    params: MarkerLocatorParams,
}

impl MarkerLocator {
    pub fn new(params: MarkerLocatorParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MarkerLocatorParams {
        &self.params
    }

    /// Find the four fiducials and order them TL, TR, BR, BL.
    pub fn locate(&self, img: &GrayImageView<'_>) -> Result<MarkerSet, MarkerLocateError> {
        self.locate_debug(img).result
    }

    /// Same as [`MarkerLocator::locate`], keeping the binarized image and
    /// the accepted candidates.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "debug", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn locate_debug(&self, img: &GrayImageView<'_>) -> MarkerLocateDebug {
        let Some(buf) = to_image_buffer(img) else {
            return MarkerLocateDebug {
                binarized: GrayImage::filled(0, 0, 0),
                threshold: 0,
                candidates: Vec::new(),
                result: Err(MarkerLocateError::InvalidImage {
                    width: img.width,
                    height: img.height,
                    len: img.data.len(),
                }),
            };
        };

        let blurred = if self.params.blur_sigma > 0.0 {
            gaussian_blur_f32(&buf, self.params.blur_sigma)
        } else {
            buf
        };

        let (threshold, binarized) = match otsu_ink_threshold(blurred.as_raw()) {
            Some(t) => {
                let view = GrayImageView {
                    width: img.width,
                    height: img.height,
                    data: blurred.as_raw(),
                };
                (t, binarize_inverted(&view, t))
            }
            None => (0, GrayImage::filled(img.width, img.height, 0)),
        };

        let candidates = self.square_candidates(&binarized);
        log::debug!(
            "otsu threshold {threshold}, {} square candidate(s)",
            candidates.len()
        );

        let result = match candidates.as_slice() {
            [a, b, c, d] => MarkerSet::from_unordered([a.center, b.center, c.center, d.center]),
            other => Err(MarkerLocateError::NotFound { found: other.len() }),
        };

        MarkerLocateDebug {
            binarized,
            threshold,
            candidates,
            result,
        }
    }

    fn square_candidates(&self, binarized: &GrayImage) -> Vec<MarkerCandidate> {
        let Some(buf) = to_image_buffer(&binarized.view()) else {
            return Vec::new();
        };

        let mut out = Vec::new();
        for contour in find_contours::<i32>(&buf) {
            // External contours only: outer borders not nested in a hole.
            if contour.border_type != BorderType::Outer || contour.parent.is_some() {
                continue;
            }
            if contour.points.len() < 4 {
                continue;
            }

            let perimeter = arc_length(&contour.points, true);
            let epsilon = (self.params.polygon_epsilon_frac as f64 * perimeter).max(1e-3);
            let polygon = approximate_closed_polygon(&contour.points, epsilon);
            if polygon.len() != 4 {
                continue;
            }

            let bbox = bounding_box(&polygon);
            let [x, y, w, h] = bbox;
            if !self.params.accepts_box(w as f32, h as f32) {
                continue;
            }
            out.push(MarkerCandidate {
                center: Point2::new(x as f32 + w as f32 / 2.0, y as f32 + h as f32 / 2.0),
                bbox,
            });
        }
        out
    }
}

/// Douglas-Peucker over a closed contour.
///
/// The ring is split at two mutually distant points, which are corners of a
/// convex blob, and each half is simplified as an open curve. Vertices that
/// still sit within `epsilon` of the chord between their neighbours are then
/// dropped, so a staircase edge never survives as an extra vertex.
fn approximate_closed_polygon(contour: &[Point<i32>], epsilon: f64) -> Vec<Point<i32>> {
    let n = contour.len();
    let start = farthest_from(contour, contour[0]);
    let opposite = farthest_from(contour, contour[start]);
    let split = (opposite + n - start) % n;
    if split == 0 {
        return contour.to_vec();
    }

    // Closed ring starting and ending at `start`.
    let ring: Vec<Point<i32>> = (0..=n).map(|k| contour[(start + k) % n]).collect();
    let mut polygon = approximate_polygon_dp(&ring[..=split], epsilon, false);
    polygon.pop();
    polygon.extend(approximate_polygon_dp(&ring[split..], epsilon, false));
    polygon.pop();

    drop_collinear_vertices(&mut polygon, epsilon);
    polygon
}

fn farthest_from(points: &[Point<i32>], from: Point<i32>) -> usize {
    let d2 = |p: &Point<i32>| {
        let dx = (p.x - from.x) as i64;
        let dy = (p.y - from.y) as i64;
        dx * dx + dy * dy
    };
    let mut best = 0;
    let mut best_d2 = -1;
    for (i, p) in points.iter().enumerate() {
        let d = d2(p);
        if d > best_d2 {
            best = i;
            best_d2 = d;
        }
    }
    best
}

/// Distance of `v` from the line through `a` and `b`.
fn chord_distance(a: Point<i32>, v: Point<i32>, b: Point<i32>) -> f64 {
    let (ax, ay) = (a.x as f64, a.y as f64);
    let (dx, dy) = (b.x as f64 - ax, b.y as f64 - ay);
    let (vx, vy) = (v.x as f64 - ax, v.y as f64 - ay);
    let len = dx.hypot(dy);
    if len < 1e-9 {
        return vx.hypot(vy);
    }
    (dx * vy - dy * vx).abs() / len
}

fn drop_collinear_vertices(polygon: &mut Vec<Point<i32>>, epsilon: f64) {
    while polygon.len() > 3 {
        let n = polygon.len();
        let flattest = (0..n)
            .map(|i| {
                let d = chord_distance(polygon[(i + n - 1) % n], polygon[i], polygon[(i + 1) % n]);
                (i, d)
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        match flattest {
            Some((i, d)) if d < epsilon => {
                polygon.remove(i);
            }
            _ => break,
        }
    }
}

fn to_image_buffer(img: &GrayImageView<'_>) -> Option<ImageBuffer> {
    let w = u32::try_from(img.width).ok()?;
    let h = u32::try_from(img.height).ok()?;
    if w == 0 || h == 0 {
        return None;
    }
    ImageBuffer::from_raw(w, h, img.data.to_vec())
}

/// Inclusive pixel bounding box `[x, y, w, h]`.
fn bounding_box(points: &[Point<i32>]) -> [i32; 4] {
    let (mut min_x, mut min_y) = (i32::MAX, i32::MAX);
    let (mut max_x, mut max_y) = (i32::MIN, i32::MIN);
    for p in points {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    [min_x, min_y, max_x - min_x + 1, max_y - min_y + 1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding_box_is_inclusive() {
        let pts = [
            Point::new(10, 20),
            Point::new(69, 20),
            Point::new(69, 79),
            Point::new(10, 79),
        ];
        assert_eq!(bounding_box(&pts), [10, 20, 60, 60]);
    }

    #[test]
    fn staircase_vertex_is_dropped() {
        // Square at 4 degrees as traced by the contour follower: the spare
        // vertex (120, 131) lies on the bottom edge.
        let mut poly = vec![
            Point::new(72, 68),
            Point::new(68, 127),
            Point::new(120, 131),
            Point::new(127, 131),
            Point::new(131, 72),
        ];
        drop_collinear_vertices(&mut poly, 4.7);
        assert_eq!(poly.len(), 4);
        assert!(!poly.contains(&Point::new(120, 131)));
    }

    #[test]
    fn closed_polygon_keeps_true_corners() {
        // Outline of an axis-aligned 40x40 square, traced from mid-edge.
        let mut ring = Vec::new();
        ring.extend((20..40).map(|x| Point::new(x, 0)));
        ring.extend((0..40).map(|y| Point::new(40, y)));
        ring.extend((0..40).rev().map(|x| Point::new(x + 1, 40)));
        ring.extend((1..=40).rev().map(|y| Point::new(0, y)));
        ring.extend((0..20).map(|x| Point::new(x, 0)));
        let poly = approximate_closed_polygon(&ring, 0.02 * 160.0);
        assert_eq!(poly.len(), 4, "{poly:?}");
        for corner in [Point::new(0, 0), Point::new(40, 0), Point::new(40, 40)] {
            assert!(
                poly.iter().any(|p| (p.x - corner.x).abs() <= 1 && (p.y - corner.y).abs() <= 1),
                "missing corner {corner:?} in {poly:?}"
            );
        }
    }

    #[test]
    fn blank_page_reports_zero_markers() {
        let img = GrayImage::filled(300, 400, 255);
        let dbg = MarkerLocator::new(MarkerLocatorParams::default()).locate_debug(&img.view());
        assert_eq!(dbg.result, Err(MarkerLocateError::NotFound { found: 0 }));
        assert_eq!(dbg.binarized.width, 300);
    }

    #[test]
    fn short_buffer_is_invalid() {
        let data = vec![0u8; 10];
        let view = GrayImageView {
            width: 5,
            height: 5,
            data: &data,
        };
        let err = MarkerLocator::new(MarkerLocatorParams::default())
            .locate(&view)
            .unwrap_err();
        assert!(matches!(err, MarkerLocateError::InvalidImage { .. }));
    }
}
