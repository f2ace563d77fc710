//! Projective maps between the canonical sheet frame and a photographed
//! quadrilateral.
//!
//! All maps use continuous pixel coordinates: pixel `(i, j)` covers
//! `[i, i + 1) × [j, j + 1)`, so its center is `(i + 0.5, j + 0.5)`.

use crate::{sample_bilinear_u8, GrayImage, GrayImageView};
use nalgebra::{Matrix3, Point2, Vector3};

/// Below this the quad's edge vectors are treated as parallel.
const PARALLEL_EPS: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    #[inline]
    pub fn apply(&self, p: Point2<f32>) -> Point2<f32> {
        let v = self.h * Vector3::new(p.x as f64, p.y as f64, 1.0);
        Point2::new((v[0] / v[2]) as f32, (v[1] / v[2]) as f32)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h
            .try_inverse()
            .map(|h| Self::new(h / h[(2, 2)]))
            .filter(Self::is_finite)
    }

    fn is_finite(&self) -> bool {
        self.h.iter().all(|v| v.is_finite())
    }

    /// Map the unit square `(0,0) (1,0) (1,1) (0,1)` onto `quad`, given in
    /// the same TL, TR, BR, BL order.
    ///
    /// Closed form: parallelograms yield an affine map, any other quad gets
    /// its perspective row from the two "vanishing" terms. `None` when two
    /// adjacent edges are parallel.
    pub fn unit_square_to_quad(quad: &[Point2<f32>; 4]) -> Option<Self> {
        let [p0, p1, p2, p3] = quad.map(|p| (p.x as f64, p.y as f64));

        // Diagonal defect: zero for a parallelogram.
        let sx = p0.0 - p1.0 + p2.0 - p3.0;
        let sy = p0.1 - p1.1 + p2.1 - p3.1;

        let (g, h) = if sx == 0.0 && sy == 0.0 {
            (0.0, 0.0)
        } else {
            let (dx1, dy1) = (p1.0 - p2.0, p1.1 - p2.1);
            let (dx2, dy2) = (p3.0 - p2.0, p3.1 - p2.1);
            let den = dx1 * dy2 - dx2 * dy1;
            if den.abs() < PARALLEL_EPS {
                return None;
            }
            ((sx * dy2 - dx2 * sy) / den, (dx1 * sy - sx * dy1) / den)
        };

        let m = Matrix3::new(
            p1.0 - p0.0 + g * p1.0, p3.0 - p0.0 + h * p3.0, p0.0, //
            p1.1 - p0.1 + g * p1.1, p3.1 - p0.1 + h * p3.1, p0.1, //
            g, h, 1.0,
        );
        Some(Self::new(m)).filter(Self::is_finite)
    }

    /// Map a `width × height` frame, corners in TL, TR, BR, BL order, onto
    /// `quad`.
    pub fn frame_to_quad(width: f64, height: f64, quad: &[Point2<f32>; 4]) -> Option<Self> {
        if width <= 0.0 || height <= 0.0 {
            return None;
        }
        let unit = Self::unit_square_to_quad(quad)?;
        let scale = Matrix3::new(
            1.0 / width, 0.0, 0.0, //
            0.0, 1.0 / height, 0.0, //
            0.0, 0.0, 1.0,
        );
        Some(Self::new(unit.h * scale))
    }

    /// Map quad `src` onto quad `dst`, corresponding corners in order.
    pub fn quad_to_quad(src: &[Point2<f32>; 4], dst: &[Point2<f32>; 4]) -> Option<Self> {
        let to_src = Self::unit_square_to_quad(src)?.inverse()?;
        let to_dst = Self::unit_square_to_quad(dst)?;
        Some(Self::new(to_dst.h * to_src.h)).filter(Self::is_finite)
    }
}

/// Resample `src` into an `out_w × out_h` image: each output pixel center is
/// pushed through `h_src_from_out` and read bilinearly.
pub fn warp_perspective_gray(
    src: &GrayImageView<'_>,
    h_src_from_out: Homography,
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let mut out = GrayImage::filled(out_w, out_h, 0);
    for (y, row) in out.data.chunks_exact_mut(out_w.max(1)).enumerate() {
        for (x, px) in row.iter_mut().enumerate() {
            let p = h_src_from_out.apply(Point2::new(x as f32 + 0.5, y as f32 + 0.5));
            *px = sample_bilinear_u8(src, p.x - 0.5, p.y - 0.5);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_maps(h: &Homography, from: Point2<f32>, to: Point2<f32>) {
        let p = h.apply(from);
        assert_abs_diff_eq!(p.x, to.x, epsilon = 1e-2);
        assert_abs_diff_eq!(p.y, to.y, epsilon = 1e-2);
    }

    fn photo_quad() -> [Point2<f32>; 4] {
        [
            Point2::new(140.0, 120.0),
            Point2::new(900.0, 150.0),
            Point2::new(880.0, 1080.0),
            Point2::new(120.0, 1060.0),
        ]
    }

    #[test]
    fn frame_corners_land_on_the_quad() {
        let quad = photo_quad();
        let h = Homography::frame_to_quad(800.0, 1000.0, &quad).expect("map");
        let frame = [
            Point2::new(0.0, 0.0),
            Point2::new(800.0, 0.0),
            Point2::new(800.0, 1000.0),
            Point2::new(0.0, 1000.0),
        ];
        for (f, q) in frame.into_iter().zip(quad) {
            assert_maps(&h, f, q);
        }
    }

    #[test]
    fn parallelogram_gives_an_affine_map() {
        let quad = [
            Point2::new(10.0, 20.0),
            Point2::new(110.0, 30.0),
            Point2::new(120.0, 230.0),
            Point2::new(20.0, 220.0),
        ];
        let h = Homography::unit_square_to_quad(&quad).expect("map");
        assert_eq!(h.h[(2, 0)], 0.0);
        assert_eq!(h.h[(2, 1)], 0.0);
        assert_maps(&h, Point2::new(0.5, 0.5), Point2::new(65.0, 125.0));
    }

    #[test]
    fn recovers_a_known_perspective_map() {
        let truth = Homography::new(Matrix3::new(
            0.8, 0.05, 120.0, //
            -0.02, 1.1, 80.0, //
            0.0009, -0.0004, 1.0,
        ));
        let quad = [
            Point2::new(0.0, 0.0),
            Point2::new(800.0, 0.0),
            Point2::new(800.0, 1100.0),
            Point2::new(0.0, 1100.0),
        ]
        .map(|p| truth.apply(p));
        let h = Homography::frame_to_quad(800.0, 1100.0, &quad).expect("map");
        for p in [Point2::new(260.0, 400.0), Point2::new(750.0, 1020.0)] {
            let (a, b) = (h.apply(p), truth.apply(p));
            assert_abs_diff_eq!(a.x, b.x, epsilon = 1e-2);
            assert_abs_diff_eq!(a.y, b.y, epsilon = 1e-2);
        }
    }

    #[test]
    fn quad_to_quad_round_trips() {
        let src = photo_quad();
        let dst = [
            Point2::new(200.0, 200.0),
            Point2::new(1000.0, 200.0),
            Point2::new(1000.0, 1200.0),
            Point2::new(200.0, 1200.0),
        ];
        let h = Homography::quad_to_quad(&src, &dst).expect("map");
        for (s, d) in src.into_iter().zip(dst) {
            assert_maps(&h, s, d);
        }
        let back = h.inverse().expect("invertible");
        assert_maps(&back, h.apply(Point2::new(500.0, 600.0)), Point2::new(500.0, 600.0));
    }

    #[test]
    fn collapsed_quad_has_no_map() {
        let p = Point2::new(5.0, 5.0);
        assert!(Homography::unit_square_to_quad(&[p, p, p, Point2::new(9.0, 1.0)]).is_none());
    }

    #[test]
    fn identity_warp_copies_pixels() {
        let src = GrayImage {
            width: 3,
            height: 2,
            data: vec![10, 20, 30, 40, 50, 60],
        };
        let out = warp_perspective_gray(&src.view(), Homography::new(Matrix3::identity()), 3, 2);
        assert_eq!(out.data, src.data);
    }

    #[test]
    fn unit_translation_shifts_by_one_pixel() {
        let src = GrayImage {
            width: 3,
            height: 1,
            data: vec![10, 20, 30],
        };
        let shift = Homography::new(Matrix3::new(
            1.0, 0.0, 1.0, //
            0.0, 1.0, 0.0, //
            0.0, 0.0, 1.0,
        ));
        let out = warp_perspective_gray(&src.view(), shift, 2, 1);
        assert_eq!(out.data, vec![20, 30]);
    }
}
