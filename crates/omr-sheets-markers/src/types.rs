use nalgebra::Point2;
use serde::{Deserialize, Serialize};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MarkerLocateError {
    #[error("could not find 4 markers, found {found}")]
    NotFound { found: usize },
    #[error("marker positions are ambiguous: one point was picked for two corners")]
    AmbiguousOrder,
    #[error("invalid grayscale image buffer (width={width}, height={height}, len={len})")]
    InvalidImage {
        width: usize,
        height: usize,
        len: usize,
    },
}

/// One accepted square blob.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerCandidate {
    /// Bounding-box center in source pixels.
    pub center: Point2<f32>,
    /// Bounding box `[x, y, w, h]` of the approximated polygon.
    pub bbox: [i32; 4],
}

/// Four marker centers in source-image pixels, ordered TL, TR, BR, BL.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarkerSet {
    pub top_left: Point2<f32>,
    pub top_right: Point2<f32>,
    pub bottom_right: Point2<f32>,
    pub bottom_left: Point2<f32>,
}

impl MarkerSet {
    /// Order four unordered points.
    ///
    /// With image coordinates (y grows downwards):
    /// - TL minimizes `x + y`, BR maximizes it;
    /// - TR minimizes `y - x`, BL maximizes it.
    ///
    /// Ties go to the earliest point. The rule tolerates moderate in-plane
    /// rotation, where sorting by row then column would interleave rows.
    pub fn from_unordered(points: [Point2<f32>; 4]) -> Result<Self, MarkerLocateError> {
        let sum = |p: &Point2<f32>| p.x + p.y;
        let diff = |p: &Point2<f32>| p.y - p.x;

        let tl = arg_best(&points, sum, |a, b| a < b);
        let br = arg_best(&points, sum, |a, b| a > b);
        let tr = arg_best(&points, diff, |a, b| a < b);
        let bl = arg_best(&points, diff, |a, b| a > b);

        let mut seen = [false; 4];
        for idx in [tl, tr, br, bl] {
            if seen[idx] {
                return Err(MarkerLocateError::AmbiguousOrder);
            }
            seen[idx] = true;
        }

        Ok(Self {
            top_left: points[tl],
            top_right: points[tr],
            bottom_right: points[br],
            bottom_left: points[bl],
        })
    }

    /// Corners as an array in TL, TR, BR, BL order.
    pub fn corners(&self) -> [Point2<f32>; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

fn arg_best(
    points: &[Point2<f32>; 4],
    key: impl Fn(&Point2<f32>) -> f32,
    better: impl Fn(f32, f32) -> bool,
) -> usize {
    let mut best = 0;
    let mut best_key = key(&points[0]);
    for (i, p) in points.iter().enumerate().skip(1) {
        let k = key(p);
        if better(k, best_key) {
            best = i;
            best_key = k;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotate(p: Point2<f32>, c: Point2<f32>, deg: f32) -> Point2<f32> {
        let (s, co) = deg.to_radians().sin_cos();
        let d = p - c;
        Point2::new(c.x + co * d.x - s * d.y, c.y + s * d.x + co * d.y)
    }

    fn sheet_corners() -> [Point2<f32>; 4] {
        [
            Point2::new(50.0, 40.0),
            Point2::new(750.0, 40.0),
            Point2::new(750.0, 1060.0),
            Point2::new(50.0, 1060.0),
        ]
    }

    #[test]
    fn orders_every_permutation_identically() {
        let [a, b, c, d] = sheet_corners();
        let expected = MarkerSet::from_unordered([a, b, c, d]).expect("order");
        let perms = [
            [d, c, b, a],
            [b, d, a, c],
            [c, a, d, b],
            [a, c, b, d],
            [d, a, c, b],
        ];
        for perm in perms {
            assert_eq!(MarkerSet::from_unordered(perm).expect("order"), expected);
        }
        assert_eq!(expected.corners(), sheet_corners());
    }

    #[test]
    fn ordering_survives_rotation() {
        let center = Point2::new(400.0, 550.0);
        for deg in [-20.0f32, -8.0, -1.0, 3.0, 12.0, 20.0] {
            let rotated = sheet_corners().map(|p| rotate(p, center, deg));
            // Feed in a scrambled order.
            let input = [rotated[2], rotated[0], rotated[3], rotated[1]];
            let set = MarkerSet::from_unordered(input).expect("order");
            assert_eq!(set.corners(), rotated, "rotation {deg} deg");
        }
    }

    #[test]
    fn ordering_is_idempotent() {
        let set = MarkerSet::from_unordered(sheet_corners()).expect("order");
        let again = MarkerSet::from_unordered(set.corners()).expect("order");
        assert_eq!(set, again);
    }

    #[test]
    fn coincident_points_are_ambiguous() {
        let p = Point2::new(10.0, 10.0);
        assert_eq!(
            MarkerSet::from_unordered([p, p, p, p]),
            Err(MarkerLocateError::AmbiguousOrder)
        );
    }
}
