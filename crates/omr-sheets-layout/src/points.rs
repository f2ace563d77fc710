use nalgebra::Point2;
use omr_sheets_core::FrameSize;
use serde::Serialize;

use crate::{BubbleGeometry, GridConfig, GridConfigError, GridLayout, SheetLayout};

/// One (question, option) bubble site.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SamplePoint {
    /// 1-based question number.
    pub question: u32,
    /// Index of the option in configuration order.
    pub option: usize,
    pub label: String,
    /// Normalized canonical coordinates.
    pub position: Point2<f32>,
    /// Owning grid (multi-grid) or column (legacy).
    pub grid: usize,
    /// Half-width of the sample patch in pixels, when calibrated.
    pub radius_px: Option<f32>,
}

impl SamplePoint {
    /// Position in canonical-frame pixels.
    pub fn pixel(&self, frame: FrameSize) -> Point2<f32> {
        Point2::new(
            self.position.x * frame.width as f32,
            self.position.y * frame.height as f32,
        )
    }
}

/// Validate `cfg` and expand it into the ordered bubble list.
pub fn build_sample_points(cfg: &GridConfig) -> Result<Vec<SamplePoint>, GridConfigError> {
    Ok(SheetLayout::from_config(cfg)?.sample_points())
}

impl SheetLayout {
    /// Every bubble in column-major question order, options in
    /// configuration order within a question.
    pub fn sample_points(&self) -> Vec<SamplePoint> {
        let n_opts = self.options.len();
        let mut out = Vec::with_capacity(self.question_count() * n_opts);

        match &self.layout {
            GridLayout::Multi { grids } => {
                let frame_w = self.frame.width as f32;
                for g in grids {
                    for row in 0..self.rows {
                        let y = g.y + (row as f32 + 0.5) * g.h / self.rows as f32;
                        for (j, label) in self.options.iter().enumerate() {
                            let x = match g.geometry {
                                BubbleGeometry::Explicit {
                                    spacing_px,
                                    radius_px,
                                } => g.x + (radius_px + j as f32 * spacing_px) / frame_w,
                                BubbleGeometry::Derived { .. } => {
                                    g.x + (j as f32 + 0.5) * g.w / n_opts as f32
                                }
                            };
                            out.push(SamplePoint {
                                question: self.question_number(g.index, row),
                                option: j,
                                label: label.clone(),
                                position: Point2::new(x, y),
                                grid: g.index,
                                radius_px: g.geometry.radius_px(),
                            });
                        }
                    }
                }
            }
            GridLayout::Legacy(legacy) => {
                for (col, &x0) in legacy.x_offsets.iter().enumerate() {
                    for row in 0..self.rows {
                        let y = legacy.y_start + row as f32 * legacy.y_step;
                        for (j, label) in self.options.iter().enumerate() {
                            out.push(SamplePoint {
                                question: self.question_number(col, row),
                                option: j,
                                label: label.clone(),
                                position: Point2::new(linspace(x0, legacy.col_width, j, n_opts), y),
                                grid: col,
                                radius_px: legacy.radius_px,
                            });
                        }
                    }
                }
            }
        }
        out
    }
}

/// `j`-th of `n` evenly spaced values over `[start, start + width]`.
fn linspace(start: f32, width: f32, j: usize, n: usize) -> f32 {
    if n <= 1 {
        return start;
    }
    start + width * j as f32 / (n - 1) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridEntry;
    use approx::assert_relative_eq;

    fn multi(grids: Vec<GridEntry>) -> GridConfig {
        GridConfig {
            warp_w: Some(1000),
            warp_h: Some(1000),
            rows: Some(5),
            options: Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]),
            grids: Some(grids),
            ..GridConfig::default()
        }
    }

    fn grid(x: f32) -> GridEntry {
        GridEntry {
            x,
            y: 0.2,
            w: 0.2,
            h: 0.5,
            ..GridEntry::default()
        }
    }

    #[test]
    fn one_point_per_question_and_option() {
        let pts = build_sample_points(&multi(vec![grid(0.05), grid(0.3), grid(0.55), grid(0.78)]))
            .expect("points");
        assert_eq!(pts.len(), 4 * 5 * 4);
        // Column-major numbering: second grid starts at question 6.
        let first_of_grid_1 = pts.iter().find(|p| p.grid == 1).expect("grid 1");
        assert_eq!(first_of_grid_1.question, 6);
        assert_eq!(pts.last().map(|p| p.question), Some(20));
        assert_eq!(pts[2].label, "C");
        assert_eq!(pts[2].option, 2);
    }

    #[test]
    fn derived_geometry_subdivides_width() {
        let pts = build_sample_points(&multi(vec![grid(0.1)])).expect("points");
        let xs: Vec<f32> = pts[..4].iter().map(|p| p.position.x).collect();
        for (x, expected) in xs.iter().zip([0.125, 0.175, 0.225, 0.275]) {
            assert_relative_eq!(*x, expected, epsilon = 1e-6);
        }
        // Row centers sit in the middle of each row band.
        assert_relative_eq!(pts[0].position.y, 0.25, epsilon = 1e-6);
        assert_relative_eq!(pts[4].position.y, 0.35, epsilon = 1e-6);
        assert_eq!(pts[0].radius_px, None);
    }

    #[test]
    fn explicit_geometry_steps_from_left_edge() {
        let mut g = grid(0.1);
        g.bubble_spacing_px = Some(40.0);
        g.bubble_radius_px = Some(15.0);
        let cfg = multi(vec![g]);
        let pts = build_sample_points(&cfg).expect("points");
        let frame = FrameSize::new(1000, 1000);
        for (j, p) in pts[..4].iter().enumerate() {
            assert_relative_eq!(p.pixel(frame).x, 100.0 + 15.0 + 40.0 * j as f32, epsilon = 1e-3);
            assert_eq!(p.radius_px, Some(15.0));
        }
    }

    #[test]
    fn legacy_layout_interpolates_across_column_width() {
        let cfg = GridConfig {
            warp_w: Some(800),
            warp_h: Some(1000),
            rows: Some(3),
            options: Some(vec!["A".into(), "B".into(), "C".into()]),
            x_offsets: Some(vec![0.1, 0.5]),
            y_start: Some(0.3),
            y_step: Some(0.1),
            col_width: Some(0.2),
            ..GridConfig::default()
        };
        let pts = build_sample_points(&cfg).expect("points");
        assert_eq!(pts.len(), 2 * 3 * 3);
        let q5: Vec<&SamplePoint> = pts.iter().filter(|p| p.question == 5).collect();
        assert_eq!(q5.len(), 3);
        assert_relative_eq!(q5[0].position.x, 0.5, epsilon = 1e-6);
        assert_relative_eq!(q5[1].position.x, 0.6, epsilon = 1e-6);
        assert_relative_eq!(q5[2].position.x, 0.7, epsilon = 1e-6);
        assert_relative_eq!(q5[0].position.y, 0.4, epsilon = 1e-6);
    }

    #[test]
    fn single_option_sits_at_column_start() {
        assert_eq!(linspace(0.3, 0.2, 0, 1), 0.3);
    }
}
