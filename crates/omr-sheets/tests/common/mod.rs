//! Synthetic answer sheets for integration tests.

#![allow(dead_code)]

use nalgebra::Point2;
use omr_sheets::core::{warp_perspective_gray, GrayImage, Homography};
use omr_sheets::layout::{build_sample_points, GridConfig, GridEntry};
use std::path::Path;

pub const PAPER: u8 = 235;
pub const INK: u8 = 25;
pub const MARKER_SIDE: f32 = 60.0;
/// Canonical frame origin on the flat sheet.
pub const ORIGIN: f32 = 200.0;
pub const FLAT_W: usize = 1200;
pub const FLAT_H: usize = 1400;

/// Four grids, five rows, options A-D, on an 800x1000 canonical frame.
pub fn four_grid_config() -> GridConfig {
    let grid = |x: f32| GridEntry {
        x,
        y: 0.3,
        w: 0.2,
        h: 0.5,
        ..GridEntry::default()
    };
    GridConfig {
        warp_w: Some(800),
        warp_h: Some(1000),
        rows: Some(5),
        options: Some(["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect()),
        grids: Some(vec![grid(0.02), grid(0.26), grid(0.5), grid(0.76)]),
        ..GridConfig::default()
    }
}

fn paint(img: &mut GrayImage, inside: impl Fn(f32, f32) -> bool, bbox: [f32; 4], value: u8) {
    let x0 = bbox[0].floor().max(0.0) as usize;
    let y0 = bbox[1].floor().max(0.0) as usize;
    let x1 = (bbox[2].ceil().max(0.0) as usize).min(img.width);
    let y1 = (bbox[3].ceil().max(0.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            if inside(x as f32 + 0.5, y as f32 + 0.5) {
                img.data[y * img.width + x] = value;
            }
        }
    }
}

fn disk(img: &mut GrayImage, c: Point2<f32>, r: f32, value: u8) {
    paint(
        img,
        |x, y| (x - c.x).powi(2) + (y - c.y).powi(2) <= r * r,
        [c.x - r, c.y - r, c.x + r, c.y + r],
        value,
    );
}

fn square(img: &mut GrayImage, c: Point2<f32>, side: f32, value: u8) {
    let h = side / 2.0;
    paint(img, |_, _| true, [c.x - h, c.y - h, c.x + h, c.y + h], value);
}

/// Marker centers on the flat sheet, TL, TR, BR, BL.
pub fn flat_marker_centers(cfg: &GridConfig) -> [Point2<f32>; 4] {
    let w = cfg.warp_w.unwrap_or_default() as f32;
    let h = cfg.warp_h.unwrap_or_default() as f32;
    [
        Point2::new(ORIGIN, ORIGIN),
        Point2::new(ORIGIN + w, ORIGIN),
        Point2::new(ORIGIN + w, ORIGIN + h),
        Point2::new(ORIGIN, ORIGIN + h),
    ]
}

/// A flat (unwarped) sheet with `markers` of the four fiducials and the
/// `marked` (question, label) bubbles filled in.
pub fn flat_sheet(cfg: &GridConfig, marked: &[(u32, &str)], markers: usize) -> GrayImage {
    let mut img = GrayImage::filled(FLAT_W, FLAT_H, PAPER);
    for &c in flat_marker_centers(cfg).iter().take(markers) {
        square(&mut img, c, MARKER_SIDE, INK);
    }
    let w = cfg.warp_w.unwrap_or_default() as f32;
    let h = cfg.warp_h.unwrap_or_default() as f32;
    for p in build_sample_points(cfg).expect("valid config") {
        if marked.contains(&(p.question, p.label.as_str())) {
            let c = Point2::new(ORIGIN + p.position.x * w, ORIGIN + p.position.y * h);
            disk(&mut img, c, 12.0, INK);
        }
    }
    img
}

/// Photograph `flat` so that its markers land on `photo_markers`.
pub fn photograph(
    cfg: &GridConfig,
    flat: &GrayImage,
    photo_markers: [Point2<f32>; 4],
    out_w: usize,
    out_h: usize,
) -> GrayImage {
    let h_flat_from_photo = Homography::quad_to_quad(&photo_markers, &flat_marker_centers(cfg))
        .expect("homography");
    warp_perspective_gray(&flat.view(), h_flat_from_photo, out_w, out_h)
}

pub fn to_image(img: &GrayImage) -> image::GrayImage {
    image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
        .expect("buffer size")
}

pub fn save(img: &GrayImage, path: &Path) {
    to_image(img).save(path).expect("save png");
}
