use std::collections::BTreeMap;

use omr_sheets_bubbles::{measure_fills, resolve, Answer, FillParams, DEFAULT_MIN_FILL};
use omr_sheets_core::{rectify, CanonicalFrame, FrameSize, GrayImage};
use omr_sheets_layout::{build_sample_points, GridConfig, GridEntry, SamplePoint};

const PAPER: u8 = 235;

fn disk(img: &mut GrayImage, cx: f32, cy: f32, r_in: f32, r_out: f32, value: u8) {
    let x0 = (cx - r_out - 1.0).max(0.0) as usize;
    let y0 = (cy - r_out - 1.0).max(0.0) as usize;
    let x1 = ((cx + r_out + 1.0) as usize).min(img.width);
    let y1 = ((cy + r_out + 1.0) as usize).min(img.height);
    for y in y0..y1 {
        for x in x0..x1 {
            let dx = x as f32 + 0.5 - cx;
            let dy = y as f32 + 0.5 - cy;
            let d = (dx * dx + dy * dy).sqrt();
            if d >= r_in && d <= r_out {
                img.data[y * img.width + x] = value;
            }
        }
    }
}

/// Printed bubble rings everywhere, solid ink on the marked options.
fn render(size: FrameSize, points: &[SamplePoint], marked: &BTreeMap<u32, &str>) -> CanonicalFrame {
    let mut img = GrayImage::filled(size.width, size.height, PAPER);
    for p in points {
        let c = p.pixel(size);
        disk(&mut img, c.x, c.y, 13.5, 15.0, 150);
        if marked.get(&p.question) == Some(&p.label.as_str()) {
            disk(&mut img, c.x, c.y, 0.0, 12.0, 25);
        }
    }
    rectify(&img.view(), &size.corners(), size).expect("identity rectification")
}

fn check_round_trip(cfg: &GridConfig, marked: BTreeMap<u32, &str>) {
    let points = build_sample_points(cfg).expect("points");
    let size = FrameSize::new(
        cfg.warp_w.expect("warp_w"),
        cfg.warp_h.expect("warp_h"),
    );
    let frame = render(size, &points, &marked);
    let fills = measure_fills(&frame, &points, &FillParams::default());
    assert_eq!(fills.len(), points.len());

    let record = resolve(&fills, DEFAULT_MIN_FILL);
    let questions: Vec<u32> = points.iter().map(|p| p.question).collect();
    for q in questions {
        let expected = match marked.get(&q) {
            Some(label) => Answer::Selected(label.to_string()),
            None => Answer::Blank,
        };
        assert_eq!(record.get(q), Some(&expected), "question {q}");
    }
}

fn options() -> Option<Vec<String>> {
    Some(["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect())
}

#[test]
fn multi_grid_round_trip() {
    let grid = |x: f32| GridEntry {
        x,
        y: 0.3,
        w: 0.2,
        h: 0.5,
        ..GridEntry::default()
    };
    let cfg = GridConfig {
        warp_w: Some(800),
        warp_h: Some(1000),
        rows: Some(5),
        options: options(),
        grids: Some(vec![grid(0.02), grid(0.26), grid(0.5), grid(0.76)]),
        ..GridConfig::default()
    };
    let marked = BTreeMap::from([(1, "A"), (3, "C"), (6, "D"), (12, "B"), (20, "A")]);
    check_round_trip(&cfg, marked);
}

#[test]
fn explicit_bubble_geometry_round_trip() {
    let cfg = GridConfig {
        warp_w: Some(800),
        warp_h: Some(1000),
        rows: Some(4),
        options: options(),
        bubble_spacing_px: Some(42.0),
        bubble_radius_px: Some(18.0),
        grids: Some(vec![
            GridEntry {
                x: 0.1,
                y: 0.2,
                w: 0.25,
                h: 0.4,
                ..GridEntry::default()
            },
            GridEntry {
                x: 0.55,
                y: 0.2,
                w: 0.25,
                h: 0.4,
                ..GridEntry::default()
            },
        ]),
        ..GridConfig::default()
    };
    let marked = BTreeMap::from([(2, "D"), (5, "B"), (8, "C")]);
    check_round_trip(&cfg, marked);
}

#[test]
fn legacy_layout_round_trip() {
    let cfg = GridConfig {
        warp_w: Some(800),
        warp_h: Some(1000),
        rows: Some(6),
        options: options(),
        x_offsets: Some(vec![0.1, 0.45]),
        y_start: Some(0.25),
        y_step: Some(0.08),
        col_width: Some(0.15),
        ..GridConfig::default()
    };
    let marked = BTreeMap::from([(1, "B"), (4, "D"), (7, "A"), (12, "C")]);
    check_round_trip(&cfg, marked);
}
