//! Diagnostic images for operators.

use image::{Rgb, RgbImage};
use imageproc::drawing::draw_hollow_circle_mut;
use omr_sheets_bubbles::Answer;
use omr_sheets_core::GrayImage;
use omr_sheets_grading::{GradeReport, Outcome};
use omr_sheets_layout::SamplePoint;
use std::path::Path;

use crate::SheetReading;

const GREEN: Rgb<u8> = Rgb([0, 200, 0]);
const RED: Rgb<u8> = Rgb([230, 0, 0]);
const BLUE: Rgb<u8> = Rgb([0, 80, 255]);
/// Circle radius for bubbles without a calibrated radius.
const DEFAULT_CIRCLE_RADIUS: f32 = 30.0;

fn to_image_buffer(img: &GrayImage) -> Option<image::GrayImage> {
    image::GrayImage::from_raw(img.width as u32, img.height as u32, img.data.clone())
}

/// Save a core gray image as PNG (or any format `image` infers from the path).
pub fn save_gray(img: &GrayImage, path: &Path) -> image::ImageResult<()> {
    match to_image_buffer(img) {
        Some(buf) => buf.save(path),
        None => Err(image::ImageError::Parameter(
            image::error::ParameterError::from_kind(
                image::error::ParameterErrorKind::DimensionMismatch,
            ),
        )),
    }
}

/// Circle the resolved bubble of every question on the rectified sheet.
///
/// With a key, correct answers are green, incorrect red and unanswered
/// questions blue (drawn on the first option). Without a key every detected
/// answer is red and blanks are not drawn.
pub fn annotate_sheet(
    reading: &SheetReading,
    points: &[SamplePoint],
    grade: Option<&GradeReport>,
) -> RgbImage {
    let frame = &reading.frame.image;
    let mut out = to_image_buffer(frame)
        .map(|g| image::DynamicImage::ImageLuma8(g).to_rgb8())
        .unwrap_or_else(|| RgbImage::new(frame.width as u32, frame.height as u32));

    for (question, answer) in reading.answers.iter() {
        let (site, color) = match answer {
            Answer::Selected(label) => {
                let color = match grade.and_then(|g| g.outcome(question)) {
                    Some(Outcome::Correct) => GREEN,
                    _ => RED,
                };
                let site = reading
                    .fills
                    .iter()
                    .find(|m| m.question == question && &m.label == label);
                (site, color)
            }
            Answer::Blank if grade.is_some() => {
                let site = reading
                    .fills
                    .iter()
                    .filter(|m| m.question == question)
                    .min_by_key(|m| m.option);
                (site, BLUE)
            }
            Answer::Blank => continue,
        };
        let Some(site) = site else { continue };

        let radius = points
            .iter()
            .find(|p| p.question == question && p.option == site.option)
            .and_then(|p| p.radius_px)
            .unwrap_or(DEFAULT_CIRCLE_RADIUS)
            .round() as i32;
        let center = (
            site.position_px.x.round() as i32,
            site.position_px.y.round() as i32,
        );
        draw_hollow_circle_mut(&mut out, center, radius, color);
        draw_hollow_circle_mut(&mut out, center, (radius - 1).max(1), color);
    }
    out
}
