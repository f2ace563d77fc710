//! Core types and utilities for answer-sheet reading.
//!
//! This crate is intentionally small and purely geometric. It knows about
//! 8-bit gray images, four-point homographies, perspective warps and Otsu
//! thresholds, but nothing about bubbles, grids or answer keys.

mod homography;
mod image;
mod logger;
mod rectify;
mod threshold;

pub use homography::{warp_perspective_gray, Homography};
pub use image::{sample_bilinear, sample_bilinear_u8, GrayImage, GrayImageView};
pub use rectify::{rectify, CanonicalFrame, FrameSize, RectifyError};
pub use threshold::{binarize_inverted, otsu_ink_threshold, otsu_threshold_from_samples};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, Verbosity};
