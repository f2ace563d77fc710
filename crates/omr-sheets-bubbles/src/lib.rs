//! Bubble fill measurement and answer resolution.
//!
//! [`measure_fills`] samples a square patch around every
//! [`SamplePoint`](omr_sheets_layout::SamplePoint) of a rectified sheet,
//! binarizes the patch with its own Otsu threshold and counts ink pixels.
//! A patch with no contrast at all counts as fully inked when it is darker
//! than mid-gray and as blank otherwise.
//! [`resolve`] turns those counts into one [`Answer`] per question.
//!
//! Tie-break and threshold conventions:
//! - the option with the strictly largest fill wins; equal fills keep the
//!   option that comes first in configuration order;
//! - a winning fill equal to `min_fill` counts as answered.

mod fill;
mod resolve;

pub use fill::{measure_fills, FillMeasurement, FillParams};
pub use resolve::{resolve, Answer, AnswerRecord, DEFAULT_MIN_FILL};
