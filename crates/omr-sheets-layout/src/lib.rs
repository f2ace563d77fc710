//! Bubble-grid layouts for answer sheets.
//!
//! A [`GridConfig`] is the JSON document written by the calibration tool.
//! [`SheetLayout::from_config`] validates it once and resolves every
//! optional field, and [`SheetLayout::sample_points`] expands it into the
//! flat, immutable list of [`SamplePoint`]s that the fill evaluator reads.
//!
//! Two layouts are supported:
//! - multi-grid: one normalized bounding box per question column, with
//!   explicit or derived bubble geometry per grid;
//! - legacy: explicit column offsets, a fixed column width and a fixed row step.
//!
//! Questions are numbered column-major: `column * rows + row + 1`.

mod config;
mod model;
mod points;

pub use config::{GridConfig, GridConfigError, GridEntry, LayoutIoError};
pub use model::{BubbleGeometry, GridLayout, GridSpec, LegacyLayout, SheetLayout};
pub use points::{build_sample_points, SamplePoint};
