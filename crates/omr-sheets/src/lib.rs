//! Read and grade photographed multiple-choice answer sheets.
//!
//! This crate ties the `omr-sheets-*` workspace together:
//! - re-exports of the stage crates;
//! - [`SheetReader`], the per-sheet pipeline
//!   (locate markers, rectify, measure fills, resolve answers);
//! - [`run_batch`], which reads a folder of scans in parallel and keeps going
//!   when a single sheet fails;
//! - CSV/JSON output tables and diagnostic images.
//!
//! ## Quickstart
//!
//! ```no_run
//! use omr_sheets::{gray_view, BatchConfig, SheetReader};
//! use omr_sheets::layout::GridConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let grid = GridConfig::load_json("grid_config.json")?;
//! let reader = SheetReader::from_grid_config(&grid, &BatchConfig::default())?;
//! let img = image::open("sheet.jpg")?.to_luma8();
//! match reader.read_sheet(&gray_view(&img)) {
//!     Ok(reading) => println!("{} answered", reading.answers.answered_count()),
//!     Err(failure) => eprintln!("{failure}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `omr_sheets::core`: gray images, homographies, Otsu, rectification.
//! - `omr_sheets::markers`: fiducial square locator.
//! - `omr_sheets::layout`: grid configuration and sample points.
//! - `omr_sheets::bubbles`: fill measurement and answer resolution.
//! - `omr_sheets::grading`: answer keys, scoring policies, grading.

pub use omr_sheets_bubbles as bubbles;
pub use omr_sheets_core as core;
pub use omr_sheets_grading as grading;
pub use omr_sheets_layout as layout;
pub use omr_sheets_markers as markers;

mod batch;
mod config;
pub mod diagnostics;
pub mod io;
mod pipeline;

pub use batch::{discover_sheets, run_batch, BatchOutcome, SheetFailureRecord, SheetOutcome};
pub use config::BatchConfig;
pub use pipeline::{gray_view, SheetError, SheetFailure, SheetReader, SheetReading};
