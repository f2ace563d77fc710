//! Locator for the four square fiducials printed in the corners of an
//! answer sheet.
//!
//! Pipeline:
//! 1. Gaussian blur, global Otsu threshold, inverted so ink is foreground.
//! 2. External contours of the foreground blobs.
//! 3. Douglas-Peucker polygon approximation (2% of the perimeter).
//! 4. Keep 4-vertex polygons with a large enough, roughly square bounding box.
//! 5. Exactly four survivors are ordered TL, TR, BR, BL by the sum/difference rule.
//!
//! The locator never guesses: any other candidate count is reported with
//! the count found, and [`MarkerLocator::locate_debug`] keeps the binarized
//! image so the failing sheet can be inspected.

mod locator;
mod params;
mod types;

pub use locator::{MarkerLocateDebug, MarkerLocator};
pub use params::MarkerLocatorParams;
pub use types::{MarkerCandidate, MarkerLocateError, MarkerSet};
