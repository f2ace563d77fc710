use omr_sheets_bubbles::{measure_fills, resolve, AnswerRecord, FillMeasurement, FillParams};
use omr_sheets_core::{rectify, CanonicalFrame, GrayImage, GrayImageView, RectifyError};
use omr_sheets_layout::{GridConfig, GridConfigError, SamplePoint, SheetLayout};
use omr_sheets_markers::{MarkerLocateError, MarkerLocator, MarkerSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::BatchConfig;

/// Why one sheet could not be read. Never fatal for a batch.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SheetError {
    #[error("expected 4 corner markers, found {found}")]
    MarkerLocation { found: usize },
    #[error("degenerate marker geometry: {reason}")]
    GeometryDegenerate { reason: String },
    #[error("could not decode image: {reason}")]
    ImageDecode { reason: String },
}

impl From<MarkerLocateError> for SheetError {
    fn from(err: MarkerLocateError) -> Self {
        match &err {
            MarkerLocateError::NotFound { found } => Self::MarkerLocation { found: *found },
            MarkerLocateError::AmbiguousOrder => Self::GeometryDegenerate {
                reason: err.to_string(),
            },
            MarkerLocateError::InvalidImage { .. } => Self::ImageDecode {
                reason: err.to_string(),
            },
        }
    }
}

impl From<RectifyError> for SheetError {
    fn from(err: RectifyError) -> Self {
        Self::GeometryDegenerate {
            reason: err.to_string(),
        }
    }
}

/// A failed sheet, with the binarized page when marker search got that far.
#[derive(thiserror::Error, Debug, Clone)]
#[error("{error}")]
pub struct SheetFailure {
    pub error: SheetError,
    pub binarized: Option<GrayImage>,
}

impl From<SheetError> for SheetFailure {
    fn from(error: SheetError) -> Self {
        Self {
            error,
            binarized: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SheetReading {
    pub markers: MarkerSet,
    pub frame: CanonicalFrame,
    pub fills: Vec<FillMeasurement>,
    pub answers: AnswerRecord,
}

/// Read-only per-batch state; share one reader across worker threads.
pub struct SheetReader {
    layout: SheetLayout,
    points: Vec<SamplePoint>,
    locator: MarkerLocator,
    fill: FillParams,
    min_fill: u32,
}

impl SheetReader {
    pub fn new(layout: SheetLayout, config: &BatchConfig) -> Self {
        let points = layout.sample_points();
        Self {
            layout,
            points,
            locator: MarkerLocator::new(config.markers.clone()),
            fill: config.fill.clone(),
            min_fill: config.min_fill,
        }
    }

    /// Validate a grid configuration and build a reader from it.
    pub fn from_grid_config(
        grid: &GridConfig,
        config: &BatchConfig,
    ) -> Result<Self, GridConfigError> {
        Ok(Self::new(SheetLayout::from_config(grid)?, config))
    }

    pub fn layout(&self) -> &SheetLayout {
        &self.layout
    }

    pub fn sample_points(&self) -> &[SamplePoint] {
        &self.points
    }

    pub fn min_fill(&self) -> u32 {
        self.min_fill
    }

    /// Locate markers, rectify, measure every bubble and resolve answers.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn read_sheet(&self, img: &GrayImageView<'_>) -> Result<SheetReading, SheetFailure> {
        let located = self.locator.locate_debug(img);
        let binarized = (located.binarized.width > 0).then_some(located.binarized);
        let markers = match located.result {
            Ok(markers) => markers,
            Err(err) => {
                return Err(SheetFailure {
                    error: err.into(),
                    binarized,
                })
            }
        };

        let frame = match rectify(img, &markers.corners(), self.layout.frame) {
            Ok(frame) => frame,
            Err(err) => {
                return Err(SheetFailure {
                    error: err.into(),
                    binarized,
                })
            }
        };

        let fills = measure_fills(&frame, &self.points, &self.fill);
        let answers = resolve(&fills, self.min_fill);
        log::debug!(
            "{} of {} question(s) answered",
            answers.answered_count(),
            answers.len()
        );

        Ok(SheetReading {
            markers,
            frame,
            fills,
            answers,
        })
    }
}

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}
