//! JSON grid configuration document.

use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

const RERUN_HINT: &str =
    "regenerate it with the grid setup step using --columns <num> --rows <num> --options <labels>";

#[derive(thiserror::Error, Debug)]
pub enum LayoutIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Fatal configuration errors. Raised before any sheet is processed.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridConfigError {
    #[error("invalid grid configuration: neither `grids` nor `x_offsets` is set; {RERUN_HINT}")]
    MissingLayout,
    #[error("invalid grid configuration: missing `{key}`; {RERUN_HINT}")]
    MissingKey { key: &'static str },
    #[error("invalid grid configuration: `{key}` {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("invalid grid configuration: option label `{0}` appears more than once")]
    DuplicateOption(String),
    #[error("invalid grid configuration: {columns} columns but only {offsets} `x_offsets`")]
    TooFewOffsets { columns: usize, offsets: usize },
}

impl GridConfigError {
    pub(crate) fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// One rectangular multi-grid entry in normalized canonical coordinates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridEntry {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_spacing_px: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_radius_px: Option<f32>,
}

/// Grid configuration as written by the calibration tool.
///
/// Every field is optional at the document level so that a missing key is
/// reported by name instead of as a generic parse error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    #[serde(default)]
    pub warp_w: Option<usize>,
    #[serde(default)]
    pub warp_h: Option<usize>,
    #[serde(default)]
    pub rows: Option<usize>,
    #[serde(default)]
    pub options: Option<Vec<String>>,

    /// Multi-grid layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grids: Option<Vec<GridEntry>>,
    /// Sheet-wide bubble calibration, inherited by grids without their own.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_spacing_px: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bubble_radius_px: Option<f32>,

    /// Legacy single-grid layout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_offsets: Option<Vec<f32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_start: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_step: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub col_width: Option<f32>,
    #[serde(default, alias = "cols", skip_serializing_if = "Option::is_none")]
    pub columns: Option<usize>,
}

impl GridConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, LayoutIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), LayoutIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
