use omr_sheets_bubbles::{FillParams, DEFAULT_MIN_FILL};
use omr_sheets_grading::ScoringPolicy;
use omr_sheets_markers::MarkerLocatorParams;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::io::OmrIoError;

/// Tunables for one batch run. Every field has a default, so a partial JSON
/// file only overrides what it names.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Minimum ink pixel count for a bubble to count as marked (inclusive).
    pub min_fill: u32,
    pub markers: MarkerLocatorParams,
    pub fill: FillParams,
    pub scoring: ScoringPolicy,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            min_fill: DEFAULT_MIN_FILL,
            markers: MarkerLocatorParams::default(),
            fill: FillParams::default(),
            scoring: ScoringPolicy::default(),
        }
    }
}

impl BatchConfig {
    /// Load a JSON config from disk.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, OmrIoError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), OmrIoError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: BatchConfig =
            serde_json::from_str(r#"{"min_fill": 150, "scoring": {"incorrect": -1}}"#)
                .expect("parse");
        assert_eq!(cfg.min_fill, 150);
        assert_eq!(cfg.scoring.correct, 1.0);
        assert_eq!(cfg.scoring.incorrect, -1.0);
        assert_eq!(cfg.markers, MarkerLocatorParams::default());
        assert_eq!(cfg.fill.default_radius_px, 20.0);
    }

    #[test]
    fn json_file_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("batch.json");
        let cfg = BatchConfig {
            min_fill: 120,
            ..BatchConfig::default()
        };
        cfg.write_json(&path).expect("write");
        assert_eq!(BatchConfig::load_json(&path).expect("load"), cfg);
    }
}
