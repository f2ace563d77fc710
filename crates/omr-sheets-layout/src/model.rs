//! Validated sheet layout, resolved once from a [`GridConfig`].

use omr_sheets_core::FrameSize;
use serde::Serialize;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{GridConfig, GridConfigError, GridEntry};

const DEFAULT_COL_WIDTH: f32 = 0.2;
/// Slack for normalized boxes that touch the frame edge after rounding.
const UNIT_EPS: f32 = 1e-4;

/// How bubble centers are placed across a grid's width.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BubbleGeometry {
    /// First bubble at `left + radius`, then one step of `spacing` per option.
    Explicit { spacing_px: f32, radius_px: f32 },
    /// Even subdivision of the grid width by option count.
    Derived { radius_px: Option<f32> },
}

impl BubbleGeometry {
    pub fn radius_px(&self) -> Option<f32> {
        match *self {
            Self::Explicit { radius_px, .. } => Some(radius_px),
            Self::Derived { radius_px } => radius_px,
        }
    }
}

/// One question column in normalized canonical coordinates.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GridSpec {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
    pub geometry: BubbleGeometry,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LegacyLayout {
    pub x_offsets: Vec<f32>,
    pub columns: usize,
    pub y_start: f32,
    pub y_step: f32,
    pub col_width: f32,
    pub radius_px: Option<f32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "layout", rename_all = "snake_case")]
pub enum GridLayout {
    Multi { grids: Vec<GridSpec> },
    Legacy(LegacyLayout),
}

/// Template geometry shared by every sheet of one batch.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetLayout {
    pub frame: FrameSize,
    pub rows: usize,
    pub options: Vec<String>,
    pub layout: GridLayout,
}

impl SheetLayout {
    /// Validate a configuration and resolve every optional field.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip_all))]
    pub fn from_config(cfg: &GridConfig) -> Result<Self, GridConfigError> {
        if cfg.grids.is_none() && cfg.x_offsets.is_none() {
            return Err(GridConfigError::MissingLayout);
        }

        let warp_w = positive(cfg.warp_w, "warp_w")?;
        let warp_h = positive(cfg.warp_h, "warp_h")?;
        let rows = positive(cfg.rows, "rows")?;
        let options = validate_options(cfg.options.as_deref())?;

        let layout = match (&cfg.grids, &cfg.x_offsets) {
            (Some(grids), _) => {
                if cfg.x_offsets.is_some() {
                    log::warn!("both `grids` and `x_offsets` present; using `grids`");
                }
                multi_layout(cfg, grids)?
            }
            (None, Some(offsets)) => GridLayout::Legacy(legacy_layout(cfg, offsets)?),
            (None, None) => return Err(GridConfigError::MissingLayout),
        };

        let layout = Self {
            frame: FrameSize::new(warp_w, warp_h),
            rows,
            options,
            layout,
        };
        log::debug!(
            "sheet layout: {}x{} frame, {} column(s) x {} row(s) x {} option(s)",
            warp_w,
            warp_h,
            layout.columns(),
            rows,
            layout.options.len()
        );
        Ok(layout)
    }

    pub fn columns(&self) -> usize {
        match &self.layout {
            GridLayout::Multi { grids } => grids.len(),
            GridLayout::Legacy(legacy) => legacy.columns,
        }
    }

    pub fn question_count(&self) -> usize {
        self.columns() * self.rows
    }

    /// Question numbers covered by this layout, `1..=question_count`.
    pub fn question_numbers(&self) -> Vec<u32> {
        (1..=self.question_count() as u32).collect()
    }

    /// Question number of a (column, row) cell.
    pub fn question_number(&self, column: usize, row: usize) -> u32 {
        (column * self.rows + row + 1) as u32
    }
}

fn positive(value: Option<usize>, key: &'static str) -> Result<usize, GridConfigError> {
    match value {
        None => Err(GridConfigError::MissingKey { key }),
        Some(0) => Err(GridConfigError::invalid(key, "must be greater than zero")),
        Some(v) => Ok(v),
    }
}

fn validate_options(options: Option<&[String]>) -> Result<Vec<String>, GridConfigError> {
    let options = options.ok_or(GridConfigError::MissingKey { key: "options" })?;
    if options.is_empty() {
        return Err(GridConfigError::invalid("options", "must list at least one label"));
    }
    for (i, label) in options.iter().enumerate() {
        if label.trim().is_empty() {
            return Err(GridConfigError::invalid(
                format!("options[{i}]"),
                "must not be empty",
            ));
        }
        if options[..i].contains(label) {
            return Err(GridConfigError::DuplicateOption(label.clone()));
        }
    }
    Ok(options.to_vec())
}

fn optional_px(value: Option<f32>, key: &str) -> Result<Option<f32>, GridConfigError> {
    match value {
        Some(v) if !(v.is_finite() && v > 0.0) => Err(GridConfigError::invalid(
            key,
            format!("must be a positive pixel length, got {v}"),
        )),
        other => Ok(other),
    }
}

fn multi_layout(cfg: &GridConfig, entries: &[GridEntry]) -> Result<GridLayout, GridConfigError> {
    if entries.is_empty() {
        return Err(GridConfigError::invalid("grids", "must contain at least one grid"));
    }
    let sheet_spacing = optional_px(cfg.bubble_spacing_px, "bubble_spacing_px")?;
    let sheet_radius = optional_px(cfg.bubble_radius_px, "bubble_radius_px")?;

    let mut grids = Vec::with_capacity(entries.len());
    for (index, g) in entries.iter().enumerate() {
        let key = |field: &str| format!("grids[{index}].{field}");
        for (field, v) in [("x", g.x), ("y", g.y)] {
            if !(v.is_finite() && (-UNIT_EPS..=1.0 + UNIT_EPS).contains(&v)) {
                return Err(GridConfigError::invalid(
                    key(field),
                    format!("must be in [0, 1], got {v}"),
                ));
            }
        }
        for (field, v) in [("w", g.w), ("h", g.h)] {
            if !(v.is_finite() && v > 0.0) {
                return Err(GridConfigError::invalid(
                    key(field),
                    format!("must be positive, got {v}"),
                ));
            }
        }
        if g.x + g.w > 1.0 + UNIT_EPS || g.y + g.h > 1.0 + UNIT_EPS {
            return Err(GridConfigError::invalid(
                format!("grids[{index}]"),
                "extends past the canonical frame",
            ));
        }

        let spacing =
            optional_px(g.bubble_spacing_px, &key("bubble_spacing_px"))?.or(sheet_spacing);
        let radius = optional_px(g.bubble_radius_px, &key("bubble_radius_px"))?.or(sheet_radius);
        let geometry = match (spacing, radius) {
            (Some(spacing_px), Some(radius_px)) => BubbleGeometry::Explicit {
                spacing_px,
                radius_px,
            },
            (Some(_), None) => {
                log::warn!("grid {index}: bubble spacing without radius, using even subdivision");
                BubbleGeometry::Derived { radius_px: None }
            }
            (None, radius_px) => BubbleGeometry::Derived { radius_px },
        };

        grids.push(GridSpec {
            index,
            x: g.x,
            y: g.y,
            w: g.w,
            h: g.h,
            geometry,
        });
    }
    Ok(GridLayout::Multi { grids })
}

fn legacy_layout(cfg: &GridConfig, offsets: &[f32]) -> Result<LegacyLayout, GridConfigError> {
    let y_start = cfg.y_start.ok_or(GridConfigError::MissingKey { key: "y_start" })?;
    let y_step = cfg.y_step.ok_or(GridConfigError::MissingKey { key: "y_step" })?;
    let col_width = cfg.col_width.unwrap_or(DEFAULT_COL_WIDTH);
    let columns = cfg.columns.unwrap_or(offsets.len());

    if columns == 0 {
        return Err(GridConfigError::invalid("columns", "must be greater than zero"));
    }
    if columns > offsets.len() {
        return Err(GridConfigError::TooFewOffsets {
            columns,
            offsets: offsets.len(),
        });
    }
    for (key, v) in [("y_start", y_start), ("y_step", y_step), ("col_width", col_width)] {
        if !v.is_finite() || v < 0.0 {
            return Err(GridConfigError::invalid(
                key,
                format!("must be a non-negative number, got {v}"),
            ));
        }
    }
    if let Some((i, v)) = offsets.iter().enumerate().find(|(_, v)| !v.is_finite()) {
        return Err(GridConfigError::invalid(
            format!("x_offsets[{i}]"),
            format!("is not finite: {v}"),
        ));
    }

    Ok(LegacyLayout {
        x_offsets: offsets[..columns].to_vec(),
        columns,
        y_start,
        y_step,
        col_width,
        radius_px: optional_px(cfg.bubble_radius_px, "bubble_radius_px")?,
    })
}
