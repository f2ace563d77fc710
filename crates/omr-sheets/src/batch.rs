use omr_sheets_bubbles::{AnswerRecord, FillMeasurement};
use omr_sheets_grading::{grade, AnswerKey, GradeReport, KeyMismatch, ScoringPolicy};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::{diagnostics, gray_view, SheetError, SheetFailure, SheetReader};

const SHEET_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Clone, Debug, Serialize)]
pub struct SheetOutcome {
    pub file: String,
    pub answers: AnswerRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<GradeReport>,
    pub fills: Vec<FillMeasurement>,
}

/// A sheet that was skipped, with the reason shown to the operator.
#[derive(Clone, Debug, Serialize)]
pub struct SheetFailureRecord {
    pub file: String,
    pub reason: String,
    /// Corner markers found, when marker location was the failing step.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markers_found: Option<usize>,
}

impl SheetFailureRecord {
    fn new(file: String, error: &SheetError) -> Self {
        let markers_found = match error {
            SheetError::MarkerLocation { found } => Some(*found),
            _ => None,
        };
        Self {
            file,
            reason: error.to_string(),
            markers_found,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BatchOutcome {
    /// Question numbers of the layout, in table column order.
    pub questions: Vec<u32>,
    pub sheets: Vec<SheetOutcome>,
    pub failures: Vec<SheetFailureRecord>,
    pub key_mismatches: Vec<KeyMismatch>,
}

/// All `png`/`jpg`/`jpeg` files directly inside `dir`, sorted by file name.
pub fn discover_sheets(dir: impl AsRef<Path>) -> std::io::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_sheet = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| SHEET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()));
        if is_sheet && path.is_file() {
            paths.push(path);
        }
    }
    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Read and optionally grade every sheet, in parallel.
///
/// A sheet that fails is recorded in [`BatchOutcome::failures`] and the rest
/// of the batch still runs. Results are ordered by file name. When
/// `debug_dir` is set, annotated sheets and failed marker searches are
/// written there.
pub fn run_batch(
    paths: &[PathBuf],
    reader: &SheetReader,
    key: Option<&AnswerKey>,
    policy: &ScoringPolicy,
    debug_dir: Option<&Path>,
) -> BatchOutcome {
    let questions = reader.layout().question_numbers();
    let key_mismatches = key
        .map(|k| k.check_against(&questions))
        .unwrap_or_default();

    let mut ordered: Vec<&PathBuf> = paths.iter().collect();
    ordered.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

    let results: Vec<Result<SheetOutcome, SheetFailureRecord>> = ordered
        .par_iter()
        .map(|path| process_sheet(path, reader, key, policy, debug_dir))
        .collect();

    let mut outcome = BatchOutcome {
        questions,
        key_mismatches,
        ..BatchOutcome::default()
    };
    for result in results {
        match result {
            Ok(sheet) => outcome.sheets.push(sheet),
            Err(failure) => outcome.failures.push(failure),
        }
    }
    log::info!(
        "batch done: {} sheet(s) read, {} failed",
        outcome.sheets.len(),
        outcome.failures.len()
    );
    outcome
}

fn process_sheet(
    path: &Path,
    reader: &SheetReader,
    key: Option<&AnswerKey>,
    policy: &ScoringPolicy,
    debug_dir: Option<&Path>,
) -> Result<SheetOutcome, SheetFailureRecord> {
    let file = file_name(path);
    let img = match image::open(path) {
        Ok(img) => img.to_luma8(),
        Err(err) => {
            let error = SheetError::ImageDecode {
                reason: err.to_string(),
            };
            log::warn!("{file}: {error}");
            return Err(SheetFailureRecord::new(file, &error));
        }
    };

    let reading = match reader.read_sheet(&gray_view(&img)) {
        Ok(reading) => reading,
        Err(SheetFailure { error, binarized }) => {
            log::warn!("{file}: {error}");
            if let (Some(dir), Some(binarized)) = (debug_dir, binarized.as_ref()) {
                let out = dir.join(format!("{}_markers.png", stem(path)));
                if let Err(err) = diagnostics::save_gray(binarized, &out) {
                    log::warn!("{file}: could not write {}: {err}", out.display());
                }
            }
            return Err(SheetFailureRecord::new(file, &error));
        }
    };

    let grade = key.map(|k| grade(&reading.answers, k, policy));
    if let Some(dir) = debug_dir {
        let out = dir.join(format!("{}_debug.png", stem(path)));
        let annotated =
            diagnostics::annotate_sheet(&reading, reader.sample_points(), grade.as_ref());
        if let Err(err) = annotated.save(&out) {
            log::warn!("{file}: could not write {}: {err}", out.display());
        }
    }
    log::debug!("{file}: {} answered", reading.answers.answered_count());

    Ok(SheetOutcome {
        file,
        answers: reading.answers,
        grade,
        fills: reading.fills,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sheet".to_string())
}
