//! Answer keys in, answer/grade/failure tables and JSON reports out.

use omr_sheets_grading::{AnswerKey, AnswerKeyError, ScoringPolicy};
use omr_sheets_layout::LayoutIoError;
use std::borrow::Cow;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::BatchOutcome;

#[derive(thiserror::Error, Debug)]
pub enum OmrIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Layout(#[from] LayoutIoError),
    #[error(transparent)]
    Key(#[from] AnswerKeyError),
}

/// Load an answer key: `.json` files as a question → labels object,
/// anything else as a two-column table.
pub fn load_answer_key(path: impl AsRef<Path>) -> Result<AnswerKey, OmrIoError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let key = if is_json {
        AnswerKey::from_json_str(&raw)?
    } else {
        AnswerKey::from_table_str(&raw)?
    };
    log::info!(
        "loaded answer key with {} question(s) from {}",
        key.len(),
        path.display()
    );
    Ok(key)
}

/// Load a scoring policy override; missing weights keep their defaults.
pub fn load_scoring_policy(path: impl AsRef<Path>) -> Result<ScoringPolicy, OmrIoError> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn csv_cell(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn write_row<W: Write>(w: &mut W, cells: &[Cow<'_, str>]) -> std::io::Result<()> {
    writeln!(w, "{}", cells.join(","))
}

fn header(questions: &[u32], extra: Option<&'static str>) -> Vec<Cow<'static, str>> {
    let mut row = vec![Cow::Borrowed("file")];
    row.extend(questions.iter().map(|q| Cow::Owned(format!("Q{q}"))));
    row.extend(extra.map(Cow::Borrowed));
    row
}

/// One row per read sheet: `file,Q1..Qn`. Blank answers are empty cells.
pub fn write_answer_csv<W: Write>(w: &mut W, outcome: &BatchOutcome) -> std::io::Result<()> {
    write_row(w, &header(&outcome.questions, None))?;
    for sheet in &outcome.sheets {
        let mut row = vec![csv_cell(&sheet.file)];
        for &q in &outcome.questions {
            let label = sheet.answers.get(q).and_then(|a| a.label()).unwrap_or("");
            row.push(csv_cell(label));
        }
        write_row(w, &row)?;
    }
    Ok(())
}

/// One row per graded sheet: `file,Q1..Qn,score` with `+`, `-`,
/// `no-response`, or an empty cell for unkeyed questions.
pub fn write_grade_csv<W: Write>(w: &mut W, outcome: &BatchOutcome) -> std::io::Result<()> {
    write_row(w, &header(&outcome.questions, Some("score")))?;
    for sheet in &outcome.sheets {
        let Some(grade) = &sheet.grade else { continue };
        let mut row = vec![csv_cell(&sheet.file)];
        for &q in &outcome.questions {
            let mark = grade.outcome(q).map(|o| o.mark()).unwrap_or("");
            row.push(Cow::Borrowed(mark));
        }
        row.push(Cow::Owned(grade.score.to_string()));
        write_row(w, &row)?;
    }
    Ok(())
}

/// `file,reason` for every skipped sheet.
pub fn write_failures_csv<W: Write>(w: &mut W, outcome: &BatchOutcome) -> std::io::Result<()> {
    write_row(w, &[Cow::Borrowed("file"), Cow::Borrowed("reason")])?;
    for failure in &outcome.failures {
        write_row(w, &[csv_cell(&failure.file), csv_cell(&failure.reason)])?;
    }
    Ok(())
}

/// Create `path` and fill it with `write`.
pub fn write_table(
    path: impl AsRef<Path>,
    outcome: &BatchOutcome,
    write: fn(&mut BufWriter<fs::File>, &BatchOutcome) -> std::io::Result<()>,
) -> Result<(), OmrIoError> {
    let mut w = BufWriter::new(fs::File::create(path)?);
    write(&mut w, outcome)?;
    w.flush()?;
    Ok(())
}

/// Write the whole batch outcome as pretty JSON.
pub fn write_report_json(
    path: impl AsRef<Path>,
    outcome: &BatchOutcome,
) -> Result<(), OmrIoError> {
    let json = serde_json::to_string_pretty(outcome)?;
    fs::write(path, json)?;
    Ok(())
}
