//! Grading resolved answer sheets against an answer key.
//!
//! An [`AnswerKey`] maps each keyed question to the set of accepted labels.
//! [`grade`] compares an [`AnswerRecord`](omr_sheets_bubbles::AnswerRecord)
//! with the key question by question and sums the [`ScoringPolicy`] weights.
//! Questions missing from the key are marked [`Outcome::Unkeyed`] and never
//! contribute to the score.

mod key;
mod score;

pub use key::{AnswerKey, AnswerKeyError, KeyMismatch};
pub use score::{grade, GradeReport, Outcome, ScoringPolicy};
