use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::FillMeasurement;

/// Minimum ink pixel count for a bubble to count as marked.
pub const DEFAULT_MIN_FILL: u32 = 200;

/// Resolved answer to one question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Answer {
    Selected(String),
    Blank,
}

impl Answer {
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Selected(label) => Some(label),
            Self::Blank => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank)
    }
}

/// Per-sheet answers keyed by question number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerRecord {
    answers: BTreeMap<u32, Answer>,
}

impl AnswerRecord {
    pub fn get(&self, question: u32) -> Option<&Answer> {
        self.answers.get(&question)
    }

    /// Answers in ascending question order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &Answer)> + '_ {
        self.answers.iter().map(|(&q, a)| (q, a))
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    pub fn answered_count(&self) -> usize {
        self.answers.values().filter(|a| !a.is_blank()).count()
    }
}

impl FromIterator<(u32, Answer)> for AnswerRecord {
    fn from_iter<I: IntoIterator<Item = (u32, Answer)>>(iter: I) -> Self {
        Self {
            answers: iter.into_iter().collect(),
        }
    }
}

struct Best<'a> {
    option: usize,
    fill: u32,
    label: &'a str,
}

/// Pick one answer per question.
///
/// The option with the largest fill wins; on equal fills the lower option
/// index wins, whatever order the measurements arrive in. A winner with
/// `fill < min_fill` is recorded as [`Answer::Blank`].
pub fn resolve(measurements: &[FillMeasurement], min_fill: u32) -> AnswerRecord {
    let mut best: BTreeMap<u32, Best<'_>> = BTreeMap::new();
    for m in measurements {
        let candidate = Best {
            option: m.option,
            fill: m.fill,
            label: &m.label,
        };
        match best.get_mut(&m.question) {
            None => {
                best.insert(m.question, candidate);
            }
            Some(cur) => {
                if m.fill > cur.fill || (m.fill == cur.fill && m.option < cur.option) {
                    *cur = candidate;
                }
            }
        }
    }

    best.into_iter()
        .map(|(q, b)| {
            let answer = if b.fill >= min_fill {
                Answer::Selected(b.label.to_string())
            } else {
                log::trace!("question {q}: best fill {} below {min_fill}", b.fill);
                Answer::Blank
            };
            (q, answer)
        })
        .collect()
}
