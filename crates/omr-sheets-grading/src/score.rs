use omr_sheets_bubbles::{Answer, AnswerRecord};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::AnswerKey;

/// Points per question outcome.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub correct: f64,
    pub incorrect: f64,
    pub unanswered: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            correct: 1.0,
            incorrect: 0.0,
            unanswered: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "+")]
    Correct,
    #[serde(rename = "-")]
    Incorrect,
    #[serde(rename = "no-response")]
    NoResponse,
    /// Not in the key; scores nothing.
    #[serde(rename = "")]
    Unkeyed,
}

impl Outcome {
    /// Table mark for this outcome.
    pub fn mark(&self) -> &'static str {
        match self {
            Self::Correct => "+",
            Self::Incorrect => "-",
            Self::NoResponse => "no-response",
            Self::Unkeyed => "",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GradeReport {
    pub outcomes: BTreeMap<u32, Outcome>,
    pub score: f64,
}

impl GradeReport {
    pub fn outcome(&self, question: u32) -> Option<Outcome> {
        self.outcomes.get(&question).copied()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.outcomes.values().filter(|&&o| o == outcome).count()
    }
}

/// Grade one sheet. Each question is scored on its own.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip_all, fields(questions = record.len()))
)]
pub fn grade(record: &AnswerRecord, key: &AnswerKey, policy: &ScoringPolicy) -> GradeReport {
    let mut report = GradeReport::default();
    for (question, answer) in record.iter() {
        let outcome = match (key.accepted(question), answer) {
            (None, _) => Outcome::Unkeyed,
            (Some(_), Answer::Blank) => Outcome::NoResponse,
            (Some(accepted), Answer::Selected(label)) if accepted.contains(label) => {
                Outcome::Correct
            }
            (Some(_), Answer::Selected(_)) => Outcome::Incorrect,
        };
        report.score += match outcome {
            Outcome::Correct => policy.correct,
            Outcome::Incorrect => policy.incorrect,
            Outcome::NoResponse => policy.unanswered,
            Outcome::Unkeyed => 0.0,
        };
        report.outcomes.insert(question, outcome);
    }
    report
}
