use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(thiserror::Error, Debug)]
pub enum AnswerKeyError {
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("answer key: `{0}` is not a question number")]
    InvalidQuestion(String),
    #[error("answer key: question {0} has no accepted labels")]
    EmptyLabels(u32),
    #[error("answer key: question {0} is listed more than once")]
    DuplicateQuestion(u32),
    #[error("answer key line {line}: expected `question,answer`, got `{content}`")]
    MalformedRow { line: usize, content: String },
}

/// A keyed question that the grid layout does not contain. It cannot be
/// graded, but the batch still runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct KeyMismatch {
    pub question: u32,
}

impl fmt::Display for KeyMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "answer key references question {}, which is not on the sheet",
            self.question
        )
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KeyEntry {
    Labels(String),
    List(Vec<String>),
    Number(u64),
}

/// Accepted option labels per question.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AnswerKey {
    accepted: BTreeMap<u32, BTreeSet<String>>,
}

impl AnswerKey {
    /// Build a key from `(question, "A,D")` pairs.
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (u32, &'a str)>,
    ) -> Result<Self, AnswerKeyError> {
        let mut key = Self::default();
        for (question, labels) in pairs {
            key.insert(question, split_labels(labels))?;
        }
        Ok(key)
    }

    /// Parse a JSON object mapping question numbers to accepted labels.
    ///
    /// Values may be a delimited string (`"A,D"`), a list of labels, or a bare
    /// number for numeric labels.
    pub fn from_json_str(raw: &str) -> Result<Self, AnswerKeyError> {
        let entries: BTreeMap<String, KeyEntry> = serde_json::from_str(raw)?;
        let mut key = Self::default();
        for (q, entry) in entries {
            let question = parse_question(&q)?;
            let labels = match entry {
                KeyEntry::Labels(s) => split_labels(&s),
                KeyEntry::List(list) => list
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                KeyEntry::Number(n) => BTreeSet::from([n.to_string()]),
            };
            key.insert(question, labels)?;
        }
        Ok(key)
    }

    /// Parse a two-column `question,answer` table.
    ///
    /// Columns may be separated by a tab, comma or semicolon; everything
    /// after the first separator is the label list. A first row whose
    /// question column is not a number is taken as a header. Blank lines are
    /// skipped.
    pub fn from_table_str(raw: &str) -> Result<Self, AnswerKeyError> {
        let mut key = Self::default();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(split) = line.find(['\t', ',', ';']) else {
                return Err(AnswerKeyError::MalformedRow {
                    line: idx + 1,
                    content: line.to_string(),
                });
            };
            let (q, rest) = (unquote(&line[..split]), unquote(&line[split + 1..]));
            let question = match parse_question(q) {
                Ok(question) => question,
                Err(_) if key.is_empty() && idx == 0 => continue,
                Err(e) => return Err(e),
            };
            key.insert(question, split_labels(rest))?;
        }
        Ok(key)
    }

    fn insert(&mut self, question: u32, labels: BTreeSet<String>) -> Result<(), AnswerKeyError> {
        if labels.is_empty() {
            return Err(AnswerKeyError::EmptyLabels(question));
        }
        if self.accepted.insert(question, labels).is_some() {
            return Err(AnswerKeyError::DuplicateQuestion(question));
        }
        Ok(())
    }

    pub fn accepted(&self, question: u32) -> Option<&BTreeSet<String>> {
        self.accepted.get(&question)
    }

    /// Whether `label` is accepted for `question`; `None` if unkeyed.
    pub fn accepts(&self, question: u32, label: &str) -> Option<bool> {
        self.accepted.get(&question).map(|set| set.contains(label))
    }

    pub fn questions(&self) -> impl Iterator<Item = u32> + '_ {
        self.accepted.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Keyed questions that are not among `questions`. Each one is logged.
    pub fn check_against(&self, questions: &[u32]) -> Vec<KeyMismatch> {
        let known: BTreeSet<u32> = questions.iter().copied().collect();
        let mismatches: Vec<KeyMismatch> = self
            .questions()
            .filter(|q| !known.contains(q))
            .map(|question| KeyMismatch { question })
            .collect();
        for m in &mismatches {
            log::warn!("{m}");
        }
        mismatches
    }
}

fn parse_question(raw: &str) -> Result<u32, AnswerKeyError> {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix('Q')
        .or_else(|| trimmed.strip_prefix('q'))
        .unwrap_or(trimmed);
    match trimmed.parse::<u32>() {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(AnswerKeyError::InvalidQuestion(raw.to_string())),
    }
}

fn split_labels(raw: &str) -> BTreeSet<String> {
    raw.split([',', ';'])
        .map(|s| unquote(s).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn unquote(s: &str) -> &str {
    s.trim().trim_matches('"').trim()
}
