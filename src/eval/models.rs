use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use crate::prompts::ANSWER_FORMAT_INSTRUCTION;

/// A multiple-choice answer letter
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize,
)]
pub enum Label {
    A,
    B,
    C,
    D,
}

impl Label {
    pub const ALL: [Label; 4] = [Label::A, Label::B, Label::C, Label::D];

    /// Case-insensitive conversion from a single letter
    pub fn from_char(c: char) -> Option<Label> {
        match c.to_ascii_uppercase() {
            'A' => Some(Label::A),
            'B' => Some(Label::B),
            'C' => Some(Label::C),
            'D' => Some(Label::D),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::A => "A",
            Label::B => "B",
            Label::C => "C",
            Label::D => "D",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One multiple-choice question as stored in a CyberMetric dataset file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Question {
    #[serde(rename = "question")]
    pub text: String,
    #[serde(rename = "answers")]
    pub options: BTreeMap<Label, String>,
    #[serde(rename = "solution")]
    pub expected_answer: Label,
}

impl Question {
    /// Options rendered as `A) first, B) second, ...` in label order
    pub fn formatted_options(&self) -> String {
        self.options
            .iter()
            .map(|(label, text)| format!("{}) {}", label, text))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn user_prompt(&self) -> String {
        format!(
            "Question: {}\nOptions: {}\n\n{}",
            self.text,
            self.formatted_options(),
            ANSWER_FORMAT_INSTRUCTION
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct Dataset {
    pub questions: Vec<Question>,
}

pub fn load_dataset(path: &Path) -> Result<Dataset> {
    let contents = std::fs::read_to_string(path).with_context(|| {
        format!("Failed to read dataset file {}", path.display())
    })?;
    parse_dataset(&contents).with_context(|| {
        format!("Failed to parse dataset file {}", path.display())
    })
}

pub fn parse_dataset(contents: &str) -> Result<Dataset> {
    let dataset: Dataset = serde_json::from_str(contents)?;
    for (index, question) in dataset.questions.iter().enumerate() {
        if !question.options.contains_key(&question.expected_answer) {
            return Err(anyhow::anyhow!(
                "Question {} has solution {} which is not one of its options",
                index,
                question.expected_answer
            ));
        }
    }
    Ok(dataset)
}

/// Outcome for a single question
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    pub question: String,
    pub expected: Label,
    /// `None` when no attempt produced a parseable answer
    pub obtained: Option<Label>,
    pub attempts: u32,
}

impl EvaluationRecord {
    pub fn is_correct(&self) -> bool {
        self.obtained == Some(self.expected)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum EvalError {
    #[error("division by zero: accuracy is undefined for an empty question set")]
    EmptyDataset,
}

/// Aggregate outcome of one run over a question set
///
/// Only grows through [`RunStatistics::record`], which keeps
/// `correct_count <= total_count`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatistics {
    total_count: usize,
    correct_count: usize,
    mismatches: Vec<EvaluationRecord>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one question's outcome and returns whether it was correct
    pub fn record(&mut self, record: EvaluationRecord) -> bool {
        self.total_count += 1;
        let correct = record.is_correct();
        if correct {
            self.correct_count += 1;
        } else {
            self.mismatches.push(record);
        }
        correct
    }

    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn correct_count(&self) -> usize {
        self.correct_count
    }

    pub fn mismatches(&self) -> &[EvaluationRecord] {
        &self.mismatches
    }

    /// Percentage of correct answers
    pub fn accuracy(&self) -> Result<f64, EvalError> {
        if self.total_count == 0 {
            return Err(EvalError::EmptyDataset);
        }
        Ok(self.correct_count as f64 / self.total_count as f64 * 100.0)
    }
}
