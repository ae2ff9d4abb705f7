use regex::Regex;
use std::sync::OnceLock;

use crate::eval::models::Label;

static ANSWER_PATTERN: OnceLock<Regex> = OnceLock::new();

fn answer_pattern() -> &'static Regex {
    ANSWER_PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bANSWER:?\s*([A-D])\b")
            .expect("answer pattern is valid")
    })
}

/// Finds the first `ANSWER: X` token in a model reply
///
/// Matching is case-insensitive, the colon and whitespace are optional,
/// and only a standalone A-D is accepted: the letter starting a word such
/// as "answer conclusively" is skipped and the scan moves on. Returns
/// `None` when no token is present.
pub fn extract_answer(text: &str) -> Option<Label> {
    answer_pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().chars().next())
        .and_then(Label::from_char)
}
