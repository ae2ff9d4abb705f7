//! Multiple-choice benchmark harness for chat models.
//!
//! Questions from a CyberMetric dataset are sent one at a time to an
//! OpenAI-compatible chat completions endpoint. Each reply is parsed for
//! an `ANSWER: X` token and compared with the expected solution.

pub mod cli;
pub mod eval;
pub mod openai;
pub mod prompts;
pub mod test_utils;
