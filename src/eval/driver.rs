use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

use crate::eval::extract::extract_answer;
use crate::eval::models::{EvaluationRecord, Label, Question, RunStatistics};
use crate::eval::report::ProgressReporter;
use crate::openai::{ChatClientTrait, EndpointError, EndpointRequest};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    pub system_prompt: String,
    /// Request/extract cycles per question, first attempt included
    pub max_retries: u32,
    /// Delay before the second attempt; doubles for each one after
    pub backoff_base: Duration,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
        }
    }
}

/// Why an attempt did not yield a label
#[derive(Debug, thiserror::Error)]
enum AttemptFailure {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("no ANSWER token in response: {0:?}")]
    UnparseableAnswer(String),
}

/// Per-question attempt loop. `attempt` is 0-indexed.
#[derive(Debug)]
enum AttemptState {
    Pending,
    Requesting { attempt: u32 },
    Extracting { attempt: u32, text: String },
    RetryWait { attempt: u32 },
    Succeeded { label: Label, attempts: u32 },
    Exhausted { attempts: u32 },
}

/// Answer resolved for one question and how many requests it took
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerOutcome {
    pub obtained: Option<Label>,
    pub attempts: u32,
}

/// Runs a question set against a chat endpoint, one question at a time
pub struct Evaluator {
    client: Arc<dyn ChatClientTrait>,
    config: EvaluatorConfig,
}

impl Evaluator {
    pub fn new(
        client: Arc<dyn ChatClientTrait>,
        config: EvaluatorConfig,
    ) -> Self {
        Self { client, config }
    }

    /// Delay after failed attempt `attempt`: base * 2^attempt
    ///
    /// From attempt 32 on, `2^attempt` no longer fits in `u32`, so the
    /// multiplier stays at `u32::MAX`. The product saturates at
    /// `Duration::MAX`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.config.backoff_base.saturating_mul(factor)
    }

    pub async fn evaluate(&self, questions: &[Question]) -> RunStatistics {
        self.evaluate_with_reporter(questions, &mut ()).await
    }

    pub async fn evaluate_with_reporter(
        &self,
        questions: &[Question],
        reporter: &mut dyn ProgressReporter,
    ) -> RunStatistics {
        let mut stats = RunStatistics::new();

        for (index, question) in questions.iter().enumerate() {
            let outcome = self.ask(question).await;
            let record = EvaluationRecord {
                question: question.text.clone(),
                expected: question.expected_answer,
                obtained: outcome.obtained,
                attempts: outcome.attempts,
            };
            let correct = stats.record(record);
            debug!(
                "Question {} expected {} obtained {:?} correct {}",
                index, question.expected_answer, outcome.obtained, correct
            );

            if let Ok(accuracy) = stats.accuracy() {
                reporter.question_completed(stats.total_count(), accuracy);
            }
        }

        info!(
            "Evaluated {} questions, {} correct",
            stats.total_count(),
            stats.correct_count()
        );
        stats
    }

    /// Resolves one question to a label, retrying with exponential
    /// backoff on any failure including an unparseable reply
    pub async fn ask(&self, question: &Question) -> AnswerOutcome {
        let mut state = AttemptState::Pending;

        loop {
            state = match state {
                AttemptState::Pending => {
                    if self.config.max_retries == 0 {
                        AttemptState::Exhausted { attempts: 0 }
                    } else {
                        AttemptState::Requesting { attempt: 0 }
                    }
                }
                AttemptState::Requesting { attempt } => {
                    let request = EndpointRequest::for_question(
                        &self.config.system_prompt,
                        question,
                    );
                    match self.client.chat_completion(&request).await {
                        Ok(text) => AttemptState::Extracting { attempt, text },
                        Err(e) => self.fail(attempt, e.into()),
                    }
                }
                AttemptState::Extracting { attempt, text } => {
                    match extract_answer(&text) {
                        Some(label) => AttemptState::Succeeded {
                            label,
                            attempts: attempt + 1,
                        },
                        None => self.fail(
                            attempt,
                            AttemptFailure::UnparseableAnswer(text),
                        ),
                    }
                }
                AttemptState::RetryWait { attempt } => {
                    time::sleep(self.backoff_delay(attempt)).await;
                    AttemptState::Requesting {
                        attempt: attempt + 1,
                    }
                }
                AttemptState::Succeeded { label, attempts } => {
                    return AnswerOutcome {
                        obtained: Some(label),
                        attempts,
                    };
                }
                AttemptState::Exhausted { attempts } => {
                    warn!(
                        "No answer after {} attempts for question: {}",
                        attempts, question.text
                    );
                    return AnswerOutcome {
                        obtained: None,
                        attempts,
                    };
                }
            };
        }
    }

    fn fail(&self, attempt: u32, failure: AttemptFailure) -> AttemptState {
        if attempt + 1 >= self.config.max_retries {
            warn!("Attempt {} failed: {}", attempt + 1, failure);
            AttemptState::Exhausted {
                attempts: attempt + 1,
            }
        } else {
            warn!(
                "Attempt {} failed: {}, retrying in {:?}",
                attempt + 1,
                failure,
                self.backoff_delay(attempt)
            );
            AttemptState::RetryWait { attempt }
        }
    }
}
