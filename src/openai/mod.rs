pub mod fake;
pub mod real;

use async_trait::async_trait;
use std::time::Duration;
use url::Url;

use crate::eval::models::Question;
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

pub const DEFAULT_ENDPOINT_URL: &str =
    "http://127.0.0.1:8000/v1/chat/completions";
pub const DEFAULT_MODEL: &str =
    "/var/home/instruct/.cache/instructlab/models/instructlab/merlinite-7b-lab";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Where and how to reach the chat completion endpoint
#[derive(Debug, Clone)]
pub struct EndpointConfig {
    pub url: Url,
    pub model: String,
    pub api_key: Option<String>,
    /// Upper bound for a single request attempt, body included
    pub timeout: Duration,
}

impl EndpointConfig {
    pub fn new(url: Url, model: impl Into<String>) -> Self {
        Self {
            url,
            model: model.into(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One request to the endpoint. Built fresh for every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    pub temperature: f32,
}

impl EndpointRequest {
    pub fn for_question(system_prompt: &str, question: &Question) -> Self {
        Self {
            system_prompt: system_prompt.to_string(),
            user_prompt: question.user_prompt(),
            temperature: 0.0,
        }
    }
}

impl Default for EndpointRequest {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            user_prompt: String::new(),
            temperature: 0.0,
        }
    }
}

/// Failures of a single request attempt. All of them are retryable.
#[derive(Debug, thiserror::Error)]
pub enum EndpointError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("failed to build request: {0}")]
    InvalidRequest(#[from] async_openai::error::OpenAIError),
}

/// A trait that abstracts the chat completion endpoint for testing
///
/// Both the HTTP client and the scripted fake implement it, so the
/// evaluator never knows which one it is talking to.
#[async_trait]
pub trait ChatClientTrait: Send + Sync {
    /// Sends one request and returns the first completion's message text
    ///
    /// # Errors
    /// Any transport failure, non-success status, or response without
    /// `choices[0].message.content`
    async fn chat_completion(
        &self,
        request: &EndpointRequest,
    ) -> Result<String, EndpointError>;
}
