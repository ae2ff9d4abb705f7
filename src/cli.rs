use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::eval::driver::EvaluatorConfig;
use crate::openai::{EndpointConfig, DEFAULT_ENDPOINT_URL, DEFAULT_MODEL};
use crate::prompts::DEFAULT_SYSTEM_PROMPT;

/// Evaluate a chat model on CyberMetric multiple-choice datasets
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct EvalArgs {
    /// Dataset files to evaluate, one after another
    #[arg(default_values = [
        "CyberMetric-80-v1.json",
        "CyberMetric-500-v1.json",
        "CyberMetric-2000-v1.json",
        "CyberMetric-10000-v1.json",
    ])]
    pub files: Vec<PathBuf>,

    /// Chat completions endpoint URL
    #[arg(
        long,
        default_value = DEFAULT_ENDPOINT_URL,
        env = "CYBERMETRIC_ENDPOINT_URL"
    )]
    pub endpoint_url: Url,

    /// Model identifier sent with every request
    #[arg(long, default_value = DEFAULT_MODEL, env = "CYBERMETRIC_MODEL")]
    pub model: String,

    /// Bearer token for the endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Attempts per question before giving up
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Timeout for a single request, in seconds
    #[arg(long, default_value = "30")]
    pub timeout_secs: u64,

    /// Delay before the first retry, in milliseconds; doubles per retry
    #[arg(long, default_value = "1000")]
    pub backoff_base_ms: u64,

    /// System prompt sent with every question
    #[arg(long, default_value = DEFAULT_SYSTEM_PROMPT)]
    pub system_prompt: String,

    /// Disable the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

impl EvalArgs {
    pub fn endpoint_config(&self) -> EndpointConfig {
        EndpointConfig::new(self.endpoint_url.clone(), self.model.clone())
            .with_api_key(self.api_key.clone())
            .with_timeout(Duration::from_secs(self.timeout_secs))
    }

    pub fn evaluator_config(&self) -> EvaluatorConfig {
        EvaluatorConfig {
            system_prompt: self.system_prompt.clone(),
            max_retries: self.max_retries,
            backoff_base: Duration::from_millis(self.backoff_base_ms),
        }
    }
}
