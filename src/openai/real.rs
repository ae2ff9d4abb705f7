use crate::openai::{
    ChatClientTrait, EndpointConfig, EndpointError, EndpointRequest,
};
use anyhow::{Context, Result};
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument};

// Only the path to the first completion's text is required; servers are
// free to send whatever else they like.
#[derive(Debug, Deserialize)]
struct CompletionBody {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

/// Chat client for an OpenAI-compatible `/v1/chat/completions` endpoint
/// (vLLM, ilab serve, llama.cpp server, ...)
pub struct RealChatClient {
    http: reqwest::Client,
    config: EndpointConfig,
}

impl RealChatClient {
    pub fn new(config: EndpointConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn build_body(
        &self,
        request: &EndpointRequest,
    ) -> Result<CreateChatCompletionRequest, EndpointError> {
        let system_message = ChatCompletionRequestMessage::System(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_prompt.as_str())
                .build()?,
        );
        let user_message = ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_prompt.clone())
                .build()?,
        );

        Ok(CreateChatCompletionRequestArgs::default()
            .model(self.config.model.as_str())
            .messages([system_message, user_message])
            .temperature(request.temperature)
            .build()?)
    }
}

pub fn parse_completion(body: &str) -> Result<String, EndpointError> {
    let parsed: CompletionBody = serde_json::from_str(body)
        .map_err(|e| EndpointError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| EndpointError::Malformed("no choices".to_string()))?
        .message
        .content
        .ok_or_else(|| {
            EndpointError::Malformed("first choice has no content".to_string())
        })
}

#[async_trait]
impl ChatClientTrait for RealChatClient {
    #[instrument(skip(self, request), fields(model = %self.config.model), err)]
    async fn chat_completion(
        &self,
        request: &EndpointRequest,
    ) -> Result<String, EndpointError> {
        let body = self.build_body(request)?;

        let mut builder = self
            .http
            .post(self.config.url.clone())
            .header("Content-Type", "application/json")
            .json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;

        // Get status code before consuming response with text()
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(EndpointError::Status { status, body: text });
        }
        debug!("Completion response: {}", text);

        parse_completion(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;
    use url::Url;

    const COMPLETIONS_PATH: &str = "/v1/chat/completions";

    fn client_for(server: &mockito::ServerGuard) -> RealChatClient {
        let url =
            Url::parse(&format!("{}{}", server.url(), COMPLETIONS_PATH))
                .unwrap();
        RealChatClient::new(EndpointConfig::new(url, "test-model")).unwrap()
    }

    fn sample_request() -> EndpointRequest {
        EndpointRequest {
            system_prompt: "You are a security expert.".to_string(),
            user_prompt: "Question: Is XSS a vulnerability?".to_string(),
            temperature: 0.0,
        }
    }

    #[test]
    fn test_parse_completion_reads_first_choice() {
        let body = r#"{"choices":[
            {"message":{"role":"assistant","content":"ANSWER: C"}},
            {"message":{"role":"assistant","content":"ANSWER: D"}}
        ]}"#;
        assert_eq!(parse_completion(body).unwrap(), "ANSWER: C");
    }

    #[test]
    fn test_parse_completion_rejects_missing_fields() {
        for body in [
            "not json at all",
            r#"{"id":"x"}"#,
            r#"{"choices":[]}"#,
            r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#,
        ] {
            let result = parse_completion(body);
            assert!(
                matches!(result, Err(EndpointError::Malformed(_))),
                "expected malformed error for {}, got {:?}",
                body,
                result
            );
        }
    }

    #[tokio::test]
    async fn test_sends_model_messages_and_zero_temperature() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .match_header("content-type", "application/json")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "temperature": 0.0,
                "messages": [
                    {"role": "system", "content": "You are a security expert."},
                    {"role": "user", "content": "Question: Is XSS a vulnerability?"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"id":"cmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":"ANSWER: A"}}]}"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = client_for(&server);
        let content =
            client.chat_completion(&sample_request()).await.unwrap();

        assert_eq!(content, "ANSWER: A");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_sends_bearer_token_when_configured() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .match_header("authorization", "Bearer secret-key")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"content":"ANSWER: B"}}]}"#)
            .create_async()
            .await;

        let url =
            Url::parse(&format!("{}{}", server.url(), COMPLETIONS_PATH))
                .unwrap();
        let config = EndpointConfig::new(url, "test-model")
            .with_api_key(Some("secret-key".to_string()));
        let client = RealChatClient::new(config).unwrap();

        let content =
            client.chat_completion(&sample_request()).await.unwrap();
        assert_eq!(content, "ANSWER: B");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_non_success_status_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(503)
            .with_body("model is loading")
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .chat_completion(&sample_request())
            .await
            .unwrap_err();

        match err {
            EndpointError::Status { status, body } => {
                assert_eq!(status.as_u16(), 503);
                assert_eq!(body, "model is loading");
            }
            other => panic!("expected status error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_an_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(200)
            .with_body(r#"{"result":"ANSWER: A"}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client
            .chat_completion(&sample_request())
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Malformed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to be listening
        let url = Url::parse("http://127.0.0.1:9/v1/chat/completions")
            .unwrap();
        let client =
            RealChatClient::new(EndpointConfig::new(url, "test-model"))
                .unwrap();

        let err = client
            .chat_completion(&sample_request())
            .await
            .unwrap_err();

        assert!(matches!(err, EndpointError::Transport(_)));
    }
}
