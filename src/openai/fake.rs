use async_trait::async_trait;
use std::sync::Mutex;

use crate::openai::{ChatClientTrait, EndpointError, EndpointRequest};

/// A fake chat endpoint for testing
///
/// Replies are scripted up front and handed out in order, one per call.
/// Once the script runs out, every call gets the default response.
/// Every request is recorded for verification in tests.
///
/// # Example
///
/// ```
/// use cybermetric_eval::openai::fake::FakeChatClient;
/// use cybermetric_eval::openai::{ChatClientTrait, EndpointRequest};
///
/// #[tokio::main]
/// async fn main() {
///     let client = FakeChatClient::new()
///         .with_status_failure(503)
///         .with_response("ANSWER: B");
///
///     let request = EndpointRequest::default();
///     assert!(client.chat_completion(&request).await.is_err());
///     assert_eq!(
///         client.chat_completion(&request).await.unwrap(),
///         "ANSWER: B"
///     );
///     assert_eq!(client.request_count(), 2);
/// }
/// ```
pub struct FakeChatClient {
    replies: Mutex<Vec<Result<String, EndpointError>>>,
    default_response: String,
    // Track requests for verification in tests
    pub requests: Mutex<Vec<EndpointRequest>>,
}

impl Default for FakeChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeChatClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(vec![]),
            default_response: "Fake default response".to_string(),
            requests: Mutex::new(vec![]),
        }
    }

    /// Add a successful response to the script
    pub fn with_response(self, response: &str) -> Self {
        self.replies.lock().unwrap().push(Ok(response.to_string()));
        self
    }

    /// Add multiple successful responses to the script, in order
    pub fn with_responses(self, responses: Vec<&str>) -> Self {
        {
            let mut replies = self.replies.lock().unwrap();
            for response in responses {
                replies.push(Ok(response.to_string()));
            }
        }
        self
    }

    /// Add a failed attempt to the script
    pub fn with_failure(self, error: EndpointError) -> Self {
        self.replies.lock().unwrap().push(Err(error));
        self
    }

    pub fn with_status_failure(self, status: u16) -> Self {
        let status = reqwest::StatusCode::from_u16(status)
            .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
        self.with_failure(EndpointError::Status {
            status,
            body: "fake failure".to_string(),
        })
    }

    /// Response returned once the script is exhausted
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = response.to_string();
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatClientTrait for FakeChatClient {
    async fn chat_completion(
        &self,
        request: &EndpointRequest,
    ) -> Result<String, EndpointError> {
        self.requests.lock().unwrap().push(request.clone());

        let mut replies = self.replies.lock().unwrap();
        if replies.is_empty() {
            Ok(self.default_response.clone())
        } else {
            replies.remove(0)
        }
    }
}
