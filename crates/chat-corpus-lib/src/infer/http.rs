//! OpenAI-compatible chat-completion backend.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerateError, Generator, InferenceConfig};

#[derive(Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<RequestMessage<'a>>,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Extract the assistant text from a chat-completion response body.
fn parse_response(body: &str) -> Result<String, GenerateError> {
    let parsed: CompletionResponse = serde_json::from_str(body)
        .map_err(|e| GenerateError::MalformedResponse(format!("{}: {}", e, body)))?;
    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| GenerateError::MalformedResponse("response has no choices".to_string()))
}

/// Generator backed by an HTTP chat-completion endpoint.
#[derive(Debug)]
pub struct HttpGenerator {
    client: Client,
    endpoint: String,
    model: String,
    token: Option<String>,
    max_new_tokens: u32,
}

impl HttpGenerator {
    pub fn new(config: &InferenceConfig, max_new_tokens: u32) -> Result<Self, GenerateError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        let token = match config.api_key_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(value) if !value.trim().is_empty() => Some(value),
                _ => {
                    warn!(env = var, "API token variable not set; sending unauthenticated requests");
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            token,
            max_new_tokens,
        })
    }
}

impl Generator for HttpGenerator {
    fn name(&self) -> &str {
        &self.model
    }

    fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let request = CompletionRequest {
            model: &self.model,
            messages: vec![RequestMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_new_tokens,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(status = status.as_u16(), bytes = body.len(), "completion response");

        if !status.is_success() {
            return Err(GenerateError::Status {
                status: status.as_u16(),
                body,
            });
        }
        parse_response(&body)
    }
}
