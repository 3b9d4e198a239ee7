//! Chat completion client.
//!
//! Serializes the transcript into the provider request body, POSTs it to the
//! completion endpoint, and extracts the assistant text from the response
//! envelope.

use super::TransportError;
use crate::config::ApiConfig;
use crate::transcript::{Message, Transcript};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Client for the chat completion endpoint.
pub struct ChatClient {
    client: Client,
    url: String,
    model: String,
    credential: String,
    json_mode: bool,
}

impl ChatClient {
    /// Create a chat client from the resolved configuration.
    pub fn new(client: Client, config: &ApiConfig, credential: String) -> Self {
        Self {
            client,
            url: format!(
                "{}/v1/chat/completions",
                config.endpoint.trim_end_matches('/')
            ),
            model: config.chat_model.clone(),
            credential,
            json_mode: config.json_mode,
        }
    }

    /// Send the transcript and return the raw response body.
    ///
    /// The body is accumulated fully before returning. On failure the caller
    /// receives no body and must not attempt extraction.
    pub async fn send(&self, transcript: &Transcript) -> Result<String, TransportError> {
        let request = ChatRequest::from_transcript(&self.model, transcript, self.json_mode);
        debug!(
            body = %serde_json::to_string(&request).unwrap_or_default(),
            "sending chat request"
        );

        let response = self
            .client
            .post(&self.url)
            .header("Authorization", format!("Bearer {}", self.credential))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.clone(),
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: Result<ErrorEnvelope, _> = response.json().await;
            let message = body
                .map(|e| e.error.message)
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TransportError::Status { status, message });
        }

        let body = response
            .text()
            .await
            .map_err(|source| TransportError::Request {
                url: self.url.clone(),
                source,
            })?;
        debug!(%body, "chat response received");
        Ok(body)
    }
}

/// Request body for the chat completion endpoint.
///
/// Building one is a pure rendering of the transcript; an empty transcript
/// yields an empty `messages` array.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl<'a> ChatRequest<'a> {
    /// Render the transcript as an ordered request body.
    pub fn from_transcript(model: &'a str, transcript: &'a Transcript, json_mode: bool) -> Self {
        Self {
            model,
            messages: transcript.messages(),
            response_format: json_mode.then(|| ResponseFormat {
                kind: "json_object",
            }),
        }
    }
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Pull the assistant text out of a response envelope.
///
/// A malformed envelope is an expected outcome (the service may answer with
/// an error document); it degrades to `None` rather than an error.
pub fn extract_reply(body: &str) -> Option<String> {
    let envelope: ChatResponse = serde_json::from_str(body).ok()?;
    envelope.choices.into_iter().next()?.message.content
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_request_preserves_transcript_order() {
        let mut transcript = Transcript::new();
        transcript.push_user("schema");
        transcript.push_user("hello");
        transcript.push_assistant("hi there");

        let request = ChatRequest::from_transcript("test-model", &transcript, false);
        let json: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();

        assert_eq!(json["model"], "test-model");
        let messages = json["messages"].as_array().unwrap();
        assert_eq!(messages.len(), transcript.len());
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[0]["content"], "schema");
        assert_eq!(messages[1]["role"], "user");
        assert_eq!(messages[1]["content"], "hello");
        assert_eq!(messages[2]["role"], "assistant");
        assert_eq!(messages[2]["content"], "hi there");
    }

    #[test]
    fn test_empty_transcript_yields_empty_messages() {
        let transcript = Transcript::new();
        let request = ChatRequest::from_transcript("test-model", &transcript, false);
        let json: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn test_json_mode_adds_response_format() {
        let transcript = Transcript::new();
        let request = ChatRequest::from_transcript("test-model", &transcript, true);
        let json: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert_eq!(json["response_format"]["type"], "json_object");

        let request = ChatRequest::from_transcript("test-model", &transcript, false);
        let json: Value = serde_json::from_str(&serde_json::to_string(&request).unwrap()).unwrap();
        assert!(json.get("response_format").is_none());
    }

    #[test]
    fn test_extract_reply() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(extract_reply(body), Some("hello".to_string()));
    }

    #[test]
    fn test_extract_reply_empty_choices() {
        assert_eq!(extract_reply(r#"{"choices":[]}"#), None);
    }

    #[test]
    fn test_extract_reply_malformed_envelope() {
        assert_eq!(extract_reply("not json at all"), None);
        assert_eq!(extract_reply(r#"{"error":{"message":"quota"}}"#), None);
        assert_eq!(extract_reply(r#"{"choices":"nope"}"#), None);
    }

    #[test]
    fn test_extract_reply_missing_content() {
        assert_eq!(
            extract_reply(r#"{"choices":[{"message":{"role":"assistant"}}]}"#),
            None
        );
        assert_eq!(
            extract_reply(r#"{"choices":[{"message":{"content":42}}]}"#),
            None
        );
    }
}
