//! OpenAI-compatible streaming chat completions

use crate::error::{DriverError, DriverResult};
use futures::StreamExt;
use reqwest::Client;
use reqwest_eventsource::{Error as EventSourceError, Event, EventSource};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// Suffix asking qwen3 models to skip their reasoning phase
const NO_THINK_SUFFIX: &str = " /no_think";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Body of `POST {endpoint}/chat/completions`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub top_p: f32,
    pub stream: bool,
}

impl ChatRequest {
    /// Streaming request for one system and one user prompt
    pub fn streaming(
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f32,
        top_p: f32,
        enable_thinking: bool,
    ) -> Self {
        let user_prompt = if !enable_thinking && model.starts_with("qwen3") {
            format!("{}{}", user_prompt, NO_THINK_SUFFIX)
        } else {
            user_prompt.to_string()
        };

        Self {
            model: model.to_string(),
            messages: vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)],
            temperature,
            top_p,
            stream: true,
        }
    }
}

/// One `data:` payload of the stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default)]
    pub error: Option<ChunkError>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: Delta,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Delta {
    #[serde(default)]
    pub content: Option<String>,
}

/// Error object some servers emit in-band
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChunkError {
    #[serde(default)]
    pub message: String,
}

/// Thin client for one OpenAI-compatible base URL
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(http: Client, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Stream a completion, handing every content delta to `on_delta`, and
    /// return the concatenated response
    pub async fn stream<F>(&self, request: &ChatRequest, mut on_delta: F) -> DriverResult<String>
    where
        F: FnMut(&str),
    {
        let builder = self
            .http
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .json(request);

        let mut source =
            EventSource::new(builder).map_err(|e| DriverError::Stream(e.to_string()))?;
        let mut output = String::new();

        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {
                    debug!("Stream opened");
                }
                Ok(Event::Message(message)) => {
                    if message.data == "[DONE]" {
                        break;
                    }

                    let chunk: ChatChunk = serde_json::from_str(&message.data)?;
                    if let Some(err) = chunk.error {
                        error!("error: {}", err.message);
                    }
                    for choice in chunk.choices {
                        if let Some(content) = choice.delta.content {
                            on_delta(&content);
                            output.push_str(&content);
                        }
                    }
                }
                // Server closed the body without a [DONE] sentinel
                Err(EventSourceError::StreamEnded) => break,
                Err(e) => {
                    source.close();
                    return Err(classify(e).await);
                }
            }
        }

        // Reconnection is never wanted
        source.close();
        Ok(output)
    }
}

async fn classify(e: EventSourceError) -> DriverError {
    match e {
        EventSourceError::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            DriverError::from_status(status, body)
        }
        EventSourceError::InvalidContentType(content_type, response) => {
            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return DriverError::from_status(status, body);
            }
            DriverError::Stream(format!(
                "unexpected content type {:?}",
                content_type.to_str().unwrap_or("<binary>")
            ))
        }
        EventSourceError::Transport(e) => DriverError::from(e),
        other => DriverError::Stream(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_think_only_for_qwen3_without_thinking() {
        let request = ChatRequest::streaming("qwen3:32b-fp16-cm", "sys", "Count to ten.", 0.0, 0.0, false);
        assert_eq!(request.messages[1].content, "Count to ten. /no_think");

        let request = ChatRequest::streaming("qwen3:14b-fp16", "sys", "Count to ten.", 0.0, 0.0, true);
        assert_eq!(request.messages[1].content, "Count to ten.");

        let request = ChatRequest::streaming("gpt-oss:20b", "sys", "Count to ten.", 0.0, 0.0, false);
        assert_eq!(request.messages[1].content, "Count to ten.");
    }

    #[test]
    fn test_request_body_shape() {
        let request = ChatRequest::streaming("gpt-oss:20b", "be brief", "hi", 0.5, 0.25, false);
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["stream"], true);
        assert_eq!(body["model"], "gpt-oss:20b");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "be brief");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["top_p"], 0.25);
    }

    #[test]
    fn test_chunk_parsing() {
        let chunk: ChatChunk = serde_json::from_str(
            r#"{"id":"c1","object":"chat.completion.chunk","choices":[{"index":0,"delta":{"role":"assistant","content":"Hel"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(chunk.choices[0].delta.content.as_deref(), Some("Hel"));

        let last: ChatChunk =
            serde_json::from_str(r#"{"choices":[{"delta":{},"finish_reason":"stop"}]}"#).unwrap();
        assert!(last.choices[0].delta.content.is_none());
        assert_eq!(last.choices[0].finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn test_completions_url() {
        let client = ChatClient::new(Client::new(), "http://127.0.0.1:11434/v1/", "ollama");
        assert_eq!(client.completions_url(), "http://127.0.0.1:11434/v1/chat/completions");
    }
}
