//! OpenAI-compatible streaming chat completions

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use super::{ChatClient, ChatMessage, ChatRequest};
use crate::config::StyleConfig;
use crate::{Result, StyleError};

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<Choice>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    delta: Delta,
}

#[derive(Debug, Default, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

/// Parsed server-sent event of a completion stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Delta(String),
    Error(String),
    Done,
}

/// Splits a byte stream into `data:` events, holding partial lines across
/// chunk boundaries
#[derive(Debug, Default)]
pub struct EventBuffer {
    pending: Vec<u8>,
}

impl EventBuffer {
    /// Feed a chunk and return the events it completes
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.pending.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(event) = parse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing line that had no newline
    pub fn finish(&mut self) -> Option<StreamEvent> {
        let line = std::mem::take(&mut self.pending);
        parse_line(&line)
    }
}

fn parse_line(raw: &[u8]) -> Option<StreamEvent> {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim();
    let payload = line.strip_prefix("data:")?.trim();

    if payload == "[DONE]" {
        return Some(StreamEvent::Done);
    }

    match serde_json::from_str::<StreamChunk>(payload) {
        Ok(StreamChunk {
            error: Some(err), ..
        }) => Some(StreamEvent::Error(err.message)),
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|text| !text.is_empty())
            .map(StreamEvent::Delta),
        Err(e) => {
            warn!("Failed to parse stream line: {} - Error: {}", payload, e);
            None
        }
    }
}

pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    /// Build a client; fails with a configuration error when the key is missing
    pub fn new(config: &StyleConfig) -> Result<Self> {
        let api_key = config.chat_credential()?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.chat.timeout_seconds.into()))
            .user_agent(concat!("stylecast/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| StyleError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.chat.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.chat.model.clone(),
        })
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn stream_completion(
        &self,
        request: &ChatRequest,
        sink: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let payload = CompletionRequest {
            model: &self.model,
            messages: request.messages(),
            stream: true,
        };
        debug!(prompt = %request.user, "Sending chat completion request");
        let start_time = Instant::now();

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| StyleError::generation(format!("chat request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            error!(%status, %message, "Chat completion request failed");
            return Err(StyleError::generation(format!(
                "HTTP {}: {message}",
                status.as_u16()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut buffer = EventBuffer::default();
        let mut answer = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(|e| {
                error!("Stream error: {}", e);
                StyleError::generation(format!("stream interrupted: {e}"))
            })?;
            for event in buffer.push(&bytes) {
                match event {
                    StreamEvent::Delta(text) => {
                        sink(&text);
                        answer.push_str(&text);
                    }
                    StreamEvent::Error(message) => return Err(StyleError::generation(message)),
                    StreamEvent::Done => break 'outer,
                }
            }
        }
        if let Some(StreamEvent::Delta(text)) = buffer.finish() {
            sink(&text);
            answer.push_str(&text);
        }

        info!(
            "Streamed {} characters in {:.3}s",
            answer.chars().count(),
            start_time.elapsed().as_secs_f64()
        );

        if answer.is_empty() {
            return Err(StyleError::generation("the model returned an empty answer"));
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_buffer_joins_split_lines() {
        let mut buffer = EventBuffer::default();
        let first = buffer.push(b"data: {\"choices\":[{\"delta\":{\"content\":\"An");
        assert!(first.is_empty());
        let second = buffer.push(b"nyeong\"}}]}\n\ndata: [DONE]\n\n");
        assert_eq!(
            second,
            vec![
                StreamEvent::Delta("Annyeong".to_string()),
                StreamEvent::Done
            ]
        );
    }

    #[test]
    fn test_event_buffer_handles_split_utf8() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"맑음\"}}]}\n".as_bytes();
        let (a, b) = line.split_at(40);
        let mut buffer = EventBuffer::default();
        let mut events = buffer.push(a);
        events.extend(buffer.push(b));
        assert_eq!(events, vec![StreamEvent::Delta("맑음".to_string())]);
    }

    #[test]
    fn test_role_only_and_comment_lines_are_skipped() {
        let mut buffer = EventBuffer::default();
        let events = buffer.push(
            b": keep-alive\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n",
        );
        assert!(events.is_empty());
    }

    #[test]
    fn test_error_event() {
        let mut buffer = EventBuffer::default();
        let events = buffer.push(b"data: {\"error\":{\"message\":\"overloaded\"}}\n");
        assert_eq!(events, vec![StreamEvent::Error("overloaded".to_string())]);
    }

    #[test]
    fn test_finish_flushes_trailing_line() {
        let mut buffer = EventBuffer::default();
        assert!(
            buffer
                .push(b"data: {\"choices\":[{\"delta\":{\"content\":\"end\"}}]}")
                .is_empty()
        );
        assert_eq!(buffer.finish(), Some(StreamEvent::Delta("end".to_string())));
        assert_eq!(buffer.finish(), None);
    }

    #[test]
    fn test_new_requires_api_key() {
        let config = StyleConfig::default();
        let err = OpenAiClient::new(&config).err().unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }
}
