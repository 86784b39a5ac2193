//! Chat completion clients
//!
//! A [`ChatClient`] takes one system instruction and one user message and
//! streams back opaque prose. Fragments go to a caller-supplied sink as
//! they arrive; the full text is returned at the end.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub mod openai;

pub use openai::OpenAiClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One chat message, as kept in session history and sent on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// A single completion request
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
}

impl ChatRequest {
    #[must_use]
    pub fn messages(&self) -> Vec<ChatMessage> {
        vec![
            ChatMessage::new(Role::System, self.system.clone()),
            ChatMessage::new(Role::User, self.user.clone()),
        ]
    }
}

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Stream a completion for `request`, feeding every text fragment to
    /// `sink`, and return the concatenated answer.
    async fn stream_completion(
        &self,
        request: &ChatRequest,
        sink: &mut (dyn for<'a> FnMut(&'a str) + Send),
    ) -> Result<String>;
}
