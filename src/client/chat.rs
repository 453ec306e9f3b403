use futures_util::StreamExt;
use serde::{Deserialize, Serialize};

use crate::client::generation::api_error;
use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::llm::types::{StreamChunk, StreamChunkKind};

/// Chat message in the UI wire shape accepted by `/api/chat`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub role: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<UiPart>,
    /// Plain-text alternative to `parts`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiPart {
    Text { text: String },
    Reasoning { text: String },
    SourceUrl { url: String },
    #[serde(other)]
    Other,
}

impl UiMessage {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            role: "user".into(),
            parts: vec![UiPart::Text { text: text.into() }],
            content: None,
        }
    }

    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            id: Some(uuid::Uuid::new_v4().to_string()),
            role: "assistant".into(),
            parts: vec![UiPart::Text { text: text.into() }],
            content: None,
        }
    }

    /// The message's visible text: its text parts joined, else `content`.
    pub fn text(&self) -> String {
        let joined: Vec<&str> = self
            .parts
            .iter()
            .filter_map(|p| match p {
                UiPart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        if joined.is_empty() {
            self.content.clone().unwrap_or_default()
        } else {
            joined.join("\n")
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [UiMessage],
}

pub struct ChatClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    /// Sends the conversation and calls `on_chunk` for every streamed chunk.
    /// Returns the assistant's full text.
    pub async fn send<F>(
        &self,
        model: &str,
        messages: &[UiMessage],
        mut on_chunk: F,
    ) -> IdeaSwipeResult<String>
    where
        F: FnMut(&StreamChunk),
    {
        let url = format!("{}/api/chat", self.base_url);
        let mut request = self.http.post(&url).json(&ChatRequest { model, messages });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response, "Failed to process chat request").await);
        }

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(bytes) = stream.next().await {
            buf.extend_from_slice(&bytes?);
            while let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let Some(chunk) = parse_event_line(line.trim())? else {
                    continue;
                };
                on_chunk(&chunk);
                if chunk.is_terminal() {
                    return match chunk.kind {
                        StreamChunkKind::Error => Err(IdeaSwipeError::LlmProvider(chunk.content)),
                        _ => Ok(reply),
                    };
                }
                if chunk.kind == StreamChunkKind::Content {
                    reply.push_str(&chunk.content);
                }
            }
        }
        Err(IdeaSwipeError::LlmProvider(
            "chat stream ended before the reply was complete".into(),
        ))
    }
}

/// A multi-turn conversation: every `ask` sends the whole history and keeps
/// the reply for the next turn.
pub struct ChatSession {
    client: ChatClient,
    model: String,
    history: Vec<UiMessage>,
}

impl ChatSession {
    pub fn new(client: ChatClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[UiMessage] {
        &self.history
    }

    /// Sends `text` as the next user turn. A failed turn is dropped from the
    /// history so it can be retried.
    pub async fn ask<F>(&mut self, text: &str, on_chunk: F) -> IdeaSwipeResult<String>
    where
        F: FnMut(&StreamChunk),
    {
        self.history.push(UiMessage::user_text(text));
        match self.client.send(&self.model, &self.history, on_chunk).await {
            Ok(reply) => {
                self.history.push(UiMessage::assistant_text(reply.clone()));
                Ok(reply)
            }
            Err(e) => {
                self.history.pop();
                Err(e)
            }
        }
    }
}

/// Parses one `data:` line of the server's event stream.
fn parse_event_line(line: &str) -> IdeaSwipeResult<Option<StreamChunk>> {
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(data)
        .map(Some)
        .map_err(|e| IdeaSwipeError::SseParsing(e.to_string()))
}
