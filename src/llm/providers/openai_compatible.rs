use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::llm::provider::LlmProvider;
use crate::llm::sse_parser;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunk, StreamChunkKind};

pub struct OpenAiCompatibleProvider {
    id: String,
    api_base: String,
    api_key: String,
    forward_user_token: bool,
    client: reqwest::Client,
}

impl OpenAiCompatibleProvider {
    pub fn new(
        id: String,
        api_base: String,
        api_key: String,
        forward_user_token: bool,
        timeout: Duration,
    ) -> IdeaSwipeResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            id,
            api_base,
            api_key,
            forward_user_token,
            client,
        })
    }

    fn bearer<'a>(&'a self, credential: Option<&'a str>) -> IdeaSwipeResult<&'a str> {
        if self.forward_user_token {
            if let Some(token) = credential.filter(|t| !t.is_empty()) {
                return Ok(token);
            }
        }
        if self.api_key.is_empty() {
            return Err(IdeaSwipeError::LlmProvider(format!(
                "provider '{}' has no credential to send upstream",
                self.id
            )));
        }
        Ok(&self.api_key)
    }

    async fn send(
        &self,
        messages: &[ChatMessage],
        cfg: &CallConfig,
        stream: bool,
        credential: Option<&str>,
    ) -> IdeaSwipeResult<reqwest::Response> {
        let mut body = serde_json::json!({
            "model": cfg.model,
            "messages": messages,
            "stream": stream,
            "temperature": cfg.temperature,
        });
        if cfg.json_mode {
            body["response_format"] = serde_json::json!({ "type": "json_object" });
        }

        tracing::debug!(
            provider = %self.id,
            model = %cfg.model,
            stream,
            messages = messages.len(),
            "sending LLM request"
        );

        let response = self
            .client
            .post(&self.api_base)
            .bearer_auth(self.bearer(credential)?)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let err_body = response.text().await.unwrap_or_default();
            return Err(IdeaSwipeError::LlmProvider(format!("{}: {}", status, err_body)));
        }
        Ok(response)
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.id
    }

    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        cfg: &CallConfig,
        credential: Option<&str>,
    ) -> IdeaSwipeResult<LlmResponse> {
        let response = self.send(&messages, cfg, false, credential).await?;
        let json: serde_json::Value = response.json().await?;
        let response = parse_completion(&json)?;

        tracing::info!(
            provider = %self.id,
            content_len = response.content.len(),
            "LLM JSON response received"
        );
        Ok(response)
    }

    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        cfg: &CallConfig,
        credential: Option<&str>,
        tx: mpsc::Sender<StreamChunk>,
    ) -> IdeaSwipeResult<LlmResponse> {
        let response = self.send(&messages, cfg, true, credential).await?;
        let mut byte_stream = response.bytes_stream();
        let mut line_buf: Vec<u8> = Vec::new();
        let mut acc = LlmResponse::default();

        'stream: while let Some(result) = byte_stream.next().await {
            line_buf.extend_from_slice(&result?);

            while let Some(pos) = line_buf.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = line_buf.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let chunks = match sse_parser::parse_sse_line(line.trim()) {
                    Ok(chunks) => chunks,
                    Err(e) => {
                        tracing::debug!("SSE parse skipped: {e}");
                        continue;
                    }
                };

                for chunk in chunks {
                    match chunk.kind {
                        StreamChunkKind::Reasoning => acc.reasoning.push_str(&chunk.content),
                        StreamChunkKind::Content => acc.content.push_str(&chunk.content),
                        StreamChunkKind::Source => acc.sources.push(chunk.content.clone()),
                        StreamChunkKind::Error => {
                            return Err(IdeaSwipeError::LlmProvider(chunk.content));
                        }
                        StreamChunkKind::Done => break 'stream,
                    }
                    if tx.send(chunk).await.is_err() {
                        tracing::debug!(provider = %self.id, "stream receiver dropped; abandoning");
                        return Ok(acc);
                    }
                }
            }
        }

        // Also covers streams that end without a [DONE] marker.
        let _ = tx.send(StreamChunk::done()).await;

        tracing::info!(
            provider = %self.id,
            content_len = acc.content.len(),
            reasoning_len = acc.reasoning.len(),
            sources = acc.sources.len(),
            "LLM stream complete"
        );
        Ok(acc)
    }
}

/// Extracts the assistant message from a non-streaming chat completion body.
fn parse_completion(json: &serde_json::Value) -> IdeaSwipeResult<LlmResponse> {
    if let Some(message) = json["error"]["message"].as_str() {
        return Err(IdeaSwipeError::LlmProvider(message.to_string()));
    }
    let message = &json["choices"][0]["message"];
    let Some(content) = message["content"].as_str() else {
        return Err(IdeaSwipeError::LlmProvider(
            "completion carried no message content".into(),
        ));
    };
    let reasoning = message["reasoning_content"]
        .as_str()
        .or_else(|| message["reasoning"].as_str())
        .unwrap_or("")
        .to_string();

    Ok(LlmResponse {
        content: content.to_string(),
        reasoning,
        sources: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(forward: bool, api_key: &str) -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(
            "echo".into(),
            "http://localhost/chat/completions".into(),
            api_key.into(),
            forward,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn forwards_user_token_when_enabled() {
        let p = provider(true, "server-key");
        assert_eq!(p.bearer(Some("user-token")).unwrap(), "user-token");
        assert_eq!(p.bearer(None).unwrap(), "server-key");
    }

    #[test]
    fn uses_server_key_when_forwarding_disabled() {
        let p = provider(false, "server-key");
        assert_eq!(p.bearer(Some("user-token")).unwrap(), "server-key");
    }

    #[test]
    fn missing_credential_is_an_error() {
        let p = provider(true, "");
        assert!(p.bearer(None).is_err());
        assert!(p.bearer(Some("")).is_err());
    }

    #[test]
    fn parses_completion_body() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "{\"ideas\":[]}"}}]
        });
        let resp = parse_completion(&json).unwrap();
        assert_eq!(resp.content, "{\"ideas\":[]}");
        assert!(resp.reasoning.is_empty());
    }

    #[test]
    fn completion_error_body() {
        let json = serde_json::json!({"error": {"message": "model not found"}});
        let err = parse_completion(&json).unwrap_err();
        assert!(err.to_string().contains("model not found"));
    }
}
