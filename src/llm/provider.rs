use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::errors::IdeaSwipeResult;
use crate::llm::types::{CallConfig, ChatMessage, LlmResponse, StreamChunk};

/// Unified LLM provider trait. All providers implement this trait.
/// New providers only need to implement this trait and register in config.toml.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider's identifier (matches config.toml key).
    fn name(&self) -> &str;

    /// Non-streaming completion. `credential` is the caller's token when the
    /// provider forwards user tokens to the billing router.
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        cfg: &CallConfig,
        credential: Option<&str>,
    ) -> IdeaSwipeResult<LlmResponse>;

    /// Streams chunks into `tx` as they arrive and returns the accumulated reply.
    /// Implementations send exactly one terminal `Done` chunk on success.
    async fn stream_chat(
        &self,
        messages: Vec<ChatMessage>,
        cfg: &CallConfig,
        credential: Option<&str>,
        tx: mpsc::Sender<StreamChunk>,
    ) -> IdeaSwipeResult<LlmResponse>;
}
