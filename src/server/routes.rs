use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures_util::{stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::client::chat::UiMessage;
use crate::ideas::generator::generate_ideas;
use crate::ideas::types::Idea;
use crate::llm::prompts::chat_system_prompt;
use crate::llm::types::{ChatMessage, StreamChunk, StreamChunkKind};
use crate::server::error::ApiError;
use crate::server::state::AppState;

const CHAT_CHANNEL_CAPACITY: usize = 32;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    custom_prompt: Option<String>,
}

#[derive(Serialize)]
pub struct IdeasResponse {
    pub ideas: Vec<Idea>,
}

#[derive(Deserialize)]
struct ChatBody {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    messages: Option<serde_json::Value>,
}

fn required_model(model: Option<String>) -> Result<String, ApiError> {
    model
        .filter(|m| !m.trim().is_empty())
        .ok_or_else(|| ApiError::Validation("Model parameter is required".into()))
}

pub async fn generate_ideas_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<IdeasResponse>, ApiError> {
    let session = state.auth.authenticate(&headers)?;

    let body: GenerateBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;
    let model = required_model(body.model)?;

    let ideas = generate_ideas(
        &state.registry,
        &model,
        body.custom_prompt.as_deref(),
        Some(&session.token),
    )
    .await
    .map_err(|e| {
        tracing::error!(error = %e, model = %model, "generate ideas failed");
        ApiError::upstream("Failed to generate ideas", &e)
    })?;

    tracing::info!(model = %model, count = ideas.len(), "ideas generated");
    Ok(Json(IdeasResponse { ideas }))
}

/// Converts UI messages into provider messages behind the chat system prompt.
fn to_chat_messages(messages: &[UiMessage]) -> Vec<ChatMessage> {
    let mut out = vec![ChatMessage::system(chat_system_prompt())];
    out.extend(
        messages
            .iter()
            .filter(|m| matches!(m.role.as_str(), "user" | "assistant" | "system"))
            .map(|m| ChatMessage {
                role: m.role.clone(),
                content: m.text(),
            })
            .filter(|m| !m.content.trim().is_empty()),
    );
    out
}

fn parse_messages(value: Option<serde_json::Value>) -> Result<Vec<UiMessage>, ApiError> {
    let invalid =
        || ApiError::Validation("Messages parameter is required and must be an array".into());
    let value = value.ok_or_else(invalid)?;
    if !value.is_array() {
        return Err(invalid());
    }
    serde_json::from_value(value).map_err(|e| ApiError::Validation(format!("Invalid message: {e}")))
}

pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let session = state.auth.authenticate(&headers)?;

    let body: ChatBody = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {e}")))?;
    let model = required_model(body.model)?;
    let messages = to_chat_messages(&parse_messages(body.messages)?);

    let (provider, cfg) = state.registry.resolve(&model).map_err(|e| {
        tracing::error!(error = %e, model = %model, "no provider for chat model");
        ApiError::upstream("Failed to process chat request", &e)
    })?;

    tracing::info!(
        provider = provider.name(),
        model = %cfg.model,
        messages = messages.len(),
        "chat stream starting"
    );

    let (tx, mut rx) = mpsc::channel::<StreamChunk>(CHAT_CHANNEL_CAPACITY);
    let token = session.token;
    tokio::spawn(async move {
        if let Err(e) = provider
            .stream_chat(messages, &cfg, Some(token.as_str()), tx.clone())
            .await
        {
            tracing::error!(error = %e, "chat stream failed");
            let _ = tx.send(StreamChunk::error(e.to_string())).await;
        }
    });

    // Upstream failures before the first chunk still get a proper status code.
    let first = match rx.recv().await {
        Some(chunk) if chunk.kind == StreamChunkKind::Error => {
            return Err(ApiError::Upstream {
                message: "Failed to process chat request".into(),
                details: Some(chunk.content),
            });
        }
        Some(chunk) => chunk,
        None => {
            return Err(ApiError::Upstream {
                message: "Failed to process chat request".into(),
                details: None,
            });
        }
    };

    let rest = stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|c| (c, rx)) });
    let events = stream::once(async move { first })
        .chain(rest)
        .map(|chunk| Event::default().json_data(&chunk));

    Ok(Sse::new(events).keep_alive(KeepAlive::default()).into_response())
}

pub async fn health_handler() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_model_is_rejected() {
        assert!(required_model(None).is_err());
        assert!(required_model(Some(" ".into())).is_err());
        assert_eq!(required_model(Some("gpt-4o".into())).unwrap(), "gpt-4o");
    }

    #[test]
    fn messages_must_be_an_array() {
        assert!(parse_messages(None).is_err());
        assert!(parse_messages(Some(serde_json::json!({"role": "user"}))).is_err());
        assert!(parse_messages(Some(serde_json::json!([{"no_role": true}]))).is_err());
        let msgs = parse_messages(Some(serde_json::json!([
            {"role": "user", "parts": [{"type": "text", "text": "hi"}]}
        ])))
        .unwrap();
        assert_eq!(msgs.len(), 1);
    }

    #[test]
    fn chat_messages_get_system_prompt_and_skip_empty() {
        let msgs = vec![
            UiMessage::user_text("first"),
            UiMessage {
                id: None,
                role: "assistant".into(),
                parts: vec![],
                content: None,
            },
            UiMessage {
                id: None,
                role: "tool".into(),
                parts: vec![],
                content: Some("x".into()),
            },
        ];
        let out = to_chat_messages(&msgs);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, "system");
        assert_eq!(out[1], ChatMessage::user("first"));
    }
}
