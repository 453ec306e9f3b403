use serde::{Deserialize, Serialize};

use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::ideas::types::{Idea, IDEA_BATCH_SIZE};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    custom_prompt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    ideas: Vec<Idea>,
}

/// JSON error body returned by the server's API routes.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// Talks to `/api/generate-ideas`. One attempt per call, no retry.
pub struct GenerationClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl GenerationClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http: reqwest::Client::new(),
        }
    }

    pub async fn generate(
        &self,
        model: &str,
        custom_prompt: Option<&str>,
    ) -> IdeaSwipeResult<Vec<Idea>> {
        if model.trim().is_empty() {
            return Err(IdeaSwipeError::Validation("model is required".into()));
        }
        let custom_prompt = custom_prompt.map(str::trim).filter(|p| !p.is_empty());
        let url = format!("{}/api/generate-ideas", self.base_url);

        tracing::info!(%url, model, custom_prompt = custom_prompt.is_some(), "requesting ideas");

        let mut request = self.http.post(&url).json(&GenerateRequest {
            model,
            custom_prompt,
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(api_error(response, "Failed to generate ideas").await);
        }

        let body: GenerateResponse = response.json().await?;
        if body.ideas.len() != IDEA_BATCH_SIZE {
            return Err(IdeaSwipeError::Generation(format!(
                "server returned {} ideas, expected {IDEA_BATCH_SIZE}",
                body.ideas.len()
            )));
        }
        Ok(body.ideas)
    }
}

/// Turns a non-success response into a single user-facing error, preferring
/// the body's `details`, then `message`, then the raw text. `fallback` is used
/// for a JSON body that carries none of them.
pub(crate) async fn api_error(response: reqwest::Response, fallback: &str) -> IdeaSwipeError {
    let status = response.status().as_u16();
    let text = response.text().await.unwrap_or_default();
    IdeaSwipeError::Api {
        status,
        message: error_message(&text, fallback),
    }
}

pub(crate) fn error_message(text: &str, fallback: &str) -> String {
    match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => body
            .details
            .or(body.message)
            .or(body.error)
            .unwrap_or_else(|| fallback.to_string()),
        Err(_) => {
            let snippet: String = text.chars().take(200).collect();
            format!("Server error: {snippet}")
        }
    }
}
