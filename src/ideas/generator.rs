use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{IdeaSwipeError, IdeaSwipeResult};
use crate::ideas::types::{Idea, IDEA_BATCH_SIZE};
use crate::llm::prompts::generation_messages;
use crate::llm::registry::ProviderRegistry;

/// One idea as the model wrote it. Any `id` it produced is ignored; the
/// server numbers the batch itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdeaDraft {
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub features: Vec<String>,
    #[serde(alias = "businessModel")]
    pub ai_capabilities: String,
}

#[derive(Debug, Deserialize)]
struct IdeasPayload {
    ideas: Vec<IdeaDraft>,
}

/// Runs one structured generation call and returns a validated batch.
pub async fn generate_ideas(
    registry: &ProviderRegistry,
    model: &str,
    custom_prompt: Option<&str>,
    credential: Option<&str>,
) -> IdeaSwipeResult<Vec<Idea>> {
    let (provider, mut cfg) = registry.resolve(model)?;
    cfg.json_mode = true;

    tracing::info!(
        provider = provider.name(),
        model = %cfg.model,
        custom_prompt = custom_prompt.is_some(),
        "generating idea batch"
    );

    let response = provider
        .complete(generation_messages(custom_prompt), &cfg, credential)
        .await?;
    let ideas = parse_ideas(&response.content)?;
    Ok(assign_ids(ideas, &batch_prefix()))
}

/// Parses the model reply into exactly `IDEA_BATCH_SIZE` drafts.
pub fn parse_ideas(raw: &str) -> IdeaSwipeResult<Vec<IdeaDraft>> {
    let json = extract_json(raw);
    let payload: IdeasPayload = serde_json::from_str(json)
        .map_err(|e| IdeaSwipeError::Generation(format!("model reply did not match schema: {e}")))?;

    if payload.ideas.len() != IDEA_BATCH_SIZE {
        return Err(IdeaSwipeError::Generation(format!(
            "expected {IDEA_BATCH_SIZE} ideas, model returned {}",
            payload.ideas.len()
        )));
    }

    for (i, idea) in payload.ideas.iter().enumerate() {
        if idea.title.trim().is_empty() || idea.features.is_empty() {
            return Err(IdeaSwipeError::Generation(format!(
                "idea #{} is missing a title or features",
                i + 1
            )));
        }
        if !(3..=6).contains(&idea.features.len()) {
            tracing::warn!(
                title = %idea.title,
                features = idea.features.len(),
                "idea feature count outside 3..=6"
            );
        }
    }

    Ok(payload.ideas)
}

/// Models sometimes wrap JSON in a Markdown fence or add prose around it.
fn extract_json(raw: &str) -> &str {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    let fence = FENCE.get_or_init(|| {
        Regex::new(r"(?s)```(?:json)?\s*(\{.*\})\s*```").expect("fence regex is valid")
    });
    if let Some(inner) = fence.captures(raw).and_then(|c| c.get(1)) {
        return inner.as_str();
    }
    match (raw.find('{'), raw.rfind('}')) {
        (Some(start), Some(end)) if start < end => &raw[start..=end],
        _ => raw.trim(),
    }
}

fn batch_prefix() -> String {
    let batch = uuid::Uuid::new_v4().simple().to_string();
    format!("idea-{}", &batch[..8])
}

/// Numbers the drafts `<prefix>-1..=n` in batch order.
pub fn assign_ids(drafts: Vec<IdeaDraft>, prefix: &str) -> Vec<Idea> {
    drafts
        .into_iter()
        .enumerate()
        .map(|(i, draft)| Idea {
            id: format!("{prefix}-{}", i + 1),
            title: draft.title,
            description: draft.description,
            target_audience: draft.target_audience,
            features: draft.features,
            ai_capabilities: draft.ai_capabilities,
        })
        .collect()
}
