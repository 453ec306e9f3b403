//! Prompt templates for idea generation and idea chat.

use crate::ideas::types::IDEA_BATCH_SIZE;
use crate::llm::types::ChatMessage;

const PLATFORM_BRIEF: &str = "\
You generate application ideas for developers building on a \"billing in a box\" LLM platform.

The platform gives every app:
- access to many hosted language models (OpenAI, Anthropic, ...) through one router
- per-user authentication and balances, with usage billed to the end user as they go
- usage tracking, quotas and transparent cost reporting

Good ideas lean on AI models for their core value and only work because usage-based,
user-paid billing makes the AI cost viable.";

pub const CHAT_SYSTEM_PROMPT: &str = "\
When the user asks for app ideas, or wants to develop one further, answer with practical,
concrete plans. For each idea cover: the concept and target audience, how it uses the LLM
router, why per-user usage billing makes the business work, key features and user experience,
and a pricing strategy. Offer 3-5 ideas when asked for new ones.";

/// Builds the two-message conversation sent for one generation batch.
pub fn generation_messages(custom_prompt: Option<&str>) -> Vec<ChatMessage> {
    let system = format!(
        "{PLATFORM_BRIEF}\n\n\
         Reply with a single JSON object and nothing else, shaped as:\n\
         {{\"ideas\": [{{\"id\": string, \"title\": string, \"description\": string, \
         \"targetAudience\": string, \"features\": [string], \"aiCapabilities\": string}}]}}"
    );

    let mut prompt = format!(
        "Generate exactly {IDEA_BATCH_SIZE} unique app ideas. Each must come from a different \
         industry and solve a different problem. Vary industries (healthcare, education, \
         entertainment, finance, retail, gaming, agriculture, sports, art, science), audiences \
         and AI use cases (generation, analysis, personalization, prediction, translation).\n\n\
         For each idea provide:\n\
         - title: 2-6 words\n\
         - description: 2-3 sentences on the core concept\n\
         - targetAudience: be specific\n\
         - features: 4-6 key features that use the platform's capabilities\n\
         - aiCapabilities: how the idea uses AI models and why per-use billing fits"
    );

    if let Some(extra) = custom_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        prompt.push_str("\n\nAdditional requirements from the user:\n");
        prompt.push_str(extra);
    }

    vec![ChatMessage::system(system), ChatMessage::user(prompt)]
}

/// System prompt for `/api/chat`.
pub fn chat_system_prompt() -> String {
    format!("{PLATFORM_BRIEF}\n\n{CHAT_SYSTEM_PROMPT}")
}
