use serde::{Deserialize, Serialize};

/// Number of ideas in every generation batch.
pub const IDEA_BATCH_SIZE: usize = 10;

/// One generated app concept. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Idea {
    pub id: String,
    pub title: String,
    pub description: String,
    pub target_audience: String,
    pub features: Vec<String>,
    /// Older batches stored this field as `businessModel`.
    #[serde(alias = "businessModel")]
    pub ai_capabilities: String,
}

impl Idea {
    /// Prompt handed from the favorites list to the chat view.
    pub fn chat_prompt(&self) -> String {
        let features = self
            .features
            .iter()
            .map(|f| format!("• {f}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Help me flesh this idea out and create a plan of action:\n\n\
             **{}**\n\n{}\n\n\
             **Target Audience:** {}\n\n\
             **Key Features:**\n{}\n\n\
             **AI Capabilities:** {}",
            self.title, self.description, self.target_audience, features, self.ai_capabilities
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
}

impl Direction {
    pub fn from_offset(dx: f64) -> Self {
        if dx > 0.0 {
            Direction::Right
        } else {
            Direction::Left
        }
    }
}

/// Consumed ideas, split by verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SwipeResults {
    #[serde(default)]
    pub liked: Vec<Idea>,
    #[serde(default)]
    pub disliked: Vec<Idea>,
}

impl SwipeResults {
    pub fn len(&self) -> usize {
        self.liked.len() + self.disliked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resumable progress through one generation batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeckSession {
    #[serde(default)]
    pub ideas: Vec<Idea>,
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub results: SwipeResults,
    /// Last write, epoch milliseconds. Informational only.
    #[serde(default)]
    pub timestamp: i64,
}

impl DeckSession {
    pub fn new(ideas: Vec<Idea>) -> Self {
        Self {
            ideas,
            current_index: 0,
            results: SwipeResults::default(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// `current_index <= len(ideas)` and the partition covers exactly the consumed ideas.
    pub fn is_consistent(&self) -> bool {
        self.current_index <= self.ideas.len() && self.results.len() == self.current_index
    }

    pub fn is_complete(&self) -> bool {
        !self.ideas.is_empty() && self.current_index >= self.ideas.len()
    }

    pub fn current(&self) -> Option<&Idea> {
        self.ideas.get(self.current_index)
    }

    pub fn touch(&mut self) {
        self.timestamp = chrono::Utc::now().timestamp_millis();
    }
}

#[cfg(test)]
pub(crate) fn sample_idea(id: &str) -> Idea {
    Idea {
        id: id.to_string(),
        title: format!("Idea {id}"),
        description: "An app.".into(),
        target_audience: "Everyone".into(),
        features: vec!["one".into(), "two".into(), "three".into()],
        ai_capabilities: "Summarises things".into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idea_uses_camel_case_on_the_wire() {
        let json = serde_json::to_value(sample_idea("a")).unwrap();
        assert!(json.get("targetAudience").is_some());
        assert!(json.get("aiCapabilities").is_some());
        assert!(json.get("target_audience").is_none());
    }

    #[test]
    fn older_business_model_field_is_accepted() {
        let idea: Idea = serde_json::from_str(
            r#"{"id":"x","title":"t","description":"d","targetAudience":"a",
                "features":["f"],"businessModel":"subscriptions"}"#,
        )
        .unwrap();
        assert_eq!(idea.ai_capabilities, "subscriptions");
    }

    #[test]
    fn session_missing_fields_default() {
        let session: DeckSession = serde_json::from_str(r#"{"ideas":[]}"#).unwrap();
        assert_eq!(session.current_index, 0);
        assert!(session.results.is_empty());
        assert!(session.is_consistent());
        assert!(!session.is_complete());
    }

    #[test]
    fn inconsistent_partition_is_detected() {
        let mut session = DeckSession::new(vec![sample_idea("a"), sample_idea("b")]);
        session.current_index = 1;
        assert!(!session.is_consistent());
        session.results.liked.push(sample_idea("a"));
        assert!(session.is_consistent());
        session.current_index = 3;
        assert!(!session.is_consistent());
    }

    #[test]
    fn chat_prompt_lists_features() {
        let prompt = sample_idea("a").chat_prompt();
        assert!(prompt.starts_with("Help me flesh this idea out"));
        assert!(prompt.contains("**Idea a**"));
        assert!(prompt.contains("• two"));
        assert!(prompt.contains("**AI Capabilities:** Summarises things"));
    }
}
