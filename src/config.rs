use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{IdeaSwipeError, IdeaSwipeResult};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub gesture: GestureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Upper bound for a single upstream LLM call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout() -> u64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// When non-empty, only these bearer tokens are accepted.
    /// When empty, any non-blank token is accepted and left to the billing router to verify.
    #[serde(default)]
    pub allowed_tokens: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub active_provider: String,
    pub providers: HashMap<String, ProviderEntry>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "echo".to_string(),
            ProviderEntry {
                display_name: "Echo router".into(),
                api_base: "https://echo.router.merit.systems/chat/completions".into(),
                model: "gpt-4o".into(),
                temperature: default_temperature(),
                api_key: None,
                model_prefixes: Vec::new(),
                forward_user_token: true,
            },
        );
        Self {
            active_provider: "echo".into(),
            providers,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderEntry {
    pub display_name: String,
    pub api_base: String,
    /// Default model for this provider (used when a request names no model).
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    /// Optional API key stored in config.toml (falls back to env var IDEASWIPE_<ID>_API_KEY).
    #[serde(default)]
    pub api_key: Option<String>,
    /// Requests whose model starts with one of these prefixes are routed here.
    #[serde(default)]
    pub model_prefixes: Vec<String>,
    /// Send the caller's bearer token upstream instead of `api_key`, so usage
    /// is billed to the signed-in user.
    #[serde(default = "default_true")]
    pub forward_user_token: bool,
}

fn default_temperature() -> f64 {
    0.9
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_client_model")]
    pub model: String,
    /// Falls back to env var IDEASWIPE_TOKEN.
    #[serde(default)]
    pub token: Option<String>,
    /// Directory for the local idea store. Defaults to the platform data dir.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_client_model(),
            token: None,
            data_dir: None,
        }
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:3000".into()
}

fn default_client_model() -> String {
    "claude-3-haiku-20240307".into()
}

impl ClientConfig {
    pub fn resolve_token(&self) -> Option<String> {
        std::env::var("IDEASWIPE_TOKEN")
            .ok()
            .or_else(|| self.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    /// `~/.local/share/ideaswipe` on Linux, the platform equivalent elsewhere,
    /// falling back to `./.ideaswipe`.
    pub fn resolve_data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::data_local_dir()
            .map(|d| d.join("ideaswipe"))
            .unwrap_or_else(|| PathBuf::from(".ideaswipe"))
    }
}

/// Drag thresholds, in pointer units.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GestureConfig {
    #[serde(default = "default_horizontal_threshold")]
    pub horizontal_threshold: f64,
    #[serde(default = "default_feedback_threshold")]
    pub feedback_threshold: f64,
    #[serde(default = "default_commit_threshold")]
    pub commit_threshold: f64,
    #[serde(default = "default_exit_delay_ms")]
    pub exit_delay_ms: u64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            horizontal_threshold: default_horizontal_threshold(),
            feedback_threshold: default_feedback_threshold(),
            commit_threshold: default_commit_threshold(),
            exit_delay_ms: default_exit_delay_ms(),
        }
    }
}

fn default_horizontal_threshold() -> f64 {
    20.0
}

fn default_feedback_threshold() -> f64 {
    50.0
}

fn default_commit_threshold() -> f64 {
    100.0
}

fn default_exit_delay_ms() -> u64 {
    300
}

fn resolve_config_path() -> IdeaSwipeResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    Err(IdeaSwipeError::Config(
        "config.toml not found next to executable or in working directory".into(),
    ))
}

pub fn load_config() -> IdeaSwipeResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), provider = %config.llm.active_provider, "config loaded");
    Ok(config)
}

pub fn parse_config(content: &str) -> IdeaSwipeResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if !config.llm.providers.contains_key(&config.llm.active_provider) {
        return Err(IdeaSwipeError::Config(format!(
            "active provider '{}' has no [llm.providers] entry",
            config.llm.active_provider
        )));
    }
    Ok(config)
}

/// Writes `config` to `config.toml` in the working directory unless one exists.
pub fn write_default_config(config: &AppConfig) -> IdeaSwipeResult<PathBuf> {
    let path = std::env::current_dir()?.join("config.toml");
    if path.exists() {
        return Err(IdeaSwipeError::Config(format!(
            "{} already exists",
            path.display()
        )));
    }
    let content = toml::to_string_pretty(config)?;
    std::fs::write(&path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(path)
}
