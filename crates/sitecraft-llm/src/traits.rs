use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur while talking to an LLM provider
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Request to provider failed: {0}")]
    Transport(String),

    #[error("Provider returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Provider response could not be read: {0}")]
    InvalidResponse(String),

    #[error("Missing API key: set {0}")]
    MissingApiKey(String),
}

impl LlmError {
    /// Whether a retry has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Transport(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::InvalidResponse(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}

/// A single-turn completion request
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Optional system prompt
    pub system: Option<String>,
    /// User prompt
    pub prompt: String,
    /// Upper bound on generated tokens
    pub max_tokens: u32,
    /// Sampling temperature (None = provider default)
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 4096,
            temperature: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderType {
    Anthropic,
    OpenAi,
}

impl ProviderType {
    /// Environment variable holding the API key for this provider
    pub fn api_key_var(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "ANTHROPIC_API_KEY",
            ProviderType::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderType::Anthropic => "claude-sonnet-4-20250514",
            ProviderType::OpenAi => "gpt-4o",
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::OpenAi => write!(f, "openai"),
        }
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderType::Anthropic),
            "openai" | "open-ai" | "gpt" => Ok(ProviderType::OpenAi),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

/// The core abstraction over text-completion providers
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Human-readable provider name (e.g., "Anthropic")
    fn name(&self) -> &str;

    /// Model used for completions
    fn model(&self) -> &str;

    /// Run a completion and return the concatenated text reply
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError>;
}
