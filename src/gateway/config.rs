//! AI gateway configuration.

use super::availability::AiAvailability;

/// Default OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default model for text-only calls.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";

/// Default model for vision calls.
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Environment variables read by [`AiConfig::from_env`].
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_TEXT_MODEL: &str = "OPENAI_MODEL";
pub const ENV_VISION_MODEL: &str = "OPENAI_VISION_MODEL";

/// Connection settings for the chat-completion provider.
///
/// Built once at startup and shared read-only; every field is optional in
/// the environment and falls back to a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            text_model: DEFAULT_TEXT_MODEL.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
        }
    }
}

impl AiConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            ..Self::default()
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL`, `OPENAI_MODEL` and
    /// `OPENAI_VISION_MODEL`. Values are trimmed; blank ones count as absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let defaults = Self::default();
        Self {
            api_key: get(ENV_API_KEY),
            base_url: get(ENV_BASE_URL).unwrap_or(defaults.base_url),
            text_model: get(ENV_TEXT_MODEL).unwrap_or(defaults.text_model),
            vision_model: get(ENV_VISION_MODEL).unwrap_or(defaults.vision_model),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn text_model(mut self, model: impl Into<String>) -> Self {
        self.text_model = model.into();
        self
    }

    pub fn vision_model(mut self, model: impl Into<String>) -> Self {
        self.vision_model = model.into();
        self
    }

    /// Whether the configured key is usable at all.
    pub fn availability(&self) -> AiAvailability {
        AiAvailability::from_key(self.api_key.as_deref())
    }
}
